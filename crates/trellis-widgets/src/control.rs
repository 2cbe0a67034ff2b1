#![forbid(unsafe_code)]

//! The host-widget contract: stable identity, enabled/visible/focused state
//! and the name→property registry every bindable control carries.
//!
//! `set_enabled` / `set_visible` always forward to the native layer (the
//! `*_applied` events) and publish their changed event only on transition.
//! The registered `Enabled` and `Visible` properties are the boolean variant
//! without the equality short-circuit, so writing an equal value still
//! re-applies — at least one visibility consumer depends on exactly that.
//!
//! # Invariants
//!
//! 1. Control ids are unique for the lifetime of the process.
//! 2. Registering two properties under one name is a programmer error and
//!    panics.
//! 3. `properties()` returns registration order.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use trellis_core::EventPublisher;
use trellis_core::event::Event;
use trellis_runtime::{BoundControl, ControlId, Property};

/// Global counter for unique control ids.
static CONTROL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_control_id() -> ControlId {
    ControlId::from_raw(CONTROL_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
}

struct BaseInner {
    id: ControlId,
    name: RefCell<String>,
    enabled: Cell<bool>,
    visible: Cell<bool>,
    focused: Cell<bool>,
    enabled_changed: EventPublisher<()>,
    visible_changed: EventPublisher<()>,
    focused_changed: EventPublisher<()>,
    enabled_applied: EventPublisher<bool>,
    visible_applied: EventPublisher<bool>,
    properties: RefCell<Vec<(String, Property)>>,
}

/// Shared state every control embeds: identity, flags, property registry.
#[derive(Clone)]
pub struct ControlBase {
    inner: Rc<BaseInner>,
}

impl fmt::Debug for ControlBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlBase")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name.borrow())
            .field("enabled", &self.inner.enabled.get())
            .field("visible", &self.inner.visible.get())
            .finish()
    }
}

impl Default for ControlBase {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlBase {
    /// A fresh control base: enabled, visible, unfocused, with the
    /// `Enabled`, `Visible` and `Focused` properties pre-registered.
    #[must_use]
    pub fn new() -> Self {
        let base = Self {
            inner: Rc::new(BaseInner {
                id: next_control_id(),
                name: RefCell::new(String::new()),
                enabled: Cell::new(true),
                visible: Cell::new(true),
                focused: Cell::new(false),
                enabled_changed: EventPublisher::new(),
                visible_changed: EventPublisher::new(),
                focused_changed: EventPublisher::new(),
                enabled_applied: EventPublisher::new(),
                visible_applied: EventPublisher::new(),
                properties: RefCell::new(Vec::new()),
            }),
        };

        // The flag properties live inside the registry the base itself owns,
        // so their closures must hold the base weakly or the control leaks.
        let for_get = Rc::downgrade(&base.inner);
        let for_set = Rc::downgrade(&base.inner);
        base.register_property(
            "Enabled",
            Property::bool(
                move || for_get.upgrade().is_some_and(|inner| inner.enabled.get()),
                move |enabled| {
                    if let Some(inner) = for_set.upgrade() {
                        ControlBase { inner }.set_enabled(enabled);
                    }
                    Ok(())
                },
                base.enabled_changed(),
            ),
        );

        let for_get = Rc::downgrade(&base.inner);
        let for_set = Rc::downgrade(&base.inner);
        base.register_property(
            "Visible",
            Property::bool(
                move || for_get.upgrade().is_some_and(|inner| inner.visible.get()),
                move |visible| {
                    if let Some(inner) = for_set.upgrade() {
                        ControlBase { inner }.set_visible(visible);
                    }
                    Ok(())
                },
                base.visible_changed(),
            ),
        );

        let for_get = Rc::downgrade(&base.inner);
        base.register_property(
            "Focused",
            Property::read_only_bool(
                move || for_get.upgrade().is_some_and(|inner| inner.focused.get()),
                base.focused_changed(),
            ),
        );

        base
    }

    #[must_use]
    pub fn control_id(&self) -> ControlId {
        self.inner.id
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.inner.name.borrow().clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self.inner.name.borrow_mut() = name.into();
    }

    // ── Flags ───────────────────────────────────────────────────────

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.get()
    }

    /// Apply the enabled flag. The native layer is told every time; the
    /// changed event fires only on transition.
    pub fn set_enabled(&self, enabled: bool) {
        let old = self.inner.enabled.get();
        self.inner.enabled_applied.publish(&enabled);
        self.inner.enabled.set(enabled);
        if enabled != old {
            self.inner.enabled_changed.raise();
        }
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.inner.visible.get()
    }

    /// Apply the visible flag; same always-apply contract as
    /// [`ControlBase::set_enabled`].
    pub fn set_visible(&self, visible: bool) {
        let old = self.inner.visible.get();
        self.inner.visible_applied.publish(&visible);
        self.inner.visible.set(visible);
        if visible != old {
            self.inner.visible_changed.raise();
        }
    }

    #[must_use]
    pub fn is_focused(&self) -> bool {
        self.inner.focused.get()
    }

    pub fn set_focused(&self, focused: bool) {
        if focused == self.inner.focused.get() {
            return;
        }
        self.inner.focused.set(focused);
        self.inner.focused_changed.raise();
    }

    // ── Events ──────────────────────────────────────────────────────

    #[must_use]
    pub fn enabled_changed(&self) -> Event<()> {
        self.inner.enabled_changed.event()
    }

    #[must_use]
    pub fn visible_changed(&self) -> Event<()> {
        self.inner.visible_changed.event()
    }

    #[must_use]
    pub fn focused_changed(&self) -> Event<()> {
        self.inner.focused_changed.event()
    }

    /// Fired on *every* enabled write, with the applied value — the seam to
    /// the native layer.
    #[must_use]
    pub fn enabled_applied(&self) -> Event<bool> {
        self.inner.enabled_applied.event()
    }

    /// Fired on *every* visible write, with the applied value.
    #[must_use]
    pub fn visible_applied(&self) -> Event<bool> {
        self.inner.visible_applied.event()
    }

    // ── Property registry ───────────────────────────────────────────

    /// Register a named bindable property.
    ///
    /// # Panics
    ///
    /// Panics when `name` is already registered; a duplicate is a
    /// programming error, not a recoverable condition.
    pub fn register_property(&self, name: impl Into<String>, property: Property) {
        let name = name.into();
        let mut properties = self.inner.properties.borrow_mut();
        assert!(
            !properties.iter().any(|(existing, _)| *existing == name),
            "property already registered: {name}"
        );
        properties.push((name, property));
    }

    /// Look up a registered property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<Property> {
        self.inner
            .properties
            .borrow()
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, property)| property.clone())
    }

    /// All registered properties, in registration order.
    #[must_use]
    pub fn properties(&self) -> Vec<Property> {
        self.inner
            .properties
            .borrow()
            .iter()
            .map(|(_, property)| property.clone())
            .collect()
    }
}

impl BoundControl for ControlBase {
    fn control_id(&self) -> ControlId {
        self.inner.id
    }

    fn properties(&self) -> Vec<Property> {
        ControlBase::properties(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
