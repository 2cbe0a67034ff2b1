#![forbid(unsafe_code)]

//! Actions: commands with text, shortcut and condition-driven enablement.
//!
//! Every setter follows the set-try-rollback pattern: apply the new value,
//! raise the fallible `changed` fan-out, and if any consumer (a menu, a
//! toolbar) errors, restore the old value and raise again. Consumers are
//! thereby guaranteed to only ever observe states they accepted.
//!
//! Enabled/visible may be delegated to a [`Condition`]; while a condition is
//! installed the explicit flag setter fails, and the flag follows the
//! condition's changes.
//!
//! An action is registered with its [`UiContext`](crate::context::UiContext)
//! (by id and, when set, shortcut) for as long as any strong handle lives;
//! dropping the last handle unregisters it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use trellis_core::input::{Key, Modifiers};
use trellis_core::{Event, EventHandle, EventPublisher, FallibleEvent, FallibleEventPublisher};
use trellis_runtime::Condition;

use crate::context::{ContextInner, UiContext};
use crate::error::WidgetError;

/// A keyboard shortcut owned by at most one action per context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Shortcut {
    pub modifiers: Modifiers,
    pub key: Key,
}

impl Shortcut {
    #[must_use]
    pub const fn new(modifiers: Modifiers, key: Key) -> Self {
        Self { modifiers, key }
    }
}

pub(crate) struct ActionCore {
    id: u16,
    context: Weak<ContextInner>,
    text: RefCell<String>,
    tool_tip: RefCell<String>,
    enabled: Cell<bool>,
    visible: Cell<bool>,
    checkable: Cell<bool>,
    checked: Cell<bool>,
    exclusive: Cell<bool>,
    shortcut: Cell<Option<Shortcut>>,
    enabled_condition: RefCell<Option<Rc<dyn Condition>>>,
    enabled_condition_handle: Cell<Option<EventHandle>>,
    visible_condition: RefCell<Option<Rc<dyn Condition>>>,
    visible_condition_handle: Cell<Option<EventHandle>>,
    triggered: EventPublisher<()>,
    changed: FallibleEventPublisher<(), WidgetError>,
    visible_changed: FallibleEventPublisher<(), WidgetError>,
}

impl Drop for ActionCore {
    fn drop(&mut self) {
        if let Some(handle) = self.enabled_condition_handle.take() {
            if let Some(condition) = self.enabled_condition.borrow().clone() {
                condition.changed().detach(handle);
            }
        }
        if let Some(handle) = self.visible_condition_handle.take() {
            if let Some(condition) = self.visible_condition.borrow().clone() {
                condition.changed().detach(handle);
            }
        }
        if let Some(context) = self.context.upgrade() {
            context.unregister_action(self.id);
        }
    }
}

/// A shared handle to one action.
#[derive(Clone)]
pub struct Action {
    core: Rc<ActionCore>,
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.core.id)
            .field("text", &self.core.text.borrow())
            .field("enabled", &self.enabled())
            .finish()
    }
}

impl Action {
    pub(crate) fn new_in(context: &UiContext) -> Self {
        let id = context.allocate_action_id();
        let core = Rc::new(ActionCore {
            id,
            context: Rc::downgrade(&context.inner),
            text: RefCell::new(String::new()),
            tool_tip: RefCell::new(String::new()),
            enabled: Cell::new(true),
            visible: Cell::new(true),
            checkable: Cell::new(false),
            checked: Cell::new(false),
            exclusive: Cell::new(false),
            shortcut: Cell::new(None),
            enabled_condition: RefCell::new(None),
            enabled_condition_handle: Cell::new(None),
            visible_condition: RefCell::new(None),
            visible_condition_handle: Cell::new(None),
            triggered: EventPublisher::new(),
            changed: FallibleEventPublisher::new(),
            visible_changed: FallibleEventPublisher::new(),
        });
        context.register_action(id, &core);
        Self { core }
    }

    pub(crate) fn from_core(core: Rc<ActionCore>) -> Self {
        Self { core }
    }

    #[must_use]
    pub fn id(&self) -> u16 {
        self.core.id
    }

    // ── Fallible fan-outs ───────────────────────────────────────────

    /// Raised after any attribute change; a consumer returning an error
    /// vetoes the change.
    #[must_use]
    pub fn changed(&self) -> FallibleEvent<(), WidgetError> {
        self.core.changed.event()
    }

    /// Raised after visibility changes, same veto semantics.
    #[must_use]
    pub fn visibility_changed(&self) -> FallibleEvent<(), WidgetError> {
        self.core.visible_changed.event()
    }

    fn raise_changed(&self) -> Result<(), WidgetError> {
        self.core.changed.publish(&())
    }

    fn raise_visible_changed(&self) -> Result<(), WidgetError> {
        self.core.visible_changed.publish(&())
    }

    // ── Text / tooltip ──────────────────────────────────────────────

    #[must_use]
    pub fn text(&self) -> String {
        self.core.text.borrow().clone()
    }

    pub fn set_text(&self, text: impl Into<String>) -> Result<(), WidgetError> {
        let text = text.into();
        if text == *self.core.text.borrow() {
            return Ok(());
        }
        let old = self.core.text.replace(text);
        if let Err(err) = self.raise_changed() {
            self.core.text.replace(old);
            let _ = self.raise_changed();
            return Err(err);
        }
        Ok(())
    }

    #[must_use]
    pub fn tool_tip(&self) -> String {
        self.core.tool_tip.borrow().clone()
    }

    pub fn set_tool_tip(&self, tool_tip: impl Into<String>) -> Result<(), WidgetError> {
        let tool_tip = tool_tip.into();
        if tool_tip == *self.core.tool_tip.borrow() {
            return Ok(());
        }
        let old = self.core.tool_tip.replace(tool_tip);
        if let Err(err) = self.raise_changed() {
            self.core.tool_tip.replace(old);
            let _ = self.raise_changed();
            return Err(err);
        }
        Ok(())
    }

    // ── Check state ─────────────────────────────────────────────────

    #[must_use]
    pub fn checkable(&self) -> bool {
        self.core.checkable.get()
    }

    pub fn set_checkable(&self, checkable: bool) -> Result<(), WidgetError> {
        self.set_flag_with_rollback(&self.core.checkable, checkable)
    }

    #[must_use]
    pub fn checked(&self) -> bool {
        self.core.checked.get()
    }

    pub fn set_checked(&self, checked: bool) -> Result<(), WidgetError> {
        self.set_flag_with_rollback(&self.core.checked, checked)
    }

    #[must_use]
    pub fn exclusive(&self) -> bool {
        self.core.exclusive.get()
    }

    pub fn set_exclusive(&self, exclusive: bool) -> Result<(), WidgetError> {
        self.set_flag_with_rollback(&self.core.exclusive, exclusive)
    }

    fn set_flag_with_rollback(&self, flag: &Cell<bool>, value: bool) -> Result<(), WidgetError> {
        if flag.get() == value {
            return Ok(());
        }
        flag.set(value);
        if let Err(err) = self.raise_changed() {
            flag.set(!value);
            let _ = self.raise_changed();
            return Err(err);
        }
        Ok(())
    }

    // ── Enabled / visible, optionally condition-driven ──────────────

    /// The effective enabled state: the installed condition wins over the
    /// explicit flag.
    #[must_use]
    pub fn enabled(&self) -> bool {
        if let Some(condition) = self.core.enabled_condition.borrow().clone() {
            return condition.satisfied();
        }
        self.core.enabled.get()
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<(), WidgetError> {
        if self.core.enabled_condition.borrow().is_some() {
            return Err(WidgetError::ConditionDriven("enabled"));
        }
        self.set_flag_with_rollback(&self.core.enabled, enabled)
    }

    #[must_use]
    pub fn enabled_condition(&self) -> Option<Rc<dyn Condition>> {
        self.core.enabled_condition.borrow().clone()
    }

    /// Delegate the enabled flag to `condition` (or clear with `None`).
    pub fn set_enabled_condition(&self, condition: Option<Rc<dyn Condition>>) {
        if let Some(handle) = self.core.enabled_condition_handle.take() {
            if let Some(old) = self.core.enabled_condition.borrow().clone() {
                old.changed().detach(handle);
            }
        }
        *self.core.enabled_condition.borrow_mut() = condition.clone();
        if let Some(condition) = condition {
            self.core.enabled.set(condition.satisfied());
            let weak = Rc::downgrade(&self.core);
            let handle = condition.changed().attach(move |_| {
                let Some(core) = weak.upgrade() else { return };
                let Some(condition) = core.enabled_condition.borrow().clone() else {
                    return;
                };
                let satisfied = condition.satisfied();
                if core.enabled.get() != satisfied {
                    core.enabled.set(satisfied);
                    let _ = Action::from_core(Rc::clone(&core)).raise_changed();
                }
            });
            self.core.enabled_condition_handle.set(Some(handle));
        }
        let _ = self.raise_changed();
    }

    /// The effective visible state.
    #[must_use]
    pub fn visible(&self) -> bool {
        if let Some(condition) = self.core.visible_condition.borrow().clone() {
            return condition.satisfied();
        }
        self.core.visible.get()
    }

    pub fn set_visible(&self, visible: bool) -> Result<(), WidgetError> {
        if self.core.visible_condition.borrow().is_some() {
            return Err(WidgetError::ConditionDriven("visible"));
        }
        if self.core.visible.get() == visible {
            return Ok(());
        }
        self.core.visible.set(visible);
        if let Err(err) = self.raise_visible_changed() {
            self.core.visible.set(!visible);
            let _ = self.raise_visible_changed();
            return Err(err);
        }
        Ok(())
    }

    #[must_use]
    pub fn visible_condition(&self) -> Option<Rc<dyn Condition>> {
        self.core.visible_condition.borrow().clone()
    }

    /// Delegate the visible flag to `condition` (or clear with `None`).
    pub fn set_visible_condition(&self, condition: Option<Rc<dyn Condition>>) {
        if let Some(handle) = self.core.visible_condition_handle.take() {
            if let Some(old) = self.core.visible_condition.borrow().clone() {
                old.changed().detach(handle);
            }
        }
        *self.core.visible_condition.borrow_mut() = condition.clone();
        if let Some(condition) = condition {
            self.core.visible.set(condition.satisfied());
            let weak = Rc::downgrade(&self.core);
            let handle = condition.changed().attach(move |_| {
                let Some(core) = weak.upgrade() else { return };
                let Some(condition) = core.visible_condition.borrow().clone() else {
                    return;
                };
                let satisfied = condition.satisfied();
                if core.visible.get() != satisfied {
                    core.visible.set(satisfied);
                    let _ = Action::from_core(Rc::clone(&core)).raise_visible_changed();
                }
            });
            self.core.visible_condition_handle.set(Some(handle));
        }
        let _ = self.raise_visible_changed();
    }

    // ── Shortcut ────────────────────────────────────────────────────

    #[must_use]
    pub fn shortcut(&self) -> Option<Shortcut> {
        self.core.shortcut.get()
    }

    /// Claim (or release, with `None`) a shortcut in the owning context.
    pub fn set_shortcut(&self, shortcut: Option<Shortcut>) -> Result<(), WidgetError> {
        let old = self.core.shortcut.get();
        if shortcut == old {
            return Ok(());
        }
        self.core.shortcut.set(shortcut);
        if let Err(err) = self.raise_changed() {
            self.core.shortcut.set(old);
            let _ = self.raise_changed();
            return Err(err);
        }
        if let Some(context) = self.core.context.upgrade() {
            if let Some(old) = old {
                context.unregister_shortcut(old);
            }
            if let Some(new) = shortcut {
                context.register_shortcut(new, self.core.id);
            }
        }
        Ok(())
    }

    // ── Triggering ──────────────────────────────────────────────────

    #[must_use]
    pub fn triggered(&self) -> Event<()> {
        self.core.triggered.event()
    }

    /// Fire the triggered event (a menu click, a shortcut hit).
    pub fn trigger(&self) {
        self.core.triggered.raise();
    }
}

// ---------------------------------------------------------------------------
// ActionList
// ---------------------------------------------------------------------------

/// An ordered, owning collection of actions; membership changes publish the
/// affected index. Dropping the list drops its ownership share of every
/// action.
#[derive(Default)]
pub struct ActionList {
    actions: Vec<Action>,
    inserted: EventPublisher<i64>,
    removed: EventPublisher<i64>,
}

impl ActionList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Action> {
        self.actions.get(index).cloned()
    }

    pub fn add(&mut self, action: Action) {
        self.insert(self.actions.len(), action);
    }

    pub fn insert(&mut self, index: usize, action: Action) {
        self.actions.insert(index, action);
        self.inserted.publish(&(index as i64));
    }

    pub fn remove(&mut self, index: usize) -> Option<Action> {
        if index >= self.actions.len() {
            return None;
        }
        let action = self.actions.remove(index);
        self.removed.publish(&(index as i64));
        Some(action)
    }

    #[must_use]
    pub fn index_of(&self, action: &Action) -> Option<usize> {
        self.actions.iter().position(|a| a.id() == action.id())
    }

    #[must_use]
    pub fn contains(&self, action: &Action) -> bool {
        self.index_of(action).is_some()
    }

    pub fn clear(&mut self) {
        for index in (0..self.actions.len()).rev() {
            self.actions.remove(index);
            self.removed.publish(&(index as i64));
        }
    }

    #[must_use]
    pub fn inserted(&self) -> Event<i64> {
        self.inserted.event()
    }

    #[must_use]
    pub fn removed(&self) -> Event<i64> {
        self.removed.event()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
