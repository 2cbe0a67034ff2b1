#![forbid(unsafe_code)]

//! A two-state toggle with a bindable boolean `Checked` property that can
//! also gate actions as a condition.

use std::cell::Cell;
use std::rc::Rc;

use trellis_core::{Event, EventPublisher};
use trellis_runtime::{BoundControl, Condition, ControlId, Property};

use crate::control::ControlBase;

/// Checkbox-style toggle state.
#[derive(Clone)]
pub struct ToggleBox {
    base: ControlBase,
    checked: Rc<Cell<bool>>,
    checked_changed: EventPublisher<()>,
}

impl Default for ToggleBox {
    fn default() -> Self {
        Self::new()
    }
}

impl ToggleBox {
    #[must_use]
    pub fn new() -> Self {
        let base = ControlBase::new();
        let checked = Rc::new(Cell::new(false));
        let checked_changed = EventPublisher::new();

        let read = Rc::clone(&checked);
        let write = Rc::clone(&checked);
        let publisher = checked_changed.clone();
        base.register_property(
            "Checked",
            Property::bool(
                move || read.get(),
                move |value| {
                    if write.get() != value {
                        write.set(value);
                        publisher.raise();
                    }
                    Ok(())
                },
                checked_changed.event(),
            ),
        );

        Self {
            base,
            checked,
            checked_changed,
        }
    }

    #[must_use]
    pub fn base(&self) -> &ControlBase {
        &self.base
    }

    #[must_use]
    pub fn checked(&self) -> bool {
        self.checked.get()
    }

    pub fn set_checked(&self, checked: bool) {
        if self.checked.get() == checked {
            return;
        }
        self.checked.set(checked);
        self.checked_changed.raise();
    }

    /// Flip the state.
    pub fn toggle(&self) {
        self.set_checked(!self.checked.get());
    }

    #[must_use]
    pub fn checked_changed(&self) -> Event<()> {
        self.checked_changed.event()
    }

    /// The bindable checked property.
    #[must_use]
    pub fn checked_property(&self) -> Property {
        self.base
            .property("Checked")
            .expect("Checked property is registered in new()")
    }

    /// The checked state as a [`Condition`], e.g. to enable an action only
    /// while the box is ticked.
    #[must_use]
    pub fn condition(&self) -> Rc<dyn Condition> {
        self.checked_property()
            .as_condition()
            .expect("Checked is a boolean property")
    }
}

impl BoundControl for ToggleBox {
    fn control_id(&self) -> ControlId {
        self.base.control_id()
    }

    fn properties(&self) -> Vec<Property> {
        self.base.properties()
    }
}
