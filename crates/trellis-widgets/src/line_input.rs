#![forbid(unsafe_code)]

//! A minimal single-line text control: a buffer, a changed event and a
//! bindable `Text` property.

use std::cell::RefCell;
use std::rc::Rc;

use trellis_core::{Event, EventPublisher};
use trellis_runtime::{BindError, BoundControl, ControlId, Property, Value};

use crate::control::ControlBase;

/// Single-line text state.
#[derive(Clone)]
pub struct LineInput {
    base: ControlBase,
    text: Rc<RefCell<String>>,
    text_changed: EventPublisher<()>,
}

impl Default for LineInput {
    fn default() -> Self {
        Self::new()
    }
}

impl LineInput {
    #[must_use]
    pub fn new() -> Self {
        let base = ControlBase::new();
        let text = Rc::new(RefCell::new(String::new()));
        let text_changed = EventPublisher::new();

        let read = Rc::clone(&text);
        let write = Rc::clone(&text);
        let publisher = text_changed.clone();
        base.register_property(
            "Text",
            Property::new(
                move || Value::Str(read.borrow().clone()),
                move |value| match value {
                    Value::Str(s) => {
                        if *write.borrow() != s {
                            *write.borrow_mut() = s;
                            publisher.raise();
                        }
                        Ok(())
                    }
                    other => Err(BindError::TypeMismatch {
                        expected: "string",
                        got: other.kind(),
                    }),
                },
                text_changed.event(),
            ),
        );

        Self {
            base,
            text,
            text_changed,
        }
    }

    #[must_use]
    pub fn base(&self) -> &ControlBase {
        &self.base
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    /// Replace the buffer; publishes `text_changed` on a real change.
    pub fn set_text(&self, text: impl Into<String>) {
        let text = text.into();
        if *self.text.borrow() == text {
            return;
        }
        *self.text.borrow_mut() = text;
        self.text_changed.raise();
    }

    /// Insert at the end of the buffer, the way live typing arrives.
    pub fn append(&self, s: &str) {
        if s.is_empty() {
            return;
        }
        self.text.borrow_mut().push_str(s);
        self.text_changed.raise();
    }

    #[must_use]
    pub fn text_changed(&self) -> Event<()> {
        self.text_changed.event()
    }

    /// The bindable text property.
    #[must_use]
    pub fn text_property(&self) -> Property {
        self.base
            .property("Text")
            .expect("Text property is registered in new()")
    }
}

impl BoundControl for LineInput {
    fn control_id(&self) -> ControlId {
        self.base.control_id()
    }

    fn properties(&self) -> Vec<Property> {
        self.base.properties()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn text_property_round_trip() {
        let input = LineInput::new();
        let property = input.text_property();

        property.set(Value::from("hello")).unwrap();
        assert_eq!(input.text(), "hello");
        assert_eq!(property.get(), Value::Str("hello".into()));
    }

    #[test]
    fn set_text_publishes_on_change_only() {
        let input = LineInput::new();
        let fired = Rc::new(Cell::new(0u32));
        let f = Rc::clone(&fired);
        input.text_changed().attach(move |_| f.set(f.get() + 1));

        input.set_text("a");
        input.set_text("a");
        assert_eq!(fired.get(), 1);

        input.append("b");
        assert_eq!(fired.get(), 2);
        assert_eq!(input.text(), "ab");
    }

    #[test]
    fn text_property_rejects_non_strings() {
        let input = LineInput::new();
        let err = input.text_property().set(Value::Int(3)).unwrap_err();
        assert!(matches!(err, BindError::TypeMismatch { expected: "string", .. }));
    }

    #[test]
    fn exposes_base_properties_for_binding() {
        let input = LineInput::new();
        // Enabled, Visible, Focused, Text
        assert_eq!(input.properties().len(), 4);
    }
}
