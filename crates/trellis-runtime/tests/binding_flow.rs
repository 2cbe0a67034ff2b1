//! End-to-end binding flow over a typed application record.

use std::cell::RefCell;
use std::rc::Rc;

use trellis_runtime::{
    BindError, BoundControl, ControlId, DataBinder, Property, RangeValidator, Record, Source,
    Value,
};

/// A typed form model, the way an application would implement the seam.
#[derive(Debug, Default, PartialEq)]
struct Contact {
    name: String,
    age: f64,
}

impl Record for Contact {
    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "Name" => Some(Value::Str(self.name.clone())),
            "Age" => Some(Value::Float(self.age)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<(), BindError> {
        match (name, value) {
            ("Name", Value::Str(s)) => {
                self.name = s;
                Ok(())
            }
            ("Age", value) => {
                self.age = value.coerce_float()?;
                Ok(())
            }
            (_, value) => Err(BindError::TypeMismatch {
                expected: "known field",
                got: value.kind(),
            }),
        }
    }

    fn is_settable(&self, name: &str) -> bool {
        matches!(name, "Name" | "Age")
    }
}

struct FormControl {
    id: ControlId,
    properties: Vec<Property>,
}

impl BoundControl for FormControl {
    fn control_id(&self) -> ControlId {
        self.id
    }

    fn properties(&self) -> Vec<Property> {
        self.properties.clone()
    }
}

fn tagged(initial: Value, tag: &str) -> Property {
    let property = Property::stored(initial);
    property.set_source(Some(Source::from(tag))).unwrap();
    property
}

#[test]
fn manual_mode_full_cycle() {
    let contact = Rc::new(RefCell::new(Contact {
        name: "Ada".into(),
        age: 36.0,
    }));

    let name = tagged(Value::Str(String::new()), "Name");
    let age = tagged(Value::Float(0.0), "Age");
    age.set_validator(Some(Rc::new(RangeValidator::new(0.0, 150.0).unwrap())))
        .unwrap();

    let form = FormControl {
        id: ControlId::from_raw(1),
        properties: vec![name.clone(), age.clone()],
    };

    let binder = DataBinder::new();
    binder.set_data_source(Some(contact.clone())).unwrap();
    binder.set_bound_controls(&[&form]).unwrap();

    binder.reset().unwrap();
    assert_eq!(name.get(), Value::Str("Ada".into()));
    assert_eq!(age.get(), Value::Float(36.0));
    assert!(binder.can_submit());
    assert!(!binder.dirty());

    // Edit both fields; an out-of-range age closes the submit gate.
    name.set(Value::from("Grace")).unwrap();
    age.set(Value::Float(200.0)).unwrap();
    assert!(binder.dirty());
    assert_eq!(binder.submit(), Err(BindError::ValidationFailed));
    assert_eq!(
        contact.borrow().name,
        "Ada",
        "failed submit must not write anything"
    );

    age.set(Value::Float(85.0)).unwrap();
    binder.submit().unwrap();
    assert_eq!(
        *contact.borrow(),
        Contact {
            name: "Grace".into(),
            age: 85.0
        }
    );
    assert!(!binder.dirty());
}

#[test]
fn auto_submit_mode_writes_each_change() {
    let contact = Rc::new(RefCell::new(Contact::default()));

    let name = tagged(Value::Str(String::new()), "Name");
    let form = FormControl {
        id: ControlId::from_raw(1),
        properties: vec![name.clone()],
    };

    let binder = DataBinder::new();
    binder.set_data_source(Some(contact.clone())).unwrap();
    binder.set_auto_submit(true);
    binder.set_bound_controls(&[&form]).unwrap();

    name.set(Value::from("Lin")).unwrap();
    assert_eq!(contact.borrow().name, "Lin");

    name.set(Value::from("Linus")).unwrap();
    assert_eq!(contact.borrow().name, "Linus");
}

#[test]
fn binding_against_a_typed_record_validates_paths() {
    let contact = Rc::new(RefCell::new(Contact::default()));
    let bogus = tagged(Value::Null, "Nickname");
    let form = FormControl {
        id: ControlId::from_raw(1),
        properties: vec![bogus],
    };

    let binder = DataBinder::new();
    binder.set_data_source(Some(contact)).unwrap();
    assert_eq!(
        binder.set_bound_controls(&[&form]),
        Err(BindError::FieldResolution {
            path: "Nickname".into()
        })
    );
}
