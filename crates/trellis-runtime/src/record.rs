#![forbid(unsafe_code)]

//! The record seam: named-field access over application data.
//!
//! The binder never reflects over arbitrary types; it talks to this trait.
//! A dotted path (`"Address.City"`) walks [`Record::nested`] for every
//! intermediate segment and resolves the final segment as a field, falling
//! back to a zero-argument accessor. An accessor that can fail reports its
//! failure as [`Value::Error`], which travels through the property layer as
//! data.
//!
//! Unresolvable paths come back as [`BindError::FieldResolution`]; resolving
//! them eagerly when bindings are installed turns a misconfigured binding
//! into a construction-time error instead of a surprise on first use.

use ahash::AHashMap;

use crate::error::BindError;
use crate::value::Value;

/// Named-field access over one aggregate.
pub trait Record {
    /// Read a directly-stored field.
    fn field(&self, name: &str) -> Option<Value>;

    /// Write a directly-stored field.
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), BindError>;

    /// Whether `set_field(name, ..)` can succeed.
    fn is_settable(&self, name: &str) -> bool;

    /// A nested record for path traversal.
    fn nested(&self, _name: &str) -> Option<&dyn Record> {
        None
    }

    fn nested_mut(&mut self, _name: &str) -> Option<&mut dyn Record> {
        None
    }

    /// Zero-argument accessor fallback, tried when no field matches.
    fn accessor(&self, _name: &str) -> Option<Value> {
        None
    }
}

fn unresolved(path: &str) -> BindError {
    BindError::FieldResolution {
        path: path.to_string(),
    }
}

fn descend<'a>(mut record: &'a dyn Record, path: &str, segments: &[&str]) -> Result<&'a dyn Record, BindError> {
    for segment in segments {
        record = record.nested(segment).ok_or_else(|| unresolved(path))?;
    }
    Ok(record)
}

fn descend_mut<'a>(
    mut record: &'a mut dyn Record,
    path: &str,
    segments: &[&str],
) -> Result<&'a mut dyn Record, BindError> {
    for segment in segments {
        record = record.nested_mut(segment).ok_or_else(|| unresolved(path))?;
    }
    Ok(record)
}

fn split_path(path: &str) -> (Vec<&str>, &str) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let leaf = segments.pop().unwrap_or(path);
    (segments, leaf)
}

/// Read the value behind a dotted path: field first, accessor fallback.
pub fn resolve_path(record: &dyn Record, path: &str) -> Result<Value, BindError> {
    let (parents, leaf) = split_path(path);
    let target = descend(record, path, &parents)?;
    target
        .field(leaf)
        .or_else(|| target.accessor(leaf))
        .ok_or_else(|| unresolved(path))
}

/// Whether the final segment of `path` accepts writes.
///
/// An unresolvable parent chain reads as "not settable"; the read side
/// reports the configuration error.
pub fn path_is_settable(record: &dyn Record, path: &str) -> bool {
    let (parents, leaf) = split_path(path);
    match descend(record, path, &parents) {
        Ok(target) => target.is_settable(leaf),
        Err(_) => false,
    }
}

/// Write `value` to the field behind a dotted path.
pub fn write_path(record: &mut dyn Record, path: &str, value: Value) -> Result<(), BindError> {
    let (parents, leaf) = split_path(path);
    let target = descend_mut(record, path, &parents)?;
    target.set_field(leaf, value)
}

// ---------------------------------------------------------------------------
// MapRecord
// ---------------------------------------------------------------------------

/// A string-keyed record with nested children; the built-in data source for
/// tests and loosely-typed models.
///
/// All present keys are settable, and `set_field` also accepts new keys (map
/// semantics). Path validation only sees *present* keys, so seed the map
/// with defaults before binding.
#[derive(Debug, Default)]
pub struct MapRecord {
    values: AHashMap<String, Value>,
    children: AHashMap<String, MapRecord>,
}

impl MapRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Builder-style nested-record insertion.
    #[must_use]
    pub fn with_nested(mut self, name: impl Into<String>, child: MapRecord) -> Self {
        self.children.insert(name.into(), child);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

impl Record for MapRecord {
    fn field(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<(), BindError> {
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    fn is_settable(&self, _name: &str) -> bool {
        true
    }

    fn nested(&self, name: &str) -> Option<&dyn Record> {
        self.children.get(name).map(|child| child as &dyn Record)
    }

    fn nested_mut(&mut self, name: &str) -> Option<&mut dyn Record> {
        self.children
            .get_mut(name)
            .map(|child| child as &mut dyn Record)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// A hand-written record with a read-only field and accessors, standing
    /// in for a typed application struct.
    struct Person {
        name: String,
        age: i64,
    }

    impl Record for Person {
        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "Name" => Some(Value::Str(self.name.clone())),
                "Age" => Some(Value::Int(self.age)),
                _ => None,
            }
        }

        fn set_field(&mut self, name: &str, value: Value) -> Result<(), BindError> {
            match (name, value) {
                ("Name", Value::Str(s)) => {
                    self.name = s;
                    Ok(())
                }
                ("Name", other) => Err(BindError::TypeMismatch {
                    expected: "string",
                    got: other.kind(),
                }),
                // Age is read-only.
                _ => Err(BindError::FieldResolution {
                    path: name.to_string(),
                }),
            }
        }

        fn is_settable(&self, name: &str) -> bool {
            name == "Name"
        }

        fn accessor(&self, name: &str) -> Option<Value> {
            match name {
                "DisplayName" => Some(Value::Str(format!("{} ({})", self.name, self.age))),
                "Flaky" => Some(Value::Error("backend unavailable".into())),
                _ => None,
            }
        }
    }

    #[test]
    fn field_read_and_write() {
        let mut person = Person {
            name: "Ada".into(),
            age: 36,
        };
        assert_eq!(
            resolve_path(&person, "Name").unwrap(),
            Value::Str("Ada".into())
        );
        write_path(&mut person, "Name", Value::from("Grace")).unwrap();
        assert_eq!(person.name, "Grace");
    }

    #[test]
    fn accessor_fallback_when_no_field_matches() {
        let person = Person {
            name: "Ada".into(),
            age: 36,
        };
        assert_eq!(
            resolve_path(&person, "DisplayName").unwrap(),
            Value::Str("Ada (36)".into())
        );
    }

    #[test]
    fn fallible_accessor_yields_error_value() {
        let person = Person {
            name: "Ada".into(),
            age: 36,
        };
        assert_eq!(
            resolve_path(&person, "Flaky").unwrap(),
            Value::Error("backend unavailable".into())
        );
    }

    #[test]
    fn unresolved_path_is_an_error() {
        let person = Person {
            name: "Ada".into(),
            age: 36,
        };
        assert_eq!(
            resolve_path(&person, "Nope"),
            Err(BindError::FieldResolution {
                path: "Nope".into()
            })
        );
    }

    #[test]
    fn settability_follows_the_record() {
        let person = Person {
            name: "Ada".into(),
            age: 36,
        };
        assert!(path_is_settable(&person, "Name"));
        assert!(!path_is_settable(&person, "Age"));
    }

    #[test]
    fn nested_map_paths() {
        let mut record = MapRecord::new()
            .with("X", 3.0)
            .with_nested("Address", MapRecord::new().with("City", "Berlin"));

        assert_eq!(resolve_path(&record, "X").unwrap(), Value::Float(3.0));
        assert_eq!(
            resolve_path(&record, "Address.City").unwrap(),
            Value::Str("Berlin".into())
        );

        write_path(&mut record, "Address.City", Value::from("Paris")).unwrap();
        assert_eq!(
            resolve_path(&record, "Address.City").unwrap(),
            Value::Str("Paris".into())
        );
    }

    #[test]
    fn nested_miss_reports_the_full_path() {
        let record = MapRecord::new().with("X", 1i64);
        assert_eq!(
            resolve_path(&record, "Address.City"),
            Err(BindError::FieldResolution {
                path: "Address.City".into()
            })
        );
        assert!(!path_is_settable(&record, "Address.City"));
    }

    #[test]
    fn map_allows_new_keys_on_write() {
        let mut record = MapRecord::new();
        write_path(&mut record, "Fresh", Value::Int(1)).unwrap();
        assert_eq!(record.get("Fresh"), Some(&Value::Int(1)));
    }
}
