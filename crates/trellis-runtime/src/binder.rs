#![forbid(unsafe_code)]

//! The data binder: drives a set of tag-sourced properties against one
//! record data source.
//!
//! # Lifecycle
//!
//! [`DataBinder::set_bound_controls`] collects every property (of every
//! given control) whose source is a string tag, validates each tag against
//! the current data source, tears down all previous subscriptions and
//! installs new ones. From then on a bound property change marks the binder
//! dirty and either writes that one field straight back (auto-submit) or
//! runs a validation pass (manual mode). [`DataBinder::reset`] pulls record
//! fields into the properties; [`DataBinder::submit`] pushes property values
//! back, gated on `can_submit`.
//!
//! # Invariants
//!
//! 1. `reset()` never triggers cascading validation: the `in_reset` guard
//!    suppresses the per-change validation pass while record values are
//!    being pulled in.
//! 2. `can_submit` is true iff the last validation pass saw zero failing
//!    validators; `can_submit_changed` publishes only on transition.
//! 3. `dirty` is set by any bound-property change and cleared only by a
//!    completed `reset()` or `submit()`.
//! 4. Auto-submit writes are synchronous: the record field is updated before
//!    the property setter returns to its caller.
//! 5. Unresolvable binding paths fail when bindings are installed (or when a
//!    new data source arrives), never at first use.
//!
//! # Failure Modes
//!
//! | Operation | Failure | Behavior |
//! |-----------|---------|----------|
//! | `submit` with failing validator | `ValidationFailed` | nothing written |
//! | `submit` over an error value | `ErrorValue` | surfaced to caller |
//! | bind with bad tag path | `FieldResolution` | prior bindings intact |
//! | auto-submit with bad field | — | skipped, logged at debug |

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use tracing::{debug, warn};

use trellis_core::{Event, EventHandle, EventPublisher};

use crate::error::BindError;
use crate::expression::Expression;
use crate::property::{Property, PropertyKey, Source};
use crate::record::{path_is_settable, resolve_path, write_path, Record};
use crate::validator::ValidationError;
use crate::value::Value;

/// Stable identity of a bound control, usable as a map key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ControlId(u64);

impl ControlId {
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// The narrow host-widget seam the binder consumes: a stable identity plus
/// the control's bindable properties.
pub trait BoundControl {
    fn control_id(&self) -> ControlId;
    fn properties(&self) -> Vec<Property>;
}

/// UI-facing recipient of per-property validation results. `None` clears a
/// previously presented error for that control.
pub trait ErrorPresenter {
    fn present(&mut self, error: Option<&ValidationError>, control: ControlId);
}

/// A shared, interiorly-mutable record data source.
pub type SharedRecord = Rc<RefCell<dyn Record>>;

struct BinderInner {
    data_source: Option<SharedRecord>,
    properties: Vec<Property>,
    prop_to_control: AHashMap<PropertyKey, ControlId>,
    subscriptions: Vec<(Property, EventHandle)>,
    expressions: AHashMap<String, Rc<dyn Expression>>,
    error_presenter: Option<Rc<RefCell<dyn ErrorPresenter>>>,
    auto_submit: bool,
    auto_submit_suspended: bool,
    can_submit: bool,
    in_reset: bool,
    dirty: bool,
    data_source_changed: EventPublisher<()>,
    can_submit_changed: EventPublisher<()>,
    submitted: EventPublisher<()>,
    reset_finished: EventPublisher<()>,
}

impl BinderInner {
    fn new() -> Self {
        Self {
            data_source: None,
            properties: Vec::new(),
            prop_to_control: AHashMap::new(),
            subscriptions: Vec::new(),
            expressions: AHashMap::new(),
            error_presenter: None,
            auto_submit: false,
            auto_submit_suspended: false,
            can_submit: false,
            in_reset: false,
            dirty: false,
            data_source_changed: EventPublisher::new(),
            can_submit_changed: EventPublisher::new(),
            submitted: EventPublisher::new(),
            reset_finished: EventPublisher::new(),
        }
    }
}

/// Orchestrates load / validate / submit between bound properties and a
/// record data source. Cloning shares the binder.
#[derive(Clone)]
pub struct DataBinder {
    inner: Rc<RefCell<BinderInner>>,
}

impl Default for DataBinder {
    fn default() -> Self {
        Self::new()
    }
}

impl DataBinder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(BinderInner::new())),
        }
    }

    // ── Configuration ───────────────────────────────────────────────

    /// Swap the record the bindings read from and write to.
    ///
    /// Every currently bound tag path is validated against the new record
    /// first; a miss fails with [`BindError::FieldResolution`] and leaves
    /// the previous data source installed.
    pub fn set_data_source(&self, data_source: Option<SharedRecord>) -> Result<(), BindError> {
        if let Some(record) = &data_source {
            let tags = self.bound_tags();
            let record = record.borrow();
            for path in &tags {
                resolve_path(&*record, path)?;
            }
        }

        let publisher = {
            let mut inner = self.inner.borrow_mut();
            inner.data_source = data_source;
            inner.data_source_changed.clone()
        };
        publisher.raise();
        Ok(())
    }

    #[must_use]
    pub fn data_source(&self) -> Option<SharedRecord> {
        self.inner.borrow().data_source.clone()
    }

    #[must_use]
    pub fn auto_submit(&self) -> bool {
        self.inner.borrow().auto_submit
    }

    /// In auto-submit mode every bound change is written straight to the
    /// record and the submit gate is considered open.
    pub fn set_auto_submit(&self, auto_submit: bool) {
        let mut inner = self.inner.borrow_mut();
        inner.auto_submit = auto_submit;
        if auto_submit {
            inner.can_submit = true;
        }
    }

    #[must_use]
    pub fn auto_submit_suspended(&self) -> bool {
        self.inner.borrow().auto_submit_suspended
    }

    /// Suspend or resume auto-submit; resuming performs one full submit so
    /// changes made while suspended are not lost.
    pub fn set_auto_submit_suspended(&self, suspended: bool) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.auto_submit_suspended == suspended {
                return;
            }
            inner.auto_submit_suspended = suspended;
        }
        if !suspended {
            if let Err(err) = self.submit() {
                debug!(error = %err, "submit on auto-submit resume failed");
            }
        }
    }

    pub fn set_error_presenter(&self, presenter: Option<Rc<RefCell<dyn ErrorPresenter>>>) {
        self.inner.borrow_mut().error_presenter = presenter;
    }

    // ── Binding installation ────────────────────────────────────────

    /// Bind every tag-sourced property of `controls`.
    ///
    /// All previous subscriptions are detached first. Each tag path is
    /// validated against the current data source (if one is installed);
    /// any miss aborts the call with the prior bindings still in place.
    pub fn set_bound_controls(&self, controls: &[&dyn BoundControl]) -> Result<(), BindError> {
        // Collect and validate before touching existing state.
        let mut bound: Vec<(Property, ControlId)> = Vec::new();
        for control in controls {
            for property in control.properties() {
                let Some(Source::Tag(path)) = property.source() else {
                    continue;
                };
                if let Some(record) = self.inner.borrow().data_source.clone() {
                    resolve_path(&*record.borrow(), &path)?;
                }
                bound.push((property, control.control_id()));
            }
        }

        let old = std::mem::take(&mut self.inner.borrow_mut().subscriptions);
        for (property, handle) in old {
            property.changed().detach(handle);
        }

        let mut inner = self.inner.borrow_mut();
        inner.properties.clear();
        inner.prop_to_control.clear();
        for (property, control_id) in bound {
            inner.prop_to_control.insert(property.key(), control_id);

            let weak = Rc::downgrade(&self.inner);
            let observed = property.clone();
            let handle = property.changed().attach(move |_| {
                if let Some(strong) = weak.upgrade() {
                    DataBinder { inner: strong }.on_bound_property_changed(&observed);
                }
            });
            inner.subscriptions.push((property.clone(), handle));
            inner.properties.push(property);
        }
        Ok(())
    }

    /// The number of currently bound properties.
    #[must_use]
    pub fn bound_property_count(&self) -> usize {
        self.inner.borrow().properties.len()
    }

    fn bound_tags(&self) -> Vec<String> {
        self.inner
            .borrow()
            .properties
            .iter()
            .filter_map(|property| {
                property
                    .source()
                    .as_ref()
                    .and_then(Source::tag)
                    .map(str::to_string)
            })
            .collect()
    }

    // ── Change propagation ──────────────────────────────────────────

    fn on_bound_property_changed(&self, property: &Property) {
        let (auto, suspended, in_reset, record) = {
            let mut inner = self.inner.borrow_mut();
            inner.dirty = true;
            (
                inner.auto_submit,
                inner.auto_submit_suspended,
                inner.in_reset,
                inner.data_source.clone(),
            )
        };

        if auto && !suspended {
            let Some(Source::Tag(path)) = property.source() else {
                return;
            };
            let Some(record) = record else { return };
            if self.submit_one(&record, property, &path).is_some() {
                let publisher = self.inner.borrow().submitted.clone();
                publisher.raise();
            }
        } else if !in_reset {
            self.validate_properties();
        }
    }

    /// Write one property's value to its record field. `None` means the
    /// write was skipped or failed; auto-submit treats that as routine.
    fn submit_one(&self, record: &SharedRecord, property: &Property, path: &str) -> Option<()> {
        let value = property.get();
        match value {
            Value::Null | Value::Error(_) => {
                debug!(path = %path, kind = value.kind(), "skipping unwritable property value");
                return None;
            }
            _ => {}
        }
        let mut record = record.borrow_mut();
        if !path_is_settable(&*record, path) {
            debug!(path = %path, "skipping non-settable field");
            return None;
        }
        if let Err(err) = write_path(&mut *record, path, value) {
            debug!(path = %path, error = %err, "field write failed");
            return None;
        }
        Some(())
    }

    // ── Validation ──────────────────────────────────────────────────

    /// Run every bound validator, route results to the presenter and fold
    /// them into `can_submit`.
    pub fn validate_properties(&self) {
        let (properties, presenter, prop_to_control) = {
            let inner = self.inner.borrow();
            (
                inner.properties.clone(),
                inner.error_presenter.clone(),
                inner.prop_to_control.clone(),
            )
        };

        let mut has_error = false;
        for property in &properties {
            let Some(validator) = property.validator() else {
                continue;
            };
            let error = validator.validate(&property.get());
            if error.is_some() {
                has_error = true;
            }
            if let Some(presenter) = &presenter {
                if let Some(control) = prop_to_control.get(&property.key()) {
                    presenter.borrow_mut().present(error.as_ref(), *control);
                }
            }
        }

        let publisher = {
            let mut inner = self.inner.borrow_mut();
            if has_error != inner.can_submit {
                None
            } else {
                inner.can_submit = !has_error;
                Some(inner.can_submit_changed.clone())
            }
        };
        if let Some(publisher) = publisher {
            publisher.raise();
        }
    }

    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.inner.borrow().can_submit
    }

    #[must_use]
    pub fn dirty(&self) -> bool {
        self.inner.borrow().dirty
    }

    // ── Reset / submit ──────────────────────────────────────────────

    /// Pull every bound record field into its property, then validate once
    /// and clear the dirty flag.
    pub fn reset(&self) -> Result<(), BindError> {
        self.inner.borrow_mut().in_reset = true;
        let pulled = self.pull_fields();
        self.inner.borrow_mut().in_reset = false;
        pulled?;

        self.validate_properties();
        let publisher = {
            let mut inner = self.inner.borrow_mut();
            inner.dirty = false;
            inner.reset_finished.clone()
        };
        publisher.raise();
        Ok(())
    }

    fn pull_fields(&self) -> Result<(), BindError> {
        let (properties, record) = {
            let inner = self.inner.borrow();
            (inner.properties.clone(), inner.data_source.clone())
        };
        let Some(record) = record else { return Ok(()) };

        for property in properties {
            let Some(Source::Tag(path)) = property.source() else {
                continue;
            };
            let field_value = resolve_path(&*record.borrow(), &path)?;
            // A float-holding property widens whatever numeric type the
            // record stores.
            let value = if matches!(property.get(), Value::Float(_)) {
                Value::Float(field_value.coerce_float()?)
            } else {
                field_value
            };
            property.set(value)?;
        }
        Ok(())
    }

    /// Push every bound property value into its record field.
    ///
    /// Fails fast with [`BindError::ValidationFailed`] while any bound
    /// validator reports an error.
    pub fn submit(&self) -> Result<(), BindError> {
        if !self.can_submit() {
            return Err(BindError::ValidationFailed);
        }

        let (properties, record) = {
            let inner = self.inner.borrow();
            (inner.properties.clone(), inner.data_source.clone())
        };
        if let Some(record) = record {
            for property in &properties {
                let Some(Source::Tag(path)) = property.source() else {
                    continue;
                };
                let value = property.get();
                match value {
                    Value::Error(message) => return Err(BindError::ErrorValue(message)),
                    Value::Null => {
                        debug!(path = %path, "submit skipping null-valued property");
                        continue;
                    }
                    _ => {}
                }
                let mut record = record.borrow_mut();
                if !path_is_settable(&*record, &path) {
                    debug!(path = %path, "submit skipping non-settable field");
                    continue;
                }
                write_path(&mut *record, &path, value)?;
            }
        }

        let publisher = {
            let mut inner = self.inner.borrow_mut();
            inner.dirty = false;
            inner.submitted.clone()
        };
        publisher.raise();
        Ok(())
    }

    // ── Events ──────────────────────────────────────────────────────

    #[must_use]
    pub fn data_source_changed(&self) -> Event<()> {
        self.inner.borrow().data_source_changed.event()
    }

    #[must_use]
    pub fn can_submit_changed(&self) -> Event<()> {
        self.inner.borrow().can_submit_changed.event()
    }

    #[must_use]
    pub fn submitted(&self) -> Event<()> {
        self.inner.borrow().submitted.event()
    }

    #[must_use]
    pub fn reset_finished(&self) -> Event<()> {
        self.inner.borrow().reset_finished.event()
    }

    // ── Path expressions ────────────────────────────────────────────

    /// A cached expression over a record path, rooted at the data source.
    ///
    /// Its value tracks whatever record is installed when it is read; its
    /// changed event is the binder's reset event.
    #[must_use]
    pub fn expression(&self, path: impl Into<String>) -> Rc<dyn Expression> {
        let path = path.into();
        if let Some(existing) = self.inner.borrow().expressions.get(&path) {
            return Rc::clone(existing);
        }
        let expression: Rc<dyn Expression> = Rc::new(BinderPathExpression {
            binder: Rc::downgrade(&self.inner),
            changed: self.reset_finished(),
            path: path.clone(),
        });
        self.inner
            .borrow_mut()
            .expressions
            .insert(path, Rc::clone(&expression));
        expression
    }
}

/// Expression over `data_source.<path>`; see [`DataBinder::expression`].
struct BinderPathExpression {
    binder: Weak<RefCell<BinderInner>>,
    changed: Event<()>,
    path: String,
}

impl Expression for BinderPathExpression {
    fn value(&self) -> Value {
        let Some(inner) = self.binder.upgrade() else {
            return Value::Null;
        };
        let record = inner.borrow().data_source.clone();
        let Some(record) = record else {
            return Value::Null;
        };
        match resolve_path(&*record.borrow(), &self.path) {
            Ok(value) => value,
            Err(err) => {
                warn!(path = %self.path, error = %err, "path expression did not resolve");
                Value::Null
            }
        }
    }

    fn changed(&self) -> Event<()> {
        self.changed.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MapRecord;
    use crate::validator::{RangeValidator, RequiredValidator};
    use std::cell::Cell;

    /// Minimal bound control: a bag of properties with an id.
    struct TestControl {
        id: ControlId,
        properties: Vec<Property>,
    }

    impl TestControl {
        fn new(id: u64, properties: Vec<Property>) -> Self {
            Self {
                id: ControlId::from_raw(id),
                properties,
            }
        }
    }

    impl BoundControl for TestControl {
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

    fn shared(record: MapRecord) -> SharedRecord {
        Rc::new(RefCell::new(record))
    }

    struct Remembered {
        errors: Vec<(Option<String>, ControlId)>,
    }

    impl ErrorPresenter for Remembered {
        fn present(&mut self, error: Option<&ValidationError>, control: ControlId) {
            self.errors
                .push((error.map(|e| e.title().to_string()), control));
        }
    }

    // ── Round trip ──────────────────────────────────────────────────

    #[test]
    fn reset_then_submit_round_trip() {
        let binder = DataBinder::new();
        binder
            .set_data_source(Some(shared(MapRecord::new().with("X", 3.0))))
            .unwrap();

        let property = tagged(Value::Float(0.0), "X");
        let control = TestControl::new(1, vec![property.clone()]);
        binder.set_bound_controls(&[&control]).unwrap();

        binder.reset().unwrap();
        assert_eq!(property.get(), Value::Float(3.0));
        assert!(!binder.dirty());

        property.set(Value::Float(7.0)).unwrap();
        assert!(binder.dirty());
        assert!(binder.can_submit());

        binder.submit().unwrap();
        let record = binder.data_source().unwrap();
        assert_eq!(record.borrow().field("X").unwrap(), Value::Float(7.0));
        assert!(!binder.dirty());
    }

    #[test]
    fn reset_coerces_int_fields_into_float_properties() {
        let binder = DataBinder::new();
        binder
            .set_data_source(Some(shared(MapRecord::new().with("Count", 5i64))))
            .unwrap();

        let property = tagged(Value::Float(0.0), "Count");
        let control = TestControl::new(1, vec![property.clone()]);
        binder.set_bound_controls(&[&control]).unwrap();

        binder.reset().unwrap();
        assert_eq!(property.get(), Value::Float(5.0));
    }

    #[test]
    fn reset_does_not_cascade_validation() {
        let binder = DataBinder::new();
        binder
            .set_data_source(Some(shared(MapRecord::new().with("X", 50.0))))
            .unwrap();

        // A validator that fails for the record's value: reset must still
        // pull it in without a per-change validation storm.
        let property = tagged(Value::Float(0.0), "X");
        property
            .set_validator(Some(Rc::new(RangeValidator::new(0.0, 10.0).unwrap())))
            .unwrap();
        let control = TestControl::new(1, vec![property.clone()]);
        binder.set_bound_controls(&[&control]).unwrap();

        binder.reset().unwrap();
        assert_eq!(property.get(), Value::Float(50.0));
        assert!(!binder.can_submit(), "final validation pass still runs");
        assert_eq!(binder.submit(), Err(BindError::ValidationFailed));
    }

    // ── Auto submit ─────────────────────────────────────────────────

    #[test]
    fn auto_submit_writes_synchronously() {
        let binder = DataBinder::new();
        let record = shared(MapRecord::new().with("X", 1.0));
        binder.set_data_source(Some(Rc::clone(&record))).unwrap();
        binder.set_auto_submit(true);

        let property = tagged(Value::Float(0.0), "X");
        let control = TestControl::new(1, vec![property.clone()]);
        binder.set_bound_controls(&[&control]).unwrap();

        let submitted = Rc::new(Cell::new(0u32));
        let s = Rc::clone(&submitted);
        binder.submitted().attach(move |_| s.set(s.get() + 1));

        property.set(Value::Float(9.5)).unwrap();
        // The write happened before set() returned.
        assert_eq!(record.borrow().field("X").unwrap(), Value::Float(9.5));
        assert_eq!(submitted.get(), 1);
        assert!(binder.dirty(), "auto-submit still marks dirty");
    }

    #[test]
    fn auto_submit_suspension_defers_then_flushes() {
        let binder = DataBinder::new();
        let record = shared(MapRecord::new().with("X", 1.0));
        binder.set_data_source(Some(Rc::clone(&record))).unwrap();
        binder.set_auto_submit(true);

        let property = tagged(Value::Float(0.0), "X");
        let control = TestControl::new(1, vec![property.clone()]);
        binder.set_bound_controls(&[&control]).unwrap();

        binder.set_auto_submit_suspended(true);
        property.set(Value::Float(4.0)).unwrap();
        assert_eq!(
            record.borrow().field("X").unwrap(),
            Value::Float(1.0),
            "suspended: nothing written"
        );

        binder.set_auto_submit_suspended(false);
        assert_eq!(record.borrow().field("X").unwrap(), Value::Float(4.0));
    }

    // ── Validation gating ───────────────────────────────────────────

    #[test]
    fn can_submit_tracks_validators_and_publishes_transitions() {
        let binder = DataBinder::new();
        binder
            .set_data_source(Some(shared(MapRecord::new().with("X", 5.0))))
            .unwrap();

        let property = tagged(Value::Float(5.0), "X");
        property
            .set_validator(Some(Rc::new(RangeValidator::new(0.0, 10.0).unwrap())))
            .unwrap();
        let control = TestControl::new(1, vec![property.clone()]);
        binder.set_bound_controls(&[&control]).unwrap();

        let transitions = Rc::new(Cell::new(0u32));
        let t = Rc::clone(&transitions);
        binder
            .can_submit_changed()
            .attach(move |_| t.set(t.get() + 1));

        binder.reset().unwrap();
        assert!(binder.can_submit());
        assert_eq!(transitions.get(), 1);

        property.set(Value::Float(50.0)).unwrap();
        assert!(!binder.can_submit());
        assert_eq!(transitions.get(), 2);

        property.set(Value::Float(8.0)).unwrap();
        assert!(binder.can_submit());
        assert_eq!(transitions.get(), 3);

        property.set(Value::Float(9.0)).unwrap();
        assert_eq!(transitions.get(), 3, "no transition, no publication");
    }

    #[test]
    fn presenter_receives_errors_and_clears() {
        let binder = DataBinder::new();
        binder
            .set_data_source(Some(shared(MapRecord::new().with("Choice", 1i64))))
            .unwrap();

        let property = tagged(Value::Int(1), "Choice");
        property
            .set_validator(Some(Rc::new(RequiredValidator)))
            .unwrap();
        let control = TestControl::new(7, vec![property.clone()]);
        binder.set_bound_controls(&[&control]).unwrap();

        let presenter = Rc::new(RefCell::new(Remembered { errors: Vec::new() }));
        binder.set_error_presenter(Some(presenter.clone()));

        property.set(Value::Null).unwrap();
        property.set(Value::Int(2)).unwrap();

        let presented = presenter.borrow();
        let errors = &presented.errors;
        assert_eq!(
            errors[0],
            (
                Some("Selection Required".to_string()),
                ControlId::from_raw(7)
            )
        );
        assert_eq!(errors[1], (None, ControlId::from_raw(7)));
    }

    // ── Bind-time path validation ───────────────────────────────────

    #[test]
    fn binding_an_unresolvable_tag_fails_fast() {
        let binder = DataBinder::new();
        binder
            .set_data_source(Some(shared(MapRecord::new().with("X", 1.0))))
            .unwrap();

        let good = tagged(Value::Float(0.0), "X");
        let control = TestControl::new(1, vec![good]);
        binder.set_bound_controls(&[&control]).unwrap();
        assert_eq!(binder.bound_property_count(), 1);

        let bad = tagged(Value::Float(0.0), "Missing");
        let bad_control = TestControl::new(2, vec![bad]);
        let err = binder.set_bound_controls(&[&bad_control]).unwrap_err();
        assert_eq!(
            err,
            BindError::FieldResolution {
                path: "Missing".into()
            }
        );
        assert_eq!(
            binder.bound_property_count(),
            1,
            "failed install must leave prior bindings"
        );
    }

    #[test]
    fn swapping_in_an_incompatible_data_source_fails() {
        let binder = DataBinder::new();
        binder
            .set_data_source(Some(shared(MapRecord::new().with("X", 1.0))))
            .unwrap();
        let property = tagged(Value::Float(0.0), "X");
        let control = TestControl::new(1, vec![property]);
        binder.set_bound_controls(&[&control]).unwrap();

        let err = binder
            .set_data_source(Some(shared(MapRecord::new().with("Y", 1.0))))
            .unwrap_err();
        assert!(matches!(err, BindError::FieldResolution { .. }));

        // The old record is still in place.
        let record = binder.data_source().unwrap();
        assert_eq!(record.borrow().field("X").unwrap(), Value::Float(1.0));
    }

    #[test]
    fn rebinding_detaches_previous_subscriptions() {
        let binder = DataBinder::new();
        binder
            .set_data_source(Some(shared(MapRecord::new().with("X", 1.0))))
            .unwrap();

        let property = tagged(Value::Float(0.0), "X");
        let control = TestControl::new(1, vec![property.clone()]);
        binder.set_bound_controls(&[&control]).unwrap();
        assert_eq!(property.changed().handler_count(), 1);

        binder.set_bound_controls(&[]).unwrap();
        assert_eq!(property.changed().handler_count(), 0);
        property.set(Value::Float(2.0)).unwrap();
        assert!(!binder.dirty(), "unbound property must not reach the binder");
    }

    #[test]
    fn non_tag_properties_are_ignored() {
        let binder = DataBinder::new();
        let plain = Property::stored(Value::Int(1));
        let chained = Property::stored(Value::Int(2));
        chained
            .set_source(Some(Source::Prop(Property::stored(Value::Int(3)))))
            .unwrap();
        let control = TestControl::new(1, vec![plain, chained]);
        binder.set_bound_controls(&[&control]).unwrap();
        assert_eq!(binder.bound_property_count(), 0);
    }

    // ── Submit skips and error values ───────────────────────────────

    #[test]
    fn submit_surfaces_error_values() {
        let binder = DataBinder::new();
        binder
            .set_data_source(Some(shared(MapRecord::new().with("X", 1.0))))
            .unwrap();

        let property = tagged(Value::Float(0.0), "X");
        let control = TestControl::new(1, vec![property.clone()]);
        binder.set_bound_controls(&[&control]).unwrap();
        binder.reset().unwrap();

        property.set(Value::Error("parse failed".into())).unwrap();
        assert_eq!(
            binder.submit(),
            Err(BindError::ErrorValue("parse failed".into()))
        );
    }

    #[test]
    fn submit_skips_null_values() {
        let binder = DataBinder::new();
        let record = shared(MapRecord::new().with("X", 1.0));
        binder.set_data_source(Some(Rc::clone(&record))).unwrap();

        let property = tagged(Value::Float(0.0), "X");
        let control = TestControl::new(1, vec![property.clone()]);
        binder.set_bound_controls(&[&control]).unwrap();
        binder.reset().unwrap();

        property.set(Value::Null).unwrap();
        binder.submit().unwrap();
        assert_eq!(
            record.borrow().field("X").unwrap(),
            Value::Float(1.0),
            "null must not overwrite the field"
        );
    }

    // ── Path expressions ────────────────────────────────────────────

    #[test]
    fn path_expression_tracks_data_source() {
        let binder = DataBinder::new();
        let expression = binder.expression("Address.City");
        assert_eq!(expression.value(), Value::Null, "no data source yet");

        binder
            .set_data_source(Some(shared(
                MapRecord::new()
                    .with_nested("Address", MapRecord::new().with("City", "Berlin")),
            )))
            .unwrap();
        assert_eq!(expression.value(), Value::Str("Berlin".into()));

        // Cached by path.
        assert!(Rc::ptr_eq(
            &binder.expression("Address.City"),
            &expression
        ));
    }

    #[test]
    fn path_expression_yields_null_on_a_bad_path() {
        let binder = DataBinder::new();
        binder
            .set_data_source(Some(shared(MapRecord::new().with("X", 1.0))))
            .unwrap();
        // Unresolvable paths are logged, not fatal: reads degrade to Null.
        let expression = binder.expression("Bogus");
        assert_eq!(expression.value(), Value::Null);
    }

    #[test]
    fn path_expression_changed_is_the_reset_event() {
        let binder = DataBinder::new();
        let expression = binder.expression("X");
        assert!(expression.changed().same_event(&binder.reset_finished()));
    }
}
