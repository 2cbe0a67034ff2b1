#![forbid(unsafe_code)]

//! The property abstraction: a typed get/set/validate wrapper around one
//! widget attribute, optionally chained to a source.
//!
//! # Invariants
//!
//! 1. `set` with a value equal to the current one is a no-op on the standard
//!    variant: the backing setter is not called, so no change event and no
//!    validator run. The boolean variant deliberately skips this
//!    short-circuit — at least one visibility-style control depends on the
//!    backing setter re-running for an equal value — and the exception stays
//!    confined to that variant.
//! 2. A property may not, transitively through chained property sources, be
//!    its own source. The cycle is detected and rejected *before* any value,
//!    source slot or subscription changes.
//! 3. Installing a new source always detaches the previous source
//!    subscription, whatever kind the previous source was.
//! 4. Configuration failures ([`BindError::ReadOnly`],
//!    [`BindError::SourceCycle`], [`BindError::InvalidSource`],
//!    [`BindError::NotValidatable`]) leave the property untouched.
//!
//! # Failure Modes
//!
//! | Operation | Failure | State after |
//! |-----------|---------|-------------|
//! | `set` on read-only | `ReadOnly` | unchanged |
//! | `set_source` closing a cycle | `SourceCycle` | unchanged |
//! | `set_source(Cond)` on standard | `InvalidSource` | unchanged |
//! | `set_validator` on read-only | `ReadOnly` | unchanged |
//! | `set_validator` on bool | `NotValidatable` | unchanged |

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use trellis_core::{Event, EventHandle, EventPublisher};

use crate::condition::Condition;
use crate::error::BindError;
use crate::expression::Expression;
use crate::validator::Validator;
use crate::value::Value;

/// Where a property pulls its value from.
///
/// A closed sum — there is no "some other runtime type" case to reject at
/// runtime. `Tag` is purely declarative: the data binder resolves it as a
/// record field path; the other three subscribe.
#[derive(Clone)]
pub enum Source {
    /// A record field path, resolved later by the data binder.
    Tag(String),
    /// Another property; the chain is checked for cycles.
    Prop(Property),
    /// A general expression.
    Expr(Rc<dyn Expression>),
    /// A condition; accepted only by boolean properties.
    Cond(Rc<dyn Condition>),
}

impl Source {
    /// The path string if this is a tag source.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Tag(path) => Some(path),
            _ => None,
        }
    }

    /// The changed event of a subscribing source, if any.
    fn changed_event(&self) -> Option<Event<()>> {
        match self {
            Self::Tag(_) => None,
            Self::Prop(p) => Some(p.changed()),
            Self::Expr(e) => Some(e.changed()),
            Self::Cond(c) => Some(c.changed()),
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(path) => f.debug_tuple("Tag").field(path).finish(),
            Self::Prop(_) => f.write_str("Prop(..)"),
            Self::Expr(_) => f.write_str("Expr(..)"),
            Self::Cond(_) => f.write_str("Cond(..)"),
        }
    }
}

impl From<&str> for Source {
    fn from(path: &str) -> Self {
        Self::Tag(path.to_string())
    }
}

impl From<String> for Source {
    fn from(path: String) -> Self {
        Self::Tag(path)
    }
}

impl From<Property> for Source {
    fn from(property: Property) -> Self {
        Self::Prop(property)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PropertyKind {
    Standard,
    Bool,
}

/// Identity of a property handle, usable as a map key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PropertyKey(usize);

type Getter = Box<dyn Fn() -> Value>;
type Setter = Box<dyn Fn(Value) -> Result<(), BindError>>;

struct PropertyInner {
    get: Getter,
    set: Option<Setter>,
    changed: Event<()>,
    kind: PropertyKind,
    validatable: bool,
    source: RefCell<Option<Source>>,
    source_handle: Cell<Option<EventHandle>>,
    validator: RefCell<Option<Rc<dyn Validator>>>,
}

/// A shared handle to one bindable widget attribute.
///
/// Cloning shares the underlying slot; identity (for maps and cycle checks)
/// is the allocation, exposed via [`Property::key`].
#[derive(Clone)]
pub struct Property {
    inner: Rc<PropertyInner>,
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("read_only", &self.is_read_only())
            .field("source", &self.inner.source.borrow())
            .finish()
    }
}

impl Property {
    fn build(
        get: Getter,
        set: Option<Setter>,
        changed: Event<()>,
        kind: PropertyKind,
    ) -> Self {
        let validatable = kind == PropertyKind::Standard && set.is_some();
        Self {
            inner: Rc::new(PropertyInner {
                get,
                set,
                changed,
                kind,
                validatable,
                source: RefCell::new(None),
                source_handle: Cell::new(None),
                validator: RefCell::new(None),
            }),
        }
    }

    /// A standard writable property over a getter/setter pair. The setter is
    /// expected to publish `changed` itself after mutating the widget.
    pub fn new(
        get: impl Fn() -> Value + 'static,
        set: impl Fn(Value) -> Result<(), BindError> + 'static,
        changed: Event<()>,
    ) -> Self {
        Self::build(
            Box::new(get),
            Some(Box::new(set)),
            changed,
            PropertyKind::Standard,
        )
    }

    /// A read-only property; every mutator fails with [`BindError::ReadOnly`].
    pub fn read_only(get: impl Fn() -> Value + 'static, changed: Event<()>) -> Self {
        Self::build(Box::new(get), None, changed, PropertyKind::Standard)
    }

    /// A boolean property. Not validatable, usable as a condition source, and
    /// intentionally without the equality short-circuit on `set`.
    pub fn bool(
        get: impl Fn() -> bool + 'static,
        set: impl Fn(bool) -> Result<(), BindError> + 'static,
        changed: Event<()>,
    ) -> Self {
        Self::build(
            Box::new(move || Value::Bool(get())),
            Some(Box::new(move |value| match value {
                Value::Bool(b) => set(b),
                other => Err(BindError::TypeMismatch {
                    expected: "bool",
                    got: other.kind(),
                }),
            })),
            changed,
            PropertyKind::Bool,
        )
    }

    /// A read-only boolean property.
    pub fn read_only_bool(get: impl Fn() -> bool + 'static, changed: Event<()>) -> Self {
        Self::build(
            Box::new(move || Value::Bool(get())),
            None,
            changed,
            PropertyKind::Bool,
        )
    }

    /// A property backed by an internal cell that publishes on change.
    /// Mostly for application models and tests.
    #[must_use]
    pub fn stored(initial: Value) -> Self {
        let cell = Rc::new(RefCell::new(initial));
        let publisher = EventPublisher::<()>::new();
        let changed = publisher.event();
        let read = Rc::clone(&cell);
        Self::new(
            move || read.borrow().clone(),
            move |value| {
                *cell.borrow_mut() = value;
                publisher.raise();
                Ok(())
            },
            changed,
        )
    }

    /// Stable identity of the underlying slot.
    #[must_use]
    pub fn key(&self) -> PropertyKey {
        PropertyKey(Rc::as_ptr(&self.inner) as usize)
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.inner.set.is_none()
    }

    /// The current value.
    #[must_use]
    pub fn get(&self) -> Value {
        (self.inner.get)()
    }

    /// Write a value through the backing setter.
    ///
    /// The standard variant short-circuits when `value` equals the current
    /// value; the boolean variant always calls through.
    pub fn set(&self, value: Value) -> Result<(), BindError> {
        let Some(set) = &self.inner.set else {
            return Err(BindError::ReadOnly);
        };
        if self.inner.kind == PropertyKind::Standard && value == self.get() {
            return Ok(());
        }
        set(value)
    }

    /// The changed event, published by the backing setter on real changes.
    #[must_use]
    pub fn changed(&self) -> Event<()> {
        self.inner.changed.clone()
    }

    /// The current source, if any.
    #[must_use]
    pub fn source(&self) -> Option<Source> {
        self.inner.source.borrow().clone()
    }

    /// Install, replace or clear (`None`) the source.
    ///
    /// Subscribing sources are pulled immediately and re-pulled on every
    /// future change; `Tag` sources are stored verbatim for the data binder.
    pub fn set_source(&self, source: Option<Source>) -> Result<(), BindError> {
        if self.is_read_only() {
            return Err(BindError::ReadOnly);
        }

        // Reject before touching any state.
        match &source {
            Some(Source::Prop(candidate)) => self.check_cycle(candidate)?,
            Some(Source::Cond(_)) if self.inner.kind != PropertyKind::Bool => {
                return Err(BindError::InvalidSource("condition"));
            }
            _ => {}
        }

        // Initial pull. On a standard property the pull result is advisory
        // (the source may hold a value this property cannot represent yet);
        // a bool property pulls only boolean values and a failing pull
        // aborts the whole installation, prior source intact.
        match &source {
            Some(Source::Prop(p)) => self.pull_expression_value(p.get())?,
            Some(Source::Expr(e)) => self.pull_expression_value(e.value())?,
            Some(Source::Cond(c)) => self.set(Value::Bool(c.satisfied()))?,
            Some(Source::Tag(_)) | None => {}
        }

        // Tear down the previous subscription, then install the new one.
        self.detach_source_subscription();
        let subscription = source.as_ref().and_then(Source::changed_event).map(|event| {
            let weak = Rc::downgrade(&self.inner);
            event.attach(move |_| {
                if let Some(inner) = weak.upgrade() {
                    Property { inner }.pull_from_source();
                }
            })
        });
        self.inner.source_handle.set(subscription);
        *self.inner.source.borrow_mut() = source;

        Ok(())
    }

    /// Pull one expression-shaped value, respecting the variant's typing:
    /// a bool property silently skips non-boolean values.
    fn pull_expression_value(&self, value: Value) -> Result<(), BindError> {
        match (self.inner.kind, value) {
            (PropertyKind::Bool, Value::Bool(b)) => self.set(Value::Bool(b)),
            (PropertyKind::Bool, _) => Ok(()),
            (PropertyKind::Standard, value) => {
                let _ = self.set(value);
                Ok(())
            }
        }
    }

    /// Re-pull the current value from the installed source.
    fn pull_from_source(&self) {
        let source = self.inner.source.borrow().clone();
        match source {
            Some(Source::Prop(p)) => {
                let _ = self.pull_expression_value(p.get());
            }
            Some(Source::Expr(e)) => {
                let _ = self.pull_expression_value(e.value());
            }
            Some(Source::Cond(c)) => {
                let _ = self.set(Value::Bool(c.satisfied()));
            }
            Some(Source::Tag(_)) | None => {}
        }
    }

    fn detach_source_subscription(&self) {
        if let Some(handle) = self.inner.source_handle.take() {
            if let Some(event) = self
                .inner
                .source
                .borrow()
                .as_ref()
                .and_then(Source::changed_event)
            {
                event.detach(handle);
            }
        }
    }

    /// Walk the candidate's chain of property sources; finding `self` there
    /// would close a cycle.
    fn check_cycle(&self, candidate: &Property) -> Result<(), BindError> {
        let mut current = Some(candidate.clone());
        while let Some(property) = current {
            if Rc::ptr_eq(&property.inner, &self.inner) {
                return Err(BindError::SourceCycle);
            }
            current = match property.source() {
                Some(Source::Prop(next)) => Some(next),
                _ => None,
            };
        }
        Ok(())
    }

    /// Whether a validator may be attached.
    #[must_use]
    pub fn validatable(&self) -> bool {
        self.inner.validatable
    }

    #[must_use]
    pub fn validator(&self) -> Option<Rc<dyn Validator>> {
        self.inner.validator.borrow().clone()
    }

    pub fn set_validator(&self, validator: Option<Rc<dyn Validator>>) -> Result<(), BindError> {
        if self.is_read_only() {
            return Err(BindError::ReadOnly);
        }
        if !self.inner.validatable {
            return Err(BindError::NotValidatable);
        }
        *self.inner.validator.borrow_mut() = validator;
        Ok(())
    }

    /// View a boolean property as a [`Condition`] (e.g. to gate an action on
    /// a checkbox). `None` for non-boolean properties.
    #[must_use]
    pub fn as_condition(&self) -> Option<Rc<dyn Condition>> {
        if self.inner.kind == PropertyKind::Bool {
            Some(Rc::new(BoolPropertyCondition {
                property: self.clone(),
            }))
        } else {
            None
        }
    }
}

impl Expression for Property {
    fn value(&self) -> Value {
        self.get()
    }

    fn changed(&self) -> Event<()> {
        self.inner.changed.clone()
    }
}

/// Adapter presenting a boolean property as a condition.
struct BoolPropertyCondition {
    property: Property,
}

impl Expression for BoolPropertyCondition {
    fn value(&self) -> Value {
        self.property.get()
    }

    fn changed(&self) -> Event<()> {
        self.property.changed()
    }
}

impl Condition for BoolPropertyCondition {
    fn satisfied(&self) -> bool {
        self.property.get().as_bool().unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::MutableCondition;
    use std::cell::Cell;

    /// A property over a cell that counts backing-setter invocations.
    fn counting_property(initial: Value) -> (Property, Rc<Cell<u32>>) {
        let cell = Rc::new(RefCell::new(initial));
        let calls = Rc::new(Cell::new(0u32));
        let publisher = EventPublisher::<()>::new();
        let changed = publisher.event();
        let read = Rc::clone(&cell);
        let count = Rc::clone(&calls);
        let property = Property::new(
            move || read.borrow().clone(),
            move |value| {
                count.set(count.get() + 1);
                *cell.borrow_mut() = value;
                publisher.raise();
                Ok(())
            },
            changed,
        );
        (property, calls)
    }

    fn counting_bool_property(initial: bool) -> (Property, Rc<Cell<u32>>) {
        let cell = Rc::new(Cell::new(initial));
        let calls = Rc::new(Cell::new(0u32));
        let publisher = EventPublisher::<()>::new();
        let changed = publisher.event();
        let read = Rc::clone(&cell);
        let count = Rc::clone(&calls);
        let property = Property::bool(
            move || read.get(),
            move |b| {
                count.set(count.get() + 1);
                if cell.get() != b {
                    cell.set(b);
                    publisher.raise();
                }
                Ok(())
            },
            changed,
        );
        (property, calls)
    }

    // ── No-op set law ───────────────────────────────────────────────

    #[test]
    fn equal_set_is_a_no_op_on_standard() {
        let (property, calls) = counting_property(Value::Int(3));
        let fired = Rc::new(Cell::new(0u32));
        let f = Rc::clone(&fired);
        property.changed().attach(move |_| f.set(f.get() + 1));

        property.set(Value::Int(3)).unwrap();
        assert_eq!(calls.get(), 0, "backing setter must not run");
        assert_eq!(fired.get(), 0, "change event must not fire");

        property.set(Value::Int(4)).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn bool_property_always_reasserts() {
        let (property, calls) = counting_bool_property(true);
        property.set(Value::Bool(true)).unwrap();
        property.set(Value::Bool(true)).unwrap();
        assert_eq!(
            calls.get(),
            2,
            "bool variant must call through even for equal values"
        );
    }

    #[test]
    fn bool_property_rejects_non_bool() {
        let (property, calls) = counting_bool_property(false);
        let err = property.set(Value::Int(1)).unwrap_err();
        assert!(matches!(err, BindError::TypeMismatch { expected: "bool", .. }));
        assert_eq!(calls.get(), 0);
    }

    // ── Read-only gating ────────────────────────────────────────────

    #[test]
    fn read_only_rejects_all_mutators() {
        let property = Property::read_only(|| Value::Int(1), Event::new());
        assert_eq!(property.set(Value::Int(2)), Err(BindError::ReadOnly));
        assert_eq!(
            property.set_source(Some(Source::from("X"))),
            Err(BindError::ReadOnly)
        );
        assert_eq!(property.set_validator(None), Err(BindError::ReadOnly));
        assert!(!property.validatable());
    }

    #[test]
    fn bool_property_is_not_validatable() {
        let (property, _) = counting_bool_property(false);
        assert!(!property.validatable());
        assert_eq!(
            property.set_validator(None),
            Err(BindError::NotValidatable)
        );
    }

    // ── Source chaining ─────────────────────────────────────────────

    #[test]
    fn tag_source_is_declarative() {
        let (property, calls) = counting_property(Value::Null);
        property.set_source(Some(Source::from("Person.Name"))).unwrap();
        assert_eq!(property.source().unwrap().tag(), Some("Person.Name"));
        assert_eq!(calls.get(), 0, "tag sources must not pull");
    }

    #[test]
    fn property_source_pulls_now_and_later() {
        let source = Property::stored(Value::Int(1));
        let (target, _) = counting_property(Value::Null);

        target.set_source(Some(source.clone().into())).unwrap();
        assert_eq!(target.get(), Value::Int(1), "immediate pull");

        source.set(Value::Int(42)).unwrap();
        assert_eq!(target.get(), Value::Int(42), "re-pull on source change");
    }

    #[test]
    fn clearing_source_detaches() {
        let source = Property::stored(Value::Int(1));
        let (target, _) = counting_property(Value::Null);
        target.set_source(Some(source.clone().into())).unwrap();
        assert_eq!(source.changed().handler_count(), 1);

        target.set_source(None).unwrap();
        assert_eq!(source.changed().handler_count(), 0);

        source.set(Value::Int(9)).unwrap();
        assert_eq!(target.get(), Value::Int(1), "no pull after clearing");
    }

    #[test]
    fn replacing_source_detaches_previous() {
        let first = Property::stored(Value::Int(1));
        let second = Property::stored(Value::Int(2));
        let (target, _) = counting_property(Value::Null);

        target.set_source(Some(first.clone().into())).unwrap();
        target.set_source(Some(second.clone().into())).unwrap();
        assert_eq!(first.changed().handler_count(), 0);
        assert_eq!(target.get(), Value::Int(2));
    }

    #[test]
    fn direct_cycle_rejected() {
        let property = Property::stored(Value::Int(1));
        let err = property.set_source(Some(property.clone().into())).unwrap_err();
        assert_eq!(err, BindError::SourceCycle);
        assert!(property.source().is_none());
    }

    #[test]
    fn transitive_cycle_rejected_without_side_effects() {
        let a = Property::stored(Value::Int(1));
        let b = Property::stored(Value::Int(2));
        let c = Property::stored(Value::Int(3));

        b.set_source(Some(a.clone().into())).unwrap();
        c.set_source(Some(b.clone().into())).unwrap();

        // a → b → c → a would close the loop.
        let err = a.set_source(Some(c.clone().into())).unwrap_err();
        assert_eq!(err, BindError::SourceCycle);

        assert!(a.source().is_none(), "failed install must not stick");
        assert_eq!(a.get(), Value::Int(1), "values untouched");
        assert_eq!(
            c.changed().handler_count(),
            0,
            "no subscription may be left behind"
        );
    }

    #[test]
    fn condition_source_rejected_on_standard_property() {
        let condition: Rc<dyn Condition> = Rc::new(MutableCondition::with(true));
        let (property, _) = counting_property(Value::Null);
        assert_eq!(
            property.set_source(Some(Source::Cond(condition))),
            Err(BindError::InvalidSource("condition"))
        );
        assert!(property.source().is_none());
    }

    #[test]
    fn bool_property_follows_condition() {
        let condition = MutableCondition::with(true);
        let (property, _) = counting_bool_property(false);

        property
            .set_source(Some(Source::Cond(Rc::new(condition.clone()))))
            .unwrap();
        assert_eq!(property.get(), Value::Bool(true), "pulled satisfied()");

        condition.set_satisfied(false);
        assert_eq!(property.get(), Value::Bool(false));
    }

    #[test]
    fn bool_property_ignores_non_bool_expression_values() {
        let source = Property::stored(Value::Int(7));
        let (property, calls) = counting_bool_property(false);

        property
            .set_source(Some(Source::Expr(Rc::new(source.clone()))))
            .unwrap();
        assert_eq!(calls.get(), 0, "non-bool expression value is skipped");

        source.set(Value::Bool(true)).unwrap();
        assert_eq!(property.get(), Value::Bool(true));
    }

    #[test]
    fn expression_source_on_standard_property() {
        let source = Property::stored(Value::Str("a".into()));
        let (target, _) = counting_property(Value::Null);

        target
            .set_source(Some(Source::Expr(Rc::new(source.clone()))))
            .unwrap();
        assert_eq!(target.get(), Value::Str("a".into()));

        source.set(Value::from("b")).unwrap();
        assert_eq!(target.get(), Value::Str("b".into()));
    }

    // ── Condition adapter ───────────────────────────────────────────

    #[test]
    fn bool_property_as_condition() {
        let (property, _) = counting_bool_property(true);
        let condition = property.as_condition().unwrap();
        assert!(condition.satisfied());

        property.set(Value::Bool(false)).unwrap();
        assert!(!condition.satisfied());
        assert!(condition.changed().same_event(&property.changed()));
    }

    #[test]
    fn standard_property_is_not_a_condition() {
        let (property, _) = counting_property(Value::Int(0));
        assert!(property.as_condition().is_none());
    }

    // ── Validator slot ──────────────────────────────────────────────

    #[test]
    fn validator_round_trip() {
        use crate::validator::RequiredValidator;
        let (property, _) = counting_property(Value::Null);
        assert!(property.validator().is_none());
        property
            .set_validator(Some(Rc::new(RequiredValidator)))
            .unwrap();
        assert!(property.validator().is_some());
        property.set_validator(None).unwrap();
        assert!(property.validator().is_none());
    }

    // ── stored() convenience ────────────────────────────────────────

    #[test]
    fn stored_property_publishes_on_real_change_only() {
        let property = Property::stored(Value::Int(0));
        let fired = Rc::new(Cell::new(0u32));
        let f = Rc::clone(&fired);
        property.changed().attach(move |_| f.set(f.get() + 1));

        property.set(Value::Int(0)).unwrap();
        assert_eq!(fired.get(), 0);
        property.set(Value::Int(5)).unwrap();
        assert_eq!(fired.get(), 1);
        assert_eq!(property.get(), Value::Int(5));
    }
}
