#![forbid(unsafe_code)]

//! The declarative core of Trellis: expressions, conditions, properties,
//! validators and the data binder that wires widget properties to record
//! fields.
//!
//! # Architecture
//!
//! Properties and conditions are cheap shared handles over `Rc`/`RefCell`
//! state, publishing changes through the slotted events of `trellis-core`.
//! A property may chain to a *source* — another property, an expression, or
//! (for boolean properties) a condition — pulling the source's value now and
//! on every future change. The [`DataBinder`](binder::DataBinder) collects
//! every property whose source is a string tag and drives
//! load/validate/submit against a [`Record`](record::Record) data source.
//!
//! # Invariants
//!
//! 1. Setting a property to its current value is a no-op — no change event,
//!    no validator run. The boolean property variant is the one documented
//!    exception and always re-asserts.
//! 2. A property can never (transitively) become its own source; the cycle
//!    is rejected before any state changes.
//! 3. Validation failures are data routed to an error presenter, never hard
//!    errors; only submitting against a failing validator returns an error.
//! 4. Everything is single-threaded and reentrant: no locks, no blocking,
//!    handler-list mutation during publication is tolerated.

pub mod binder;
pub mod condition;
pub mod error;
pub mod expression;
pub mod format;
pub mod property;
pub mod record;
pub mod validator;
pub mod value;

pub use binder::{BoundControl, ControlId, DataBinder, ErrorPresenter, SharedRecord};
pub use condition::{
    AllCondition, AnyCondition, Condition, DelegateCondition, MutableCondition, NegatedCondition,
};
pub use error::BindError;
pub use expression::Expression;
pub use format::NumberFormat;
pub use property::{Property, PropertyKey, Source};
pub use record::{MapRecord, Record};
pub use validator::{RangeValidator, RequiredValidator, ValidationError, Validator};
pub use value::Value;

#[cfg(feature = "regex-validator")]
pub use validator::PatternValidator;
