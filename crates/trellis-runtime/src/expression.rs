#![forbid(unsafe_code)]

//! The expression contract: a current value plus a changed event.

use trellis_core::Event;

use crate::value::Value;

/// Anything with a readable value and a notification for when it changes.
///
/// Properties, conditions and binder path expressions all implement this;
/// it is the currency of source chaining.
pub trait Expression {
    /// The current value.
    fn value(&self) -> Value;

    /// The event fired after the value changes. Clones of the returned
    /// handle all observe the same slot list.
    fn changed(&self) -> Event<()>;
}
