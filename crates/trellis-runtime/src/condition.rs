#![forbid(unsafe_code)]

//! Boolean-valued expressions and their composition.
//!
//! # Invariants
//!
//! 1. [`MutableCondition::set_satisfied`] publishes only on an actual
//!    transition.
//! 2. Composite conditions take their children at construction time; there
//!    is no dynamic add/remove, which keeps subscription bookkeeping to a
//!    fixed set detached exactly once, on drop.
//! 3. `AllCondition` over zero children is satisfied; `AnyCondition` over
//!    zero children is not.
//! 4. [`NegatedCondition`] shares its child's changed event identity — no
//!    extra publisher sits in between.

use std::cell::Cell;
use std::rc::Rc;

use trellis_core::{Event, EventPublisher};

use crate::expression::Expression;
use crate::value::Value;

/// A boolean-valued [`Expression`].
pub trait Condition: Expression {
    fn satisfied(&self) -> bool;
}

// ---------------------------------------------------------------------------
// MutableCondition
// ---------------------------------------------------------------------------

/// A condition holding an explicit boolean, settable by the application.
#[derive(Clone, Default)]
pub struct MutableCondition {
    inner: Rc<MutableInner>,
}

#[derive(Default)]
struct MutableInner {
    satisfied: Cell<bool>,
    changed: EventPublisher<()>,
}

impl MutableCondition {
    /// A new condition, initially unsatisfied.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(satisfied: bool) -> Self {
        let condition = Self::new();
        condition.inner.satisfied.set(satisfied);
        condition
    }

    /// Set the flag; publishes the changed event only on transition.
    pub fn set_satisfied(&self, satisfied: bool) {
        if satisfied == self.inner.satisfied.get() {
            return;
        }
        self.inner.satisfied.set(satisfied);
        self.inner.changed.raise();
    }
}

impl Expression for MutableCondition {
    fn value(&self) -> Value {
        Value::Bool(self.satisfied())
    }

    fn changed(&self) -> Event<()> {
        self.inner.changed.event()
    }
}

impl Condition for MutableCondition {
    fn satisfied(&self) -> bool {
        self.inner.satisfied.get()
    }
}

// ---------------------------------------------------------------------------
// DelegateCondition
// ---------------------------------------------------------------------------

/// A condition computed by a pure closure, with an externally supplied
/// changed event. The delegate holds no state of its own.
pub struct DelegateCondition {
    satisfied: Box<dyn Fn() -> bool>,
    changed: Event<()>,
}

impl DelegateCondition {
    pub fn new(satisfied: impl Fn() -> bool + 'static, changed: Event<()>) -> Self {
        Self {
            satisfied: Box::new(satisfied),
            changed,
        }
    }
}

impl Expression for DelegateCondition {
    fn value(&self) -> Value {
        Value::Bool(self.satisfied())
    }

    fn changed(&self) -> Event<()> {
        self.changed.clone()
    }
}

impl Condition for DelegateCondition {
    fn satisfied(&self) -> bool {
        (self.satisfied)()
    }
}

// ---------------------------------------------------------------------------
// Composite conditions
// ---------------------------------------------------------------------------

struct CompositeShared {
    children: Vec<Rc<dyn Condition>>,
    handles: Vec<trellis_core::EventHandle>,
    changed: EventPublisher<()>,
}

impl CompositeShared {
    fn new(children: Vec<Rc<dyn Condition>>) -> Rc<Self> {
        let changed = EventPublisher::new();
        let handles = children
            .iter()
            .map(|child| {
                let publisher = changed.clone();
                child.changed().attach(move |_| publisher.raise())
            })
            .collect();
        Rc::new(Self {
            children,
            handles,
            changed,
        })
    }

    /// Short-circuit fold shared by All (all = true) and Any (all = false).
    fn fold(&self, all: bool) -> bool {
        for child in &self.children {
            if child.satisfied() != all {
                return !all;
            }
        }
        all
    }
}

impl Drop for CompositeShared {
    fn drop(&mut self) {
        for (child, handle) in self.children.iter().zip(&self.handles) {
            child.changed().detach(*handle);
        }
    }
}

/// Satisfied iff every child is satisfied (vacuously true for no children).
#[derive(Clone)]
pub struct AllCondition {
    shared: Rc<CompositeShared>,
}

impl AllCondition {
    #[must_use]
    pub fn new(children: Vec<Rc<dyn Condition>>) -> Self {
        Self {
            shared: CompositeShared::new(children),
        }
    }
}

impl Expression for AllCondition {
    fn value(&self) -> Value {
        Value::Bool(self.satisfied())
    }

    fn changed(&self) -> Event<()> {
        self.shared.changed.event()
    }
}

impl Condition for AllCondition {
    fn satisfied(&self) -> bool {
        self.shared.fold(true)
    }
}

/// Satisfied iff at least one child is satisfied (false for no children).
#[derive(Clone)]
pub struct AnyCondition {
    shared: Rc<CompositeShared>,
}

impl AnyCondition {
    #[must_use]
    pub fn new(children: Vec<Rc<dyn Condition>>) -> Self {
        Self {
            shared: CompositeShared::new(children),
        }
    }
}

impl Expression for AnyCondition {
    fn value(&self) -> Value {
        Value::Bool(self.satisfied())
    }

    fn changed(&self) -> Event<()> {
        self.shared.changed.event()
    }
}

impl Condition for AnyCondition {
    fn satisfied(&self) -> bool {
        self.shared.fold(false)
    }
}

// ---------------------------------------------------------------------------
// NegatedCondition
// ---------------------------------------------------------------------------

/// Logical NOT of another condition, forwarding its changed event as-is.
#[derive(Clone)]
pub struct NegatedCondition {
    other: Rc<dyn Condition>,
}

impl NegatedCondition {
    #[must_use]
    pub fn new(other: Rc<dyn Condition>) -> Self {
        Self { other }
    }
}

impl Expression for NegatedCondition {
    fn value(&self) -> Value {
        Value::Bool(self.satisfied())
    }

    fn changed(&self) -> Event<()> {
        self.other.changed()
    }
}

impl Condition for NegatedCondition {
    fn satisfied(&self) -> bool {
        !self.other.satisfied()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn cond(satisfied: bool) -> Rc<dyn Condition> {
        Rc::new(MutableCondition::with(satisfied))
    }

    #[test]
    fn mutable_publishes_only_on_transition() {
        let condition = MutableCondition::new();
        let fired = Rc::new(Cell::new(0u32));
        let f = Rc::clone(&fired);
        condition.changed().attach(move |_| f.set(f.get() + 1));

        condition.set_satisfied(false);
        assert_eq!(fired.get(), 0, "no-op set must not publish");
        condition.set_satisfied(true);
        assert_eq!(fired.get(), 1);
        condition.set_satisfied(true);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn delegate_has_no_state() {
        let flag = Rc::new(Cell::new(false));
        let publisher = EventPublisher::<()>::new();
        let f = Rc::clone(&flag);
        let delegate = DelegateCondition::new(move || f.get(), publisher.event());

        assert!(!delegate.satisfied());
        flag.set(true);
        assert!(delegate.satisfied());
    }

    #[test]
    fn all_condition_semantics() {
        assert!(AllCondition::new(vec![]).satisfied());
        assert!(AllCondition::new(vec![cond(true), cond(true)]).satisfied());
        assert!(!AllCondition::new(vec![cond(true), cond(false)]).satisfied());
    }

    #[test]
    fn any_condition_semantics() {
        assert!(!AnyCondition::new(vec![]).satisfied());
        assert!(AnyCondition::new(vec![cond(false), cond(true)]).satisfied());
        assert!(!AnyCondition::new(vec![cond(false), cond(false)]).satisfied());
    }

    #[test]
    fn composite_republishes_child_changes() {
        let child = MutableCondition::new();
        let all = AllCondition::new(vec![Rc::new(child.clone())]);

        let fired = Rc::new(Cell::new(0u32));
        let f = Rc::clone(&fired);
        all.changed().attach(move |_| f.set(f.get() + 1));

        child.set_satisfied(true);
        assert_eq!(fired.get(), 1);
        assert!(all.satisfied());
    }

    #[test]
    fn composite_drop_detaches_child_subscriptions() {
        let child = MutableCondition::new();
        {
            let _all = AllCondition::new(vec![Rc::new(child.clone()) as Rc<dyn Condition>]);
            assert_eq!(child.changed().handler_count(), 1);
        }
        assert_eq!(
            child.changed().handler_count(),
            0,
            "dropping the composite must detach from the child"
        );
    }

    #[test]
    fn negated_inverts_and_shares_event_identity() {
        let child = MutableCondition::with(true);
        let negated = NegatedCondition::new(Rc::new(child.clone()));

        assert!(!negated.satisfied());
        child.set_satisfied(false);
        assert!(negated.satisfied());
        assert!(
            negated.changed().same_event(&child.changed()),
            "negation must forward the child's changed event, not wrap it"
        );
    }

    #[test]
    fn nested_composites_propagate() {
        let a = MutableCondition::new();
        let b = MutableCondition::with(true);
        let any = AnyCondition::new(vec![Rc::new(a.clone()), Rc::new(b.clone())]);
        let negated = NegatedCondition::new(Rc::new(any.clone()));

        assert!(any.satisfied());
        assert!(!negated.satisfied());

        let fired = Rc::new(Cell::new(0u32));
        let f = Rc::clone(&fired);
        negated.changed().attach(move |_| f.set(f.get() + 1));

        b.set_satisfied(false);
        assert_eq!(fired.get(), 1);
        assert!(negated.satisfied());
    }
}
