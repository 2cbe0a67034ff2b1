#![forbid(unsafe_code)]

//! Slotted multicast events.
//!
//! An [`Event`] is an ordered collection of optional callback slots. The
//! write side lives on [`EventPublisher`]; the read side (`attach`/`detach`)
//! is the [`Event`] handle itself, which widgets hand out to subscribers.
//!
//! # Invariants
//!
//! 1. Detaching a handle tombstones its slot; it never shifts the indices of
//!    other handles.
//! 2. Attach reuses the first empty slot before appending, so handle values
//!    are not monotonically increasing and must not be retained after detach.
//! 3. Publication visits the slots that existed when it started, in slot
//!    order, skipping empty ones. Handlers may attach or detach mid-publish;
//!    a handler appended mid-publish is not invoked in the same pass.
//! 4. Cloning an [`Event`] clones the handle, not the handler list; all
//!    clones observe the same slots.
//!
//! # Failure Modes
//!
//! - Detach with a stale or out-of-range handle: no-op.
//! - Handler panics: propagates to the publisher's caller (no catch).
//! - [`FallibleEvent`] handler error: publication stops and the error is
//!   returned; later slots do not run.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Index of an attached handler within an event's slot list.
///
/// Valid until the matching [`Event::detach`]; the slot may then be reused
/// by a later attach.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventHandle(usize);

impl EventHandle {
    /// Raw slot index, mainly useful in tests and diagnostics.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

type Slots<F> = Rc<RefCell<Vec<Option<Rc<F>>>>>;

fn attach_slot<F: ?Sized>(slots: &Slots<F>, handler: Rc<F>) -> EventHandle {
    let mut slots = slots.borrow_mut();
    for (i, slot) in slots.iter_mut().enumerate() {
        if slot.is_none() {
            *slot = Some(handler);
            return EventHandle(i);
        }
    }
    slots.push(Some(handler));
    EventHandle(slots.len() - 1)
}

fn detach_slot<F: ?Sized>(slots: &Slots<F>, handle: EventHandle) {
    let mut slots = slots.borrow_mut();
    if let Some(slot) = slots.get_mut(handle.0) {
        *slot = None;
    }
}

// ---------------------------------------------------------------------------
// Event<T>
// ---------------------------------------------------------------------------

/// The subscription side of a multicast event with payload `T`.
pub struct Event<T> {
    slots: Slots<dyn Fn(&T)>,
}

impl<T> Clone for Event<T> {
    fn clone(&self) -> Self {
        Self {
            slots: Rc::clone(&self.slots),
        }
    }
}

impl<T> Default for Event<T> {
    fn default() -> Self {
        Self {
            slots: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<T> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("slots", &self.slots.borrow().len())
            .finish()
    }
}

impl<T> Event<T> {
    /// Create a detached event with no publisher. Useful when the write side
    /// is driven through a clone held elsewhere.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a handler, reusing the first tombstoned slot if any.
    pub fn attach(&self, handler: impl Fn(&T) + 'static) -> EventHandle {
        attach_slot(&self.slots, Rc::new(handler) as Rc<dyn Fn(&T)>)
    }

    /// Tombstone the slot behind `handle`. Stale handles are ignored.
    pub fn detach(&self, handle: EventHandle) {
        detach_slot(&self.slots, handle);
    }

    /// Whether two handles refer to the same underlying slot list.
    #[must_use]
    pub fn same_event(&self, other: &Event<T>) -> bool {
        Rc::ptr_eq(&self.slots, &other.slots)
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.slots.borrow().iter().filter(|s| s.is_some()).count()
    }

    fn fan_out(&self, payload: &T) {
        // Snapshot the length so handlers appended mid-publish are skipped;
        // each slot is re-read so mid-publish detaches take effect.
        let len = self.slots.borrow().len();
        for i in 0..len {
            let handler = self.slots.borrow().get(i).and_then(Clone::clone);
            if let Some(handler) = handler {
                handler(payload);
            }
        }
    }
}

/// The write side of an [`Event`].
pub struct EventPublisher<T> {
    event: Event<T>,
}

impl<T> Default for EventPublisher<T> {
    fn default() -> Self {
        Self {
            event: Event::default(),
        }
    }
}

impl<T> Clone for EventPublisher<T> {
    fn clone(&self) -> Self {
        Self {
            event: self.event.clone(),
        }
    }
}

impl<T> fmt::Debug for EventPublisher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPublisher")
            .field("slots", &self.event.slots.borrow().len())
            .finish()
    }
}

impl<T> EventPublisher<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The subscription handle for this publisher.
    #[must_use]
    pub fn event(&self) -> Event<T> {
        self.event.clone()
    }

    /// Invoke every occupied slot in order with `payload`.
    pub fn publish(&self, payload: &T) {
        self.event.fan_out(payload);
    }
}

impl EventPublisher<()> {
    /// Publish the unit payload; shorthand for "changed"-style events.
    pub fn raise(&self) {
        self.publish(&());
    }
}

// ---------------------------------------------------------------------------
// FallibleEvent<T, E>
// ---------------------------------------------------------------------------

/// A multicast event whose handlers may fail; publication stops at the first
/// error and returns it to the publisher's caller.
pub struct FallibleEvent<T, E> {
    slots: Slots<dyn Fn(&T) -> Result<(), E>>,
}

impl<T, E> Clone for FallibleEvent<T, E> {
    fn clone(&self) -> Self {
        Self {
            slots: Rc::clone(&self.slots),
        }
    }
}

impl<T, E> Default for FallibleEvent<T, E> {
    fn default() -> Self {
        Self {
            slots: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<T, E> fmt::Debug for FallibleEvent<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallibleEvent")
            .field("slots", &self.slots.borrow().len())
            .finish()
    }
}

impl<T, E> FallibleEvent<T, E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, handler: impl Fn(&T) -> Result<(), E> + 'static) -> EventHandle {
        attach_slot(
            &self.slots,
            Rc::new(handler) as Rc<dyn Fn(&T) -> Result<(), E>>,
        )
    }

    pub fn detach(&self, handle: EventHandle) {
        detach_slot(&self.slots, handle);
    }

    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.slots.borrow().iter().filter(|s| s.is_some()).count()
    }
}

/// The write side of a [`FallibleEvent`].
pub struct FallibleEventPublisher<T, E> {
    event: FallibleEvent<T, E>,
}

impl<T, E> Default for FallibleEventPublisher<T, E> {
    fn default() -> Self {
        Self {
            event: FallibleEvent::default(),
        }
    }
}

impl<T, E> Clone for FallibleEventPublisher<T, E> {
    fn clone(&self) -> Self {
        Self {
            event: self.event.clone(),
        }
    }
}

impl<T, E> FallibleEventPublisher<T, E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn event(&self) -> FallibleEvent<T, E> {
        self.event.clone()
    }

    /// Invoke handlers in slot order; the first error aborts the fan-out.
    pub fn publish(&self, payload: &T) -> Result<(), E> {
        let len = self.event.slots.borrow().len();
        for i in 0..len {
            let handler = self.event.slots.borrow().get(i).and_then(Clone::clone);
            if let Some(handler) = handler {
                handler(payload)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Cancel out-parameter
// ---------------------------------------------------------------------------

/// Shared boolean out-parameter for cancelable notifications: any handler may
/// set it, the publisher reads it back after the fan-out.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Rc<Cell<bool>>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.0.get()
    }
}

/// No payload beyond the flag itself.
pub type CancelEvent = Event<CancelFlag>;
pub type CancelEventPublisher = EventPublisher<CancelFlag>;

pub type IntEvent = Event<i64>;
pub type IntEventPublisher = EventPublisher<i64>;

pub type StringEvent = Event<String>;
pub type StringEventPublisher = EventPublisher<String>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
