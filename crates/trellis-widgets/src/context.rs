#![forbid(unsafe_code)]

//! Application-root context owning the action and shortcut registries.
//!
//! One `UiContext` per UI root; actions created through it are registered by
//! id and (optionally) shortcut for as long as any strong handle to them
//! lives. Keeping these tables on a context object instead of process-wide
//! statics lets independent roots coexist and tests run in isolation.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use ahash::AHashMap;

use crate::action::{Action, ActionCore, Shortcut};

pub(crate) struct ContextInner {
    next_action_id: Cell<u16>,
    actions: RefCell<AHashMap<u16, Weak<ActionCore>>>,
    shortcuts: RefCell<AHashMap<Shortcut, u16>>,
}

/// Owner of the per-root action-id and shortcut tables.
#[derive(Clone)]
pub struct UiContext {
    pub(crate) inner: Rc<ContextInner>,
}

impl Default for UiContext {
    fn default() -> Self {
        Self::new()
    }
}

impl UiContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ContextInner {
                // Ids 1 and 2 stay reserved for the host's default and
                // cancel commands.
                next_action_id: Cell::new(3),
                actions: RefCell::new(AHashMap::new()),
                shortcuts: RefCell::new(AHashMap::new()),
            }),
        }
    }

    /// Create a new action registered with this context.
    #[must_use]
    pub fn action(&self) -> Action {
        Action::new_in(self)
    }

    /// The action registered under `id`, if it is still alive.
    #[must_use]
    pub fn action_by_id(&self, id: u16) -> Option<Action> {
        self.inner
            .actions
            .borrow()
            .get(&id)
            .and_then(Weak::upgrade)
            .map(Action::from_core)
    }

    /// The action currently holding `shortcut`.
    #[must_use]
    pub fn action_for_shortcut(&self, shortcut: Shortcut) -> Option<Action> {
        let id = *self.inner.shortcuts.borrow().get(&shortcut)?;
        self.action_by_id(id)
    }

    /// Number of live registered actions.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.inner
            .actions
            .borrow()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub(crate) fn allocate_action_id(&self) -> u16 {
        let id = self.inner.next_action_id.get();
        self.inner.next_action_id.set(id + 1);
        id
    }

    pub(crate) fn register_action(&self, id: u16, core: &Rc<ActionCore>) {
        self.inner.actions.borrow_mut().insert(id, Rc::downgrade(core));
    }
}

impl ContextInner {
    pub(crate) fn unregister_action(&self, id: u16) {
        self.actions.borrow_mut().remove(&id);
        self.shortcuts.borrow_mut().retain(|_, owner| *owner != id);
    }

    pub(crate) fn register_shortcut(&self, shortcut: Shortcut, id: u16) {
        self.shortcuts.borrow_mut().insert(shortcut, id);
    }

    pub(crate) fn unregister_shortcut(&self, shortcut: Shortcut) {
        self.shortcuts.borrow_mut().remove(&shortcut);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contexts_are_isolated() {
        let first = UiContext::new();
        let second = UiContext::new();

        let action = first.action();
        assert_eq!(first.action_count(), 1);
        assert_eq!(second.action_count(), 0);
        drop(action);
        assert_eq!(first.action_count(), 0);
    }

    #[test]
    fn ids_start_past_the_reserved_block() {
        let context = UiContext::new();
        let action = context.action();
        assert!(action.id() >= 3);
    }

    #[test]
    fn dropping_the_last_handle_unregisters() {
        let context = UiContext::new();
        let action = context.action();
        let id = action.id();
        assert!(context.action_by_id(id).is_some());

        let clone = action.clone();
        drop(action);
        assert!(context.action_by_id(id).is_some(), "clone keeps it alive");

        drop(clone);
        assert!(context.action_by_id(id).is_none());
    }
}
