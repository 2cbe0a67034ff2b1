#![forbid(unsafe_code)]

//! Core primitives for Trellis: the slotted event registry and the input
//! vocabulary consumed by the widget layer.
//!
//! Everything in this crate is single-threaded. Events are shared handles
//! over `Rc`/`RefCell` state; delivering work from another thread is the
//! embedder's responsibility and must happen before any call lands here.

pub mod event;
pub mod input;

pub use event::{
    CancelEvent, CancelEventPublisher, CancelFlag, Event, EventHandle, EventPublisher,
    FallibleEvent, FallibleEventPublisher, IntEvent, IntEventPublisher, StringEvent,
    StringEventPublisher,
};
pub use input::{Key, KeyEvent, KeyEventPublisher, KeyInput, Modifiers, MouseButton, MouseEvent,
    MouseEventPublisher, MouseInput};
