#![forbid(unsafe_code)]

//! Bindable control state for Trellis: the host-widget contract, actions
//! with condition-driven enablement, a few concrete controls (line input,
//! toggle, numeric editor) and a settings store.
//!
//! Nothing in this crate touches a native windowing system. Controls own
//! their *state* — flags, text buffers, selections, property registries —
//! and publish every externally relevant transition through events; painting
//! and input collection belong to the embedder.

pub mod action;
pub mod context;
pub mod control;
pub mod error;
pub mod line_input;
pub mod number_input;
pub mod presenter;
pub mod settings;
pub mod toggle;

pub use action::{Action, ActionList, Shortcut};
pub use context::UiContext;
pub use control::ControlBase;
pub use error::WidgetError;
pub use line_input::LineInput;
pub use number_input::NumberInput;
pub use presenter::CollectingErrorPresenter;
#[cfg(feature = "tracing")]
pub use presenter::LogErrorPresenter;
pub use settings::{MemorySettings, Settings, SettingsError};
#[cfg(feature = "state-persistence")]
pub use settings::FileSettings;
pub use toggle::ToggleBox;
