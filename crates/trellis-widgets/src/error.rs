#![forbid(unsafe_code)]

//! Errors raised by control and action configuration.

use std::fmt;

use trellis_runtime::BindError;

/// Widget-layer configuration errors.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetError {
    /// A value outside the control's permitted range.
    OutOfRange,
    /// A range was configured with `min > max`.
    InvalidRange,
    /// Decimals outside the supported `0..=8`.
    InvalidDecimals,
    /// An explicit flag write while the flag is driven by a condition.
    ConditionDriven(&'static str),
    /// A changed handler vetoed the mutation; the old value was restored.
    Vetoed(String),
    /// An underlying binding error.
    Bind(BindError),
}

impl fmt::Display for WidgetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "value out of range"),
            Self::InvalidRange => write!(f, "invalid range"),
            Self::InvalidDecimals => write!(f, "decimals must be >= 0 and <= 8"),
            Self::ConditionDriven(flag) => {
                write!(f, "{flag} is condition-driven; clear the condition first")
            }
            Self::Vetoed(reason) => write!(f, "change vetoed: {reason}"),
            Self::Bind(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for WidgetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bind(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BindError> for WidgetError {
    fn from(err: BindError) -> Self {
        Self::Bind(err)
    }
}
