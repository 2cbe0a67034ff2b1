#![forbid(unsafe_code)]

//! Error taxonomy for the binding core.
//!
//! Configuration mistakes (read-only mutation, source cycles, bad binding
//! paths) are returned synchronously from the mutating call and leave the
//! target's prior state intact. Validation failures are *not* errors — they
//! are data aggregated into the binder's `can_submit` flag; only a submit
//! attempted while validation fails comes back as [`BindError::ValidationFailed`].

use std::fmt;

/// Errors produced by property and binder configuration and by submit.
#[derive(Debug, Clone, PartialEq)]
pub enum BindError {
    /// Mutation attempted on a property without a setter.
    ReadOnly,
    /// Validator assigned to a property that cannot be validated.
    NotValidatable,
    /// Installing the source would make a property its own (transitive)
    /// source.
    SourceCycle,
    /// The source kind is not supported by this property variant.
    InvalidSource(&'static str),
    /// A value of the wrong shape reached a typed setter or coercion.
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },
    /// A dotted binding path did not resolve to a field or accessor.
    FieldResolution { path: String },
    /// A value outside the permitted range reached a range-gated setter.
    OutOfRange,
    /// Submit attempted while at least one bound property fails validation.
    ValidationFailed,
    /// A bound property currently yields an error value.
    ErrorValue(String),
    /// A range was configured with `max < min`.
    InvalidRange,
    /// A validator pattern failed to compile.
    #[cfg(feature = "regex-validator")]
    InvalidPattern(String),
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "read-only property"),
            Self::NotValidatable => write!(f, "property not validatable"),
            Self::SourceCycle => write!(f, "source cycle"),
            Self::InvalidSource(kind) => write!(f, "invalid source kind: {kind}"),
            Self::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {expected}, got {got}")
            }
            Self::FieldResolution { path } => {
                write!(f, "binding path '{path}' does not resolve")
            }
            Self::OutOfRange => write!(f, "value out of range"),
            Self::ValidationFailed => write!(f, "validation failed"),
            Self::ErrorValue(message) => write!(f, "property error: {message}"),
            Self::InvalidRange => write!(f, "max < min"),
            #[cfg(feature = "regex-validator")]
            Self::InvalidPattern(message) => write!(f, "invalid pattern: {message}"),
        }
    }
}

impl std::error::Error for BindError {}
