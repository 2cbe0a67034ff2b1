#![forbid(unsafe_code)]

//! Pluggable per-property validators.
//!
//! Validators are invoked by the data binder's validation pass, never by
//! `Property::set`. A `Some(ValidationError)` result means "this property
//! currently fails validation": the binder folds the results into its single
//! `can_submit` flag and routes each error (or the all-clear `None`) to the
//! error presenter. Nothing here raises a hard error.

use std::fmt;

use std::cell::Cell;

use crate::error::BindError;
use crate::format::format_float_grouped;
use crate::value::Value;

/// A titled, user-presentable validation failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    title: String,
    message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Per-property validation hook.
pub trait Validator {
    /// `None` means the value passes.
    fn validate(&self, value: &Value) -> Option<ValidationError>;
}

// ---------------------------------------------------------------------------
// RangeValidator
// ---------------------------------------------------------------------------

/// Accepts numeric values within an inclusive `[min, max]` range.
pub struct RangeValidator {
    min: Cell<f64>,
    max: Cell<f64>,
}

impl RangeValidator {
    pub fn new(min: f64, max: f64) -> Result<Self, BindError> {
        if max < min {
            return Err(BindError::InvalidRange);
        }
        Ok(Self {
            min: Cell::new(min),
            max: Cell::new(max),
        })
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.min.get()
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.max.get()
    }

    /// Replace both bounds at once.
    pub fn reset(&self, min: f64, max: f64) -> Result<(), BindError> {
        if max < min {
            return Err(BindError::InvalidRange);
        }
        self.min.set(min);
        self.max.set(max);
        Ok(())
    }

    fn out_of_range(&self) -> ValidationError {
        let (min, max) = (self.min.get(), self.max.get());
        let message = if min.fract() == 0.0 && max.fract() == 0.0 {
            format!("Please enter a number from {min:.0} to {max:.0}.")
        } else {
            format!(
                "Please enter a number from {} to {}.",
                format_float_grouped(min, 2),
                format_float_grouped(max, 2)
            )
        };
        ValidationError::new("Number out of allowed range", message)
    }
}

impl Validator for RangeValidator {
    fn validate(&self, value: &Value) -> Option<ValidationError> {
        let Ok(number) = value.coerce_float() else {
            return Some(ValidationError::new(
                "Number expected",
                "Please enter a number.",
            ));
        };
        if number < self.min.get() || number > self.max.get() {
            return Some(self.out_of_range());
        }
        None
    }
}

// ---------------------------------------------------------------------------
// RequiredValidator
// ---------------------------------------------------------------------------

/// Rejects the null value; controls that report "no selection" as `Null`
/// use this to force a choice.
pub struct RequiredValidator;

impl Validator for RequiredValidator {
    fn validate(&self, value: &Value) -> Option<ValidationError> {
        if value.is_null() {
            return Some(ValidationError::new(
                "Selection Required",
                "Please select one of the provided options.",
            ));
        }
        None
    }
}

// ---------------------------------------------------------------------------
// PatternValidator
// ---------------------------------------------------------------------------

/// Accepts strings matching a regular expression.
#[cfg(feature = "regex-validator")]
pub struct PatternValidator {
    re: regex::Regex,
}

#[cfg(feature = "regex-validator")]
impl PatternValidator {
    pub fn new(pattern: &str) -> Result<Self, BindError> {
        let re = regex::Regex::new(pattern)
            .map_err(|err| BindError::InvalidPattern(err.to_string()))?;
        Ok(Self { re })
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        self.re.as_str()
    }
}

#[cfg(feature = "regex-validator")]
impl Validator for PatternValidator {
    fn validate(&self, value: &Value) -> Option<ValidationError> {
        let Some(text) = value.as_str() else {
            return Some(ValidationError::new("Text expected", "Please enter text."));
        };
        if !self.re.is_match(text) {
            return Some(ValidationError::new(
                "Invalid text",
                "The text does not match the required pattern.",
            ));
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
