#![forbid(unsafe_code)]

//! Error presenters: UI-facing recipients of per-control validation results.
//!
//! The binder hands each failing property's error (or the all-clear `None`)
//! to a presenter together with the hosting control's id; presenting is
//! display-only and never affects control flow.

use ahash::AHashMap;

use trellis_runtime::{ControlId, ErrorPresenter, ValidationError};

/// Remembers the latest presentation per control. Useful both as a test
/// double and as a model for list-style error panes.
#[derive(Debug, Default)]
pub struct CollectingErrorPresenter {
    latest: AHashMap<ControlId, Option<ValidationError>>,
}

impl CollectingErrorPresenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent presentation for `control`: `None` if never
    /// presented, `Some(None)` if cleared, `Some(Some(_))` if failing.
    #[must_use]
    pub fn latest_for(&self, control: ControlId) -> Option<&Option<ValidationError>> {
        self.latest.get(&control)
    }

    /// Whether no control currently shows an error.
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.latest.values().all(Option::is_none)
    }

    /// Controls currently showing an error.
    #[must_use]
    pub fn failing_controls(&self) -> Vec<ControlId> {
        self.latest
            .iter()
            .filter(|(_, error)| error.is_some())
            .map(|(control, _)| *control)
            .collect()
    }
}

impl ErrorPresenter for CollectingErrorPresenter {
    fn present(&mut self, error: Option<&ValidationError>, control: ControlId) {
        self.latest.insert(control, error.cloned());
    }
}

/// Routes presentations into the tracing log.
#[cfg(feature = "tracing")]
#[derive(Debug, Default)]
pub struct LogErrorPresenter;

#[cfg(feature = "tracing")]
impl ErrorPresenter for LogErrorPresenter {
    fn present(&mut self, error: Option<&ValidationError>, control: ControlId) {
        match error {
            Some(error) => tracing::warn!(control = control.raw(), %error, "validation failed"),
            None => tracing::debug!(control = control.raw(), "validation cleared"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembers_latest_presentation() {
        let mut presenter = CollectingErrorPresenter::new();
        let control = ControlId::from_raw(5);

        presenter.present(Some(&ValidationError::new("T", "M")), control);
        assert!(!presenter.is_clear());
        assert_eq!(presenter.failing_controls(), vec![control]);

        presenter.present(None, control);
        assert!(presenter.is_clear());
        assert_eq!(
            presenter.latest_for(control),
            Some(&None),
            "cleared is remembered as an explicit None"
        );
    }

    #[test]
    fn unknown_control_has_no_entry() {
        let presenter = CollectingErrorPresenter::new();
        assert!(presenter.latest_for(ControlId::from_raw(1)).is_none());
        assert!(presenter.is_clear());
    }
}
