//! Status icons for CLI output

use crate::domain::lifecycle::{ApplyOutcome, Outcome};

/// Status icons for different states
pub struct StatusIcon;

impl StatusIcon {
    /// Success icon (object created, updated or deleted)
    pub const SUCCESS: &'static str = "✓";

    /// Error icon (call failed)
    pub const ERROR: &'static str = "✗";

    /// Nothing to do
    pub const SKIPPED: &'static str = "-";

    /// Live object was replaced
    pub const REPLACED: &'static str = "↻";

    pub fn get_outcome_icon(outcome: &Outcome) -> &'static str {
        match outcome {
            Outcome::Created | Outcome::Updated | Outcome::Deleted => Self::SUCCESS,
            Outcome::AlreadyAbsent => Self::SKIPPED,
            Outcome::Failed(_) => Self::ERROR,
        }
    }

    pub fn get_apply_icon(outcome: &ApplyOutcome) -> &'static str {
        match outcome {
            ApplyOutcome::Created => Self::SUCCESS,
            ApplyOutcome::Replaced => Self::REPLACED,
            ApplyOutcome::Failed(_) => Self::ERROR,
        }
    }
}
