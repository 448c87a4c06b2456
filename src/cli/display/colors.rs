//! Color theme for CLI output

use crate::domain::lifecycle::{ApplyOutcome, Outcome};
use comfy_table::Color as TableColor;

/// Color theme for terminal output
#[derive(Debug, Clone)]
pub struct ColorTheme {
    pub success: TableColor,
    pub warning: TableColor,
    pub error: TableColor,
    pub info: TableColor,
    pub muted: TableColor,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            success: TableColor::Green,
            warning: TableColor::Yellow,
            error: TableColor::Red,
            info: TableColor::Cyan,
            muted: TableColor::DarkGrey,
        }
    }
}

impl ColorTheme {
    /// Color for a PullRequest reconcile outcome
    pub fn get_outcome_color(&self, outcome: &Outcome) -> TableColor {
        match outcome {
            Outcome::Created | Outcome::Updated | Outcome::Deleted => self.success,
            Outcome::AlreadyAbsent => self.muted,
            Outcome::Failed(_) => self.error,
        }
    }

    pub fn get_apply_color(&self, outcome: &ApplyOutcome) -> TableColor {
        match outcome {
            ApplyOutcome::Created => self.success,
            ApplyOutcome::Replaced => self.info,
            ApplyOutcome::Failed(_) => self.error,
        }
    }

    /// Color for a count of open review environments
    pub fn get_count_color(&self, count: usize) -> TableColor {
        if count == 0 {
            self.muted
        } else {
            self.info
        }
    }
}

/// Convert comfy_table::Color to colored::Color string representation
pub fn table_color_to_colored_str(color: TableColor) -> &'static str {
    match color {
        TableColor::Green => "green",
        TableColor::Yellow => "yellow",
        TableColor::Red => "red",
        TableColor::Cyan => "cyan",
        TableColor::DarkGrey => "bright black",
        _ => "white",
    }
}
