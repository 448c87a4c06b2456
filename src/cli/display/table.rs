//! Table rendering for CLI output

use super::colors::table_color_to_colored_str;
use super::{ColorTheme, StatusIcon};
use crate::domain::lifecycle::{ApplyOutcome, DispatchReport, MaterializeReport};
use chrono::{DateTime, Utc};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};

/// ReviewApp information for list display
#[derive(Debug, Clone)]
pub struct ReviewAppInfo {
    pub name: String,
    pub namespace: String,
    pub repository_url: String,
    pub resources: usize,
    pub pull_requests: usize,
    pub created: Option<DateTime<Utc>>,
}

/// PullRequest information for list display
#[derive(Debug, Clone)]
pub struct PullRequestInfo {
    pub name: String,
    pub namespace: String,
    pub review_app: String,
    pub pr_number: String,
    pub head_commit_ref: String,
    pub created: Option<DateTime<Utc>>,
}

/// Age in the style of `kubectl get`: `45s`, `12m`, `5h`, `3d`.
pub fn format_age(created: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(created) = created else {
        return "<unknown>".to_string();
    };
    let seconds = (now - created).num_seconds().max(0);
    match seconds {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86400 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86400),
    }
}

fn short_ref(head_commit_ref: &str) -> &str {
    head_commit_ref.get(..7).unwrap_or(head_commit_ref)
}

/// Table renderer for formatted output
pub struct TableRenderer {
    theme: ColorTheme,
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TableRenderer {
    /// Create a new table renderer with default theme
    pub fn new() -> Self {
        Self {
            theme: ColorTheme::default(),
        }
    }

    fn table(headers: Vec<Cell>) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(headers);
        table
    }

    fn title(&self, title: &str, count: usize, unit: &str) -> String {
        let color = table_color_to_colored_str(self.theme.get_count_color(count));
        format!(
            "╭─ {} {} ─╮\n",
            title,
            format!("[{} {}]", count, unit).color(color)
        )
    }

    /// Render ReviewApps as a formatted table
    pub fn render_review_apps(&self, apps: &[ReviewAppInfo], now: DateTime<Utc>) -> String {
        if apps.is_empty() {
            return "No ReviewApps found".to_string();
        }

        let mut table = Self::table(vec![
            Cell::new("NAME").set_alignment(CellAlignment::Left),
            Cell::new("NAMESPACE").set_alignment(CellAlignment::Left),
            Cell::new("REPOSITORY").set_alignment(CellAlignment::Left),
            Cell::new("RESOURCES").set_alignment(CellAlignment::Center),
            Cell::new("PULL REQUESTS").set_alignment(CellAlignment::Center),
            Cell::new("AGE").set_alignment(CellAlignment::Right),
        ]);

        for app in apps {
            table.add_row(vec![
                Cell::new(&app.name),
                Cell::new(&app.namespace),
                Cell::new(&app.repository_url),
                Cell::new(app.resources).set_alignment(CellAlignment::Center),
                Cell::new(app.pull_requests)
                    .set_alignment(CellAlignment::Center)
                    .fg(self.theme.get_count_color(app.pull_requests)),
                Cell::new(format_age(app.created, now)).set_alignment(CellAlignment::Right),
            ]);
        }

        let mut output = self.title("ReviewApps", apps.len(), "apps");
        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    /// Render PullRequest records as a formatted table
    pub fn render_pull_requests(
        &self,
        pull_requests: &[PullRequestInfo],
        now: DateTime<Utc>,
    ) -> String {
        if pull_requests.is_empty() {
            return "No PullRequests found".to_string();
        }

        let mut table = Self::table(vec![
            Cell::new("NAME").set_alignment(CellAlignment::Left),
            Cell::new("NAMESPACE").set_alignment(CellAlignment::Left),
            Cell::new("REVIEW APP").set_alignment(CellAlignment::Left),
            Cell::new("PR").set_alignment(CellAlignment::Center),
            Cell::new("HEAD").set_alignment(CellAlignment::Left),
            Cell::new("AGE").set_alignment(CellAlignment::Right),
        ]);

        for pr in pull_requests {
            table.add_row(vec![
                Cell::new(&pr.name),
                Cell::new(&pr.namespace),
                Cell::new(&pr.review_app),
                Cell::new(format!("#{}", pr.pr_number)).set_alignment(CellAlignment::Center),
                Cell::new(short_ref(&pr.head_commit_ref)).fg(self.theme.info),
                Cell::new(format_age(pr.created, now)).set_alignment(CellAlignment::Right),
            ]);
        }

        let mut output = self.title("PullRequests", pull_requests.len(), "open");
        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    /// Render per-ReviewApp outcomes of one dispatched event
    pub fn render_dispatch_report(&self, report: &DispatchReport) -> String {
        let Some(action) = report.action else {
            return "Event ignored: no ReviewApp handles it".to_string();
        };

        let mut table = Self::table(vec![
            Cell::new("REVIEW APP").set_alignment(CellAlignment::Left),
            Cell::new("NAMESPACE").set_alignment(CellAlignment::Left),
            Cell::new("PULL REQUEST").set_alignment(CellAlignment::Left),
            Cell::new("RESULT").set_alignment(CellAlignment::Left),
        ]);

        for entry in &report.outcomes {
            table.add_row(vec![
                Cell::new(&entry.review_app),
                Cell::new(&entry.namespace),
                Cell::new(&entry.pull_request),
                Cell::new(format!(
                    "{} {}",
                    StatusIcon::get_outcome_icon(&entry.outcome),
                    entry.outcome
                ))
                .fg(self.theme.get_outcome_color(&entry.outcome)),
            ]);
        }

        let mut output = self.title(&format!("Event '{}'", action), report.outcomes.len(), "apps");
        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    /// Render the resources applied for one PullRequest
    pub fn render_materialize_report(&self, report: &MaterializeReport) -> String {
        let heading = format!("{}/{}", report.namespace, report.pull_request);
        if let Some(error) = &report.error {
            return format!("{} {}: {}", StatusIcon::ERROR.red(), heading, error);
        }

        let mut table = Self::table(vec![
            Cell::new("RESOURCE").set_alignment(CellAlignment::Left),
            Cell::new("RESULT").set_alignment(CellAlignment::Left),
        ]);

        for resource in &report.resources {
            let target = resource
                .target
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "<unaddressable>".to_string());
            let result = match &resource.outcome {
                ApplyOutcome::Created => "created".to_string(),
                ApplyOutcome::Replaced => "replaced".to_string(),
                ApplyOutcome::Failed(e) => format!("failed: {}", e),
            };
            table.add_row(vec![
                Cell::new(target),
                Cell::new(format!("{} {}", StatusIcon::get_apply_icon(&resource.outcome), result))
                    .fg(self.theme.get_apply_color(&resource.outcome)),
            ]);
        }

        let mut output = self.title(&heading, report.resources.len(), "resources");
        output.push_str(&table.to_string());
        output.push('\n');
        output
    }
}
