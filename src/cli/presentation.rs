//! CLI presentation: text and json formatters per command.

use crate::build::{BuildSummary, UnitStatus};
use crate::consistency::ConsistencyReport;
use crate::error::BuildError;
use comfy_table::Table;
use owo_colors::OwoColorize;

pub fn format_build_summary(summary: &BuildSummary) -> String {
    let mut lines = vec![format!(
        "{} {} regenerated, {} up to date, {} file(s) cleaned",
        "Build:".bold(),
        summary.regenerated.len(),
        summary.up_to_date.len(),
        summary.cleaned
    )];
    for unit in &summary.regenerated {
        lines.push(format!("  {} {}", "regenerated".green(), unit));
    }
    for input in &summary.removed_inputs {
        lines.push(format!("  {} {}", "removed".yellow(), input.display()));
    }
    if let Some(pool) = &summary.pool {
        lines.push(format!(
            "Contexts: {} created, {} reused, {} live",
            pool.created, pool.reused, pool.live
        ));
    }
    if let Some(report) = &summary.consistency {
        lines.push(format_consistency_report(report));
    }
    lines.join("\n")
}

pub fn format_consistency_report(report: &ConsistencyReport) -> String {
    if report.is_consistent() && report.warnings.is_empty() {
        return format!("{}", "Consistency: ok".green());
    }
    let mut lines = vec![format!(
        "{} {} violation(s), {} warning(s)",
        "Consistency:".bold(),
        report.violations.len(),
        report.warnings.len()
    )];
    for violation in &report.violations {
        lines.push(format!("  {} {}", "error".red(), violation));
    }
    for warning in &report.warnings {
        lines.push(format!("  {} {}", "warning".yellow(), warning));
    }
    lines.join("\n")
}

pub fn format_status_text(statuses: &[UnitStatus]) -> String {
    if statuses.is_empty() {
        return "No generation units.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Unit", "State", "Generated", "Reason"]);
    for status in statuses {
        let state = if status.up_to_date { "up to date" } else { "stale" };
        table.add_row(vec![
            status.unit.clone(),
            state.to_string(),
            status.generated_files.to_string(),
            status.reason.clone(),
        ]);
    }
    table.to_string()
}

pub fn format_status_json(statuses: &[UnitStatus]) -> Result<String, BuildError> {
    serde_json::to_string_pretty(statuses).map_err(|e| BuildError::ConfigError(e.to_string()))
}
