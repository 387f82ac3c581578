//! Human-readable terminal renderer.

use std::collections::BTreeMap;

use multiconn_common::{ApiError, ArchicadId, CommandResult, Port};
use owo_colors::OwoColorize as _;
use serde::Serialize;
use serde_json::Value;

use crate::application::{HandleOutcome, InstanceHandle, Transport};
use crate::domain::Status;
use crate::output::OutputContext;

/// One line of the instance table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceRow {
    pub port: Option<Port>,
    pub status: Status,
    pub primary: bool,
    pub version: Option<String>,
    pub project: Option<String>,
    pub kind: &'static str,
}

impl InstanceRow {
    #[must_use]
    pub fn from_handle<T: Transport>(handle: &InstanceHandle<T>, primary: Option<Port>) -> Self {
        let (project, kind) = match handle.archicad_id() {
            Ok(ArchicadId::Teamwork { project_name, .. }) => {
                (Some(project_name.clone()), "teamwork")
            }
            Ok(ArchicadId::Solo { project_name, .. }) => (Some(project_name.clone()), "solo"),
            Ok(ArchicadId::Untitled { .. }) => (None, "untitled"),
            Err(_) => (None, "unknown"),
        };
        Self {
            port: handle.port(),
            status: handle.status(),
            primary: primary.is_some() && handle.port() == primary,
            version: handle
                .product_info()
                .as_ref()
                .ok()
                .map(|p| format!("{} ({})", p.version, p.build)),
            project,
            kind,
        }
    }
}

/// Renders orchestrator state as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if self.ctx.quiet {
            return;
        }
        println!("multiconn {version}");
    }

    /// Render the instance table.
    pub fn render_instances(&self, rows: &[InstanceRow]) {
        if self.ctx.quiet {
            return;
        }
        if rows.is_empty() {
            println!("No running Archicad instances found.");
            return;
        }
        self.ctx.header("Archicad instances:");
        println!();
        for row in rows {
            let port = row.port.map_or_else(|| "-".to_string(), |p| p.to_string());
            let marker = if row.primary { "*" } else { " " };
            let status = format!("{:<10}", row.status.as_str());
            println!(
                "  {marker} {port:<6} {} {:<20} {} {}",
                status.style(self.ctx.styles.status(row.status)),
                row.version.as_deref().unwrap_or("?"),
                row.project.as_deref().unwrap_or("(no project)"),
                format!("[{}]", row.kind).style(self.ctx.styles.dim),
            );
        }
        println!();
        self.ctx.info("* marks the primary instance");
    }

    /// Render connect/disconnect outcomes.
    pub fn render_outcomes(&self, outcomes: &[HandleOutcome]) {
        if outcomes.is_empty() {
            self.ctx.warn("No matching instances.");
            return;
        }
        for outcome in outcomes {
            match &outcome.error {
                None => self
                    .ctx
                    .success(&format!("{}: {}", outcome.port, outcome.status)),
                Some(err) => self.ctx.warn(&format!(
                    "{}: {} ({})",
                    outcome.port, outcome.status, err
                )),
            }
        }
    }

    /// Render one command result per port.
    pub fn render_results(&self, results: &BTreeMap<Port, CommandResult<Value>>) {
        if results.is_empty() {
            self.ctx.warn("No active instances.");
            return;
        }
        for (port, result) in results {
            match result {
                Ok(value) => {
                    self.ctx.success(&format!("{port}"));
                    if !self.ctx.quiet {
                        let text = serde_json::to_string_pretty(value)
                            .unwrap_or_else(|_| value.to_string());
                        for line in text.lines() {
                            println!("      {line}");
                        }
                    }
                }
                Err(err) => self.render_api_error(*port, err),
            }
        }
    }

    fn render_api_error(&self, port: Port, err: &ApiError) {
        self.ctx.error(&format!("{port}: {err}"));
    }
}
