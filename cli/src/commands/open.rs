//! `multiconn open`: reopen saved projects that are not running.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use multiconn_common::{ArchicadId, Port, TeamworkCredentials};
use serde::Serialize;
use tracing::warn;

use crate::application::{HandleStore, InstanceHandle, MultiConn, Transport};
use crate::domain::ProjectError;
use crate::output::{OutputContext, json};

/// Arguments for the open command.
#[derive(Args, Debug, Default)]
pub struct OpenArgs {
    /// Saved handle file; defaults to the `save` location
    #[arg(long)]
    pub from: Option<PathBuf>,

    /// Start Archicad in demo mode
    #[arg(long)]
    pub demo: bool,

    /// Teamwork user name overriding the saved one
    #[arg(long)]
    pub username: Option<String>,

    /// Teamwork password; used with the saved user name unless --username is given
    #[arg(long, env = "MULTICONN_TEAMWORK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "camelCase")]
enum OpenOutcome {
    Opened { project: String, port: Port },
    Running { project: String, port: Port },
    Failed { project: String, reason: String },
}

/// Run `multiconn open [--from <FILE>] [--demo]`.
///
/// # Errors
///
/// Returns an error if the file is missing or unreadable, or if any project
/// failed to open.
pub async fn run<T: Transport>(
    ctx: &OutputContext,
    conn: &mut MultiConn<T>,
    store: &impl HandleStore,
    args: &OpenArgs,
    as_json: bool,
) -> Result<()> {
    let Some(session) = store.load_async().await? else {
        bail!("No saved instances found. Run: multiconn save");
    };
    conn.scan(Port::all()).await;

    let mut outcomes = Vec::with_capacity(session.handles.len());
    for value in session.handles {
        let header = match InstanceHandle::from_json(value, conn.transport.clone()) {
            Ok(header) => header,
            Err(e) => {
                warn!(error = %e, "skipping unreadable saved handle");
                continue;
            }
        };
        let credentials = header.archicad_id().as_ref().ok().and_then(|id| {
            login_for(id, args.username.as_deref(), args.password.as_deref())
        });
        outcomes.push(open_one(conn, &header, credentials.as_ref(), args.demo).await);
    }

    let failed = outcomes
        .iter()
        .filter(|o| matches!(o, OpenOutcome::Failed { .. }))
        .count();
    if as_json {
        json::print(&outcomes)?;
    } else {
        render(ctx, &outcomes);
    }
    if failed > 0 {
        bail!("{failed} project(s) failed to open");
    }
    Ok(())
}

async fn open_one<T: Transport>(
    conn: &mut MultiConn<T>,
    header: &InstanceHandle<T>,
    credentials: Option<&TeamworkCredentials>,
    demo: bool,
) -> OpenOutcome {
    let project = header
        .archicad_id()
        .as_ref()
        .map_or_else(|_| "(unknown)".to_string(), |id| id.project_name().to_string());
    let opened = match credentials {
        Some(credentials) => {
            conn.open_project()
                .with_teamwork_credentials(header, credentials, demo)
                .await
        }
        _ => conn.open_project().from_header(header, demo).await,
    };
    match opened {
        Ok(port) => OpenOutcome::Opened { project, port },
        Err(ProjectError::AlreadyOpen(port)) => OpenOutcome::Running { project, port },
        Err(e) => OpenOutcome::Failed {
            project,
            reason: e.to_string(),
        },
    }
}

/// Teamwork login for `id` from the command line, filling in whichever half
/// was not given from the saved credentials. `None` for non-teamwork
/// projects or when neither half was given.
fn login_for(
    id: &ArchicadId,
    username: Option<&str>,
    password: Option<&str>,
) -> Option<TeamworkCredentials> {
    let ArchicadId::Teamwork {
        credentials: saved, ..
    } = id
    else {
        return None;
    };
    if username.is_none() && password.is_none() {
        return None;
    }
    Some(TeamworkCredentials::new(
        username.map_or_else(|| saved.username.clone(), str::to_string),
        password.map(str::to_string).or_else(|| saved.password.clone()),
    ))
}

fn render(ctx: &OutputContext, outcomes: &[OpenOutcome]) {
    if outcomes.is_empty() {
        ctx.warn("The saved file lists no instances.");
    }
    for outcome in outcomes {
        match outcome {
            OpenOutcome::Opened { project, port } => {
                ctx.success(&format!("{project}: opened on port {port}"));
            }
            OpenOutcome::Running { project, port } => {
                ctx.info(&format!("{project}: already running on port {port}"));
            }
            OpenOutcome::Failed { project, reason } => {
                ctx.error(&format!("{project}: {reason}"));
            }
        }
    }
}
