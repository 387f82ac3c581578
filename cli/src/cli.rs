//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser, Subcommand};

use crate::application::MultiConn;
use crate::commands;
use crate::infra::config::load_from_env;
use crate::infra::store::JsonHandleStore;
use crate::output::OutputContext;

/// Discover and drive every running Archicad instance
#[derive(Parser)]
#[command(
    name = "multiconn",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Host the Archicad endpoints listen on, e.g. http://127.0.0.1
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Scan for running instances and show them
    List,

    /// Connect instances
    Connect(commands::PortArgs),

    /// Quit instances
    Quit(commands::quit::QuitArgs),

    /// Save the running instances to a file
    Save(commands::save::SaveArgs),

    /// Reopen saved projects that are not running
    Open(commands::open::OpenArgs),

    /// Open another project in a running instance
    Switch(commands::switch::SwitchArgs),

    /// Send a command to one or all instances
    Run(commands::run::RunArgs),

    /// Show version
    Version,
}

impl Cli {
    /// Default tracing filter for the requested verbosity.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            json,
            quiet,
            no_color,
            host,
            command,
            ..
        } = self;
        let ctx = OutputContext::new(no_color, quiet);

        if matches!(command, Command::Version) {
            return commands::version::run(&ctx, json);
        }

        let mut config = load_from_env()?;
        if let Some(host) = host {
            config.host = host;
        }
        let mut conn = MultiConn::with_defaults(config)?;

        match command {
            Command::List => commands::list::run(&ctx, &mut conn, json).await,
            Command::Connect(args) => commands::connect::run(&ctx, &mut conn, &args, json).await,
            Command::Quit(args) => commands::quit::run(&ctx, &mut conn, &args, json).await,
            Command::Save(args) => {
                let store = open_store(args.output.clone())?;
                commands::save::run(&ctx, &mut conn, &store, json).await
            }
            Command::Open(args) => {
                let store = open_store(args.from.clone())?;
                commands::open::run(&ctx, &mut conn, &store, &args, json).await
            }
            Command::Switch(args) => commands::switch::run(&ctx, &mut conn, &args, json).await,
            Command::Run(args) => commands::run::run(&ctx, &mut conn, &args, json).await,
            Command::Version => commands::version::run(&ctx, json),
        }
    }
}

fn open_store(path: Option<std::path::PathBuf>) -> Result<JsonHandleStore> {
    match path {
        Some(path) => Ok(JsonHandleStore::with_path(path)),
        None => JsonHandleStore::new(),
    }
}
