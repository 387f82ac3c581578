//! Command implementations

pub mod connect;
pub mod list;
pub mod open;
pub mod quit;
pub mod run;
pub mod save;
pub mod switch;
pub mod version;

use clap::Args;
use multiconn_common::Port;

/// Target selection shared by commands acting on some or all instances.
#[derive(Args, Debug, Default, Clone)]
pub struct PortArgs {
    /// Instance port (repeatable); all instances when omitted
    #[arg(long = "port", value_name = "PORT")]
    pub ports: Vec<Port>,
}
