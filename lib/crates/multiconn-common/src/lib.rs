pub mod envelope;
pub mod location;
pub mod port;
pub mod types;

pub use envelope::{ADD_ON_COMMAND, TAPIR_NAMESPACE};
pub use port::{PORT_MAX, PORT_MIN, Port, PortError};
pub use types::*;
