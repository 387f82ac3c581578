//! Typed commands.
//!
//! A [`Command`] names an Archicad command together with its parameter and
//! result types. The full catalog lives outside this crate; only the commands
//! the orchestrator itself needs are defined here.

use multiconn_common::{
    ApiError, ArchicadId, ArchicadLocation, CommandResult, ProductInfo, TAPIR_NAMESPACE,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub trait Command {
    /// Command name as sent on the wire.
    const NAME: &'static str;
    /// `None` for native commands, the add-on namespace otherwise.
    const NAMESPACE: Option<&'static str> = None;
    /// Lowest Archicad major version that provides the command.
    const SINCE_VERSION: u32 = 0;

    type Params: Serialize + Sync;
    type Output: DeserializeOwned;

    /// Turn the raw result object into `Output`.
    fn decode(value: Value) -> CommandResult<Self::Output> {
        serde_json::from_value(value)
            .map_err(|e| ApiError::malformed(format!("{}: {e}", Self::NAME)))
    }
}

/// Serializes as `{}`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NoParams {}

/// `API.GetProductInfo`
pub struct GetProductInfo;

impl Command for GetProductInfo {
    const NAME: &'static str = "API.GetProductInfo";
    type Params = NoParams;
    type Output = ProductInfo;

    fn decode(value: Value) -> CommandResult<ProductInfo> {
        ProductInfo::from_result(&value)
    }
}

/// Tapir `GetProjectInfo`
pub struct GetProjectInfo;

impl Command for GetProjectInfo {
    const NAME: &'static str = "GetProjectInfo";
    const NAMESPACE: Option<&'static str> = Some(TAPIR_NAMESPACE);
    type Params = NoParams;
    type Output = ArchicadId;

    fn decode(value: Value) -> CommandResult<ArchicadId> {
        ArchicadId::from_project_info(&value).map_err(|e| ApiError::malformed(e.to_string()))
    }
}

/// Tapir `GetArchicadLocation`
pub struct GetArchicadLocation;

impl Command for GetArchicadLocation {
    const NAME: &'static str = "GetArchicadLocation";
    const NAMESPACE: Option<&'static str> = Some(TAPIR_NAMESPACE);
    type Params = NoParams;
    type Output = ArchicadLocation;

    fn decode(value: Value) -> CommandResult<ArchicadLocation> {
        ArchicadLocation::from_result(&value)
    }
}

/// Tapir `QuitArchicad`
pub struct QuitArchicad;

impl Command for QuitArchicad {
    const NAME: &'static str = "QuitArchicad";
    const NAMESPACE: Option<&'static str> = Some(TAPIR_NAMESPACE);
    type Params = NoParams;
    type Output = Value;
}

/// Parameters of Tapir `OpenProject`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub project_file_path: String,
}

/// Tapir `OpenProject`: replace the project open in a running instance.
pub struct OpenProjectFile;

impl Command for OpenProjectFile {
    const NAME: &'static str = "OpenProject";
    const NAMESPACE: Option<&'static str> = Some(TAPIR_NAMESPACE);
    type Params = ProjectFile;
    type Output = Value;
}
