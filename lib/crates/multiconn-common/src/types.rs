use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::location::{format_teamwork_location, parse_teamwork_location};

/// Reserved failure codes for errors that never reached Archicad.
///
/// HTTP status failures reuse the HTTP status code itself.
pub mod codes {
    pub const CONNECTION: i64 = -1;
    pub const TIMEOUT: i64 = -2;
    pub const MALFORMED: i64 = -3;
    pub const UNSUPPORTED: i64 = -4;
    pub const NOT_FETCHED: i64 = -5;
    pub const INVALID_STATE: i64 = -6;
}

// ── Failure record ────────────────────────────────────────────────────────────

/// A failed command: either Archicad's own `error` object or a transport
/// failure mapped onto the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("command failed ({code}): {message}")]
pub struct ApiError {
    pub code: i64,
    pub message: String,
}

impl ApiError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(codes::CONNECTION, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(codes::TIMEOUT, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(codes::MALFORMED, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(codes::UNSUPPORTED, message)
    }

    #[must_use]
    pub fn not_fetched() -> Self {
        Self::new(codes::NOT_FETCHED, "not fetched yet")
    }

    /// Build a record from an envelope's `error` object, tolerating missing fields.
    #[must_use]
    pub fn from_error_value(value: Option<&Value>) -> Self {
        let code = value
            .and_then(|v| v.get("code"))
            .and_then(Value::as_i64)
            .unwrap_or(codes::MALFORMED);
        let message = value
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("command failed without an error message");
        Self::new(code, message)
    }

    /// A handle was asked to do something its lifecycle state forbids.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_STATE, message)
    }
}

/// Result of any command: the decoded payload or a failure record.
pub type CommandResult<T> = Result<T, ApiError>;

// ── Identity errors ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("Could not recognize projectLocation format: ({0})")]
    UnrecognizedLocation(String),

    #[error("Missing password in teamwork credentials")]
    MissingPassword,

    #[error("Unexpected project info shape: {0}")]
    Malformed(String),
}

// ── Product info ──────────────────────────────────────────────────────────────

/// Version information reported by `API.GetProductInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub version: u32,
    pub build: u32,
    pub lang: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductInfoResult {
    version: u32,
    build_number: u32,
    language_code: String,
}

impl ProductInfo {
    /// Parse the `result` object of `API.GetProductInfo`.
    ///
    /// # Errors
    ///
    /// Returns a malformed-response record when fields are missing.
    pub fn from_result(result: &Value) -> CommandResult<Self> {
        let raw = ProductInfoResult::deserialize(result)
            .map_err(|e| ApiError::malformed(format!("product info: {e}")))?;
        Ok(Self {
            version: raw.version,
            build: raw.build_number,
            lang: raw.language_code,
        })
    }
}

// ── Teamwork credentials ──────────────────────────────────────────────────────

/// Teamwork login. The password is never written when serialized.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamworkCredentials {
    pub username: String,
    #[serde(default, serialize_with = "serialize_redacted")]
    pub password: Option<String>,
}

#[allow(clippy::ref_option, clippy::trivially_copy_pass_by_ref)]
fn serialize_redacted<S: serde::Serializer>(
    _: &Option<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_none()
}

impl TeamworkCredentials {
    pub fn new(username: impl Into<String>, password: Option<String>) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

impl fmt::Debug for TeamworkCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeamworkCredentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "******"))
            .finish()
    }
}

// ── Project identity ──────────────────────────────────────────────────────────

/// Which project an instance has open.
///
/// Serialized without a tag; the field set tells the variants apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArchicadId {
    #[serde(rename_all = "camelCase")]
    Teamwork {
        project_path: String,
        server_address: String,
        #[serde(rename = "teamworkCredentials")]
        credentials: TeamworkCredentials,
        project_name: String,
    },
    #[serde(rename_all = "camelCase")]
    Solo {
        project_path: String,
        project_name: String,
    },
    #[serde(rename_all = "camelCase")]
    Untitled { project_name: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectInfoResult {
    is_untitled: bool,
    #[serde(default)]
    is_teamwork: bool,
    project_path: Option<String>,
    project_name: Option<String>,
    project_location: Option<String>,
}

impl ArchicadId {
    #[must_use]
    pub fn untitled() -> Self {
        Self::Untitled {
            project_name: "Untitled".to_string(),
        }
    }

    /// Parse the `addOnCommandResponse` of `GetProjectInfo`.
    ///
    /// # Errors
    ///
    /// Returns an `IdentityError` when required fields are missing or the
    /// teamwork location cannot be decoded.
    pub fn from_project_info(response: &Value) -> Result<Self, IdentityError> {
        let info = ProjectInfoResult::deserialize(response)
            .map_err(|e| IdentityError::Malformed(e.to_string()))?;
        if info.is_untitled {
            return Ok(Self::untitled());
        }
        let project_name = info
            .project_name
            .ok_or_else(|| IdentityError::Malformed("missing projectName".to_string()))?;
        if info.is_teamwork {
            let location = info
                .project_location
                .ok_or_else(|| IdentityError::Malformed("missing projectLocation".to_string()))?;
            let parsed = parse_teamwork_location(&location)?;
            Ok(Self::Teamwork {
                project_path: parsed.project_path,
                server_address: parsed.server_address,
                credentials: TeamworkCredentials::new(parsed.username, Some(parsed.password)),
                project_name,
            })
        } else {
            let project_path = info
                .project_path
                .ok_or_else(|| IdentityError::Malformed("missing projectPath".to_string()))?;
            Ok(Self::Solo {
                project_path,
                project_name,
            })
        }
    }

    #[must_use]
    pub fn project_name(&self) -> &str {
        match self {
            Self::Untitled { project_name }
            | Self::Solo { project_name, .. }
            | Self::Teamwork { project_name, .. } => project_name,
        }
    }

    #[must_use]
    pub fn is_teamwork(&self) -> bool {
        matches!(self, Self::Teamwork { .. })
    }

    /// The argument Archicad needs to open this project.
    ///
    /// `credentials` overrides the stored teamwork login when given.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::MissingPassword` for a teamwork project
    /// without a usable password.
    pub fn project_location(
        &self,
        credentials: Option<&TeamworkCredentials>,
    ) -> Result<Option<String>, IdentityError> {
        match self {
            Self::Untitled { .. } => Ok(None),
            Self::Solo { project_path, .. } => Ok(Some(project_path.clone())),
            Self::Teamwork {
                project_path,
                server_address,
                credentials: stored,
                ..
            } => {
                let creds = credentials.unwrap_or(stored);
                let password = creds
                    .password
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .ok_or(IdentityError::MissingPassword)?;
                Ok(Some(format_teamwork_location(
                    &creds.username,
                    password,
                    server_address,
                    project_path,
                )))
            }
        }
    }
}

impl PartialEq for ArchicadId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Untitled { project_name: a }, Self::Untitled { project_name: b }) => a == b,
            (
                Self::Solo {
                    project_path: pa,
                    project_name: na,
                },
                Self::Solo {
                    project_path: pb,
                    project_name: nb,
                },
            ) => pa == pb && na == nb,
            (
                Self::Teamwork {
                    project_path: pa,
                    server_address: sa,
                    project_name: na,
                    ..
                },
                Self::Teamwork {
                    project_path: pb,
                    server_address: sb,
                    project_name: nb,
                    ..
                },
            ) => pa == pb && sa == sb && na == nb,
            _ => false,
        }
    }
}

impl Eq for ArchicadId {}

// ── Executable location ───────────────────────────────────────────────────────

/// Path of the Archicad executable serving an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchicadLocation {
    #[serde(rename = "archicadLocation")]
    pub archicad_location: String,
}

/// Suffix turning a macOS application bundle into its executable.
pub const MAC_EXECUTABLE_SUFFIX: &str = "/Contents/MacOS/ARCHICAD";

impl ArchicadLocation {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            archicad_location: path.into(),
        }
    }

    /// Parse the `addOnCommandResponse` of `GetArchicadLocation`.
    ///
    /// # Errors
    ///
    /// Returns a malformed-response record when the field is missing.
    pub fn from_result(response: &Value) -> CommandResult<Self> {
        Self::from_result_for(response, cfg!(target_os = "macos"))
    }

    /// Same as [`Self::from_result`] with the platform made explicit.
    ///
    /// # Errors
    ///
    /// Returns a malformed-response record when the field is missing.
    pub fn from_result_for(response: &Value, is_mac: bool) -> CommandResult<Self> {
        let location = response
            .get("archicadLocation")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::malformed("missing archicadLocation"))?;
        Ok(if is_mac {
            Self::new(format!("{location}{MAC_EXECUTABLE_SUFFIX}"))
        } else {
            Self::new(location)
        })
    }
}
