use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ReportError {
    SchemaMismatch(String),
    MissingAsset {
        name: String,
        path: PathBuf,
        reason: String,
    },
    IncompletePrincipleData {
        principle: String,
        checks: usize,
    },
    InvalidRecord(String),
    InvalidConfiguration(String),
    UnplaceableFlowable(String),
    Json(serde_json::Error),
    Io(std::io::Error),
}

impl ReportError {
    pub(crate) fn missing_asset(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        reason: impl fmt::Display,
    ) -> Self {
        ReportError::MissingAsset {
            name: name.into(),
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Stable machine-readable code, used by the CLI's JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            ReportError::SchemaMismatch(_) => "SCHEMA_MISMATCH",
            ReportError::MissingAsset { .. } => "MISSING_ASSET",
            ReportError::IncompletePrincipleData { .. } => "INCOMPLETE_PRINCIPLE_DATA",
            ReportError::InvalidRecord(_) => "INVALID_RECORD",
            ReportError::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            ReportError::UnplaceableFlowable(_) => "UNPLACEABLE_FLOWABLE",
            ReportError::Json(_) => "JSON_ERROR",
            ReportError::Io(_) => "IO_ERROR",
        }
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::SchemaMismatch(message) => write!(f, "schema mismatch: {}", message),
            ReportError::MissingAsset { name, path, reason } => {
                write!(
                    f,
                    "missing asset '{}' at {}: {}",
                    name,
                    path.display(),
                    reason
                )
            }
            ReportError::IncompletePrincipleData { principle, checks } => write!(
                f,
                "principle '{}' has no answered process checks ({} referenced)",
                principle, checks
            ),
            ReportError::InvalidRecord(message) => write!(f, "invalid record: {}", message),
            ReportError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            ReportError::UnplaceableFlowable(message) => {
                write!(f, "block cannot fit on any page: {}", message)
            }
            ReportError::Json(err) => write!(f, "json error: {}", err),
            ReportError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Json(err) => Some(err),
            ReportError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ReportError {
    fn from(value: std::io::Error) -> Self {
        ReportError::Io(value)
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(value: serde_json::Error) -> Self {
        ReportError::Json(value)
    }
}
