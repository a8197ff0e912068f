use std::path::PathBuf;

use chrono::NaiveDateTime;
use thiserror::Error;

pub type Result<T, E = TrckrError> = std::result::Result<T, E>;

/// Every failure the library can report. Nothing in the core swallows these, the binaries
/// decide how to show them.
#[derive(Debug, Error)]
pub enum TrckrError {
    #[error("can't parse {token:?} as a {expected}")]
    Parse {
        token: String,
        expected: &'static str,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no timer is running")]
    NoActiveTimer,

    #[error("interval stops at {stop} before it starts at {start}")]
    InvertedInterval {
        start: NaiveDateTime,
        stop: NaiveDateTime,
    },

    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document {path:?}: {source}")]
    Document {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("command not found: {0}")]
    CommandNotFound(String),
}

impl TrckrError {
    pub fn parse(token: impl Into<String>, expected: &'static str) -> Self {
        Self::Parse {
            token: token.into(),
            expected,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("template {template:?} references undefined variable {name}")]
    UndefinedVariable { template: String, name: String },

    #[error("template {template:?} references {name}, which has no value here")]
    UnsetVariable { template: String, name: String },

    #[error("malformed template {template:?}: {reason}")]
    MalformedTemplate {
        template: String,
        reason: &'static str,
    },

    #[error("variable {name} is provided by more than one extension (second: {extension})")]
    VariableCollision {
        name: String,
        extension: &'static str,
    },

    #[error("field {field} must be {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },

    #[error("config doesn't match the expected layout: {0}")]
    Schema(#[source] serde_json::Error),

    #[error("unsupported database {kind:?} with data type {data_type:?}")]
    UnsupportedDatabase { kind: String, data_type: String },

    #[error("config {0:?} is locked")]
    Locked(PathBuf),

    #[error("malformed property path {0:?}")]
    MalformedProperty(String),

    #[error("property {property:?} can't be set, {segment:?} already holds a value")]
    NotAMapping { property: String, segment: String },
}
