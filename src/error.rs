//! Definitional and boundary errors.
//!
//! Validation failures are *not* in here: those are [`crate::report::Report`]
//! values returned from `call`. Everything below signals a broken definition
//! or a failure at an integration boundary.
use crate::report::Report;

/// A shape definition that cannot be built. Raised at build time, never retried.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("view `{0}` is not defined")]
    UnknownView(String),
    #[error("view `{0}` is declared more than once")]
    DuplicateView(String),
    #[error("`base` names the implicit default view and cannot be redefined")]
    ReservedView,
    #[error("a viewed output needs a `base` entry")]
    MissingBase,
    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),
    #[error("field `{0}` is not defined")]
    UnknownField(String),
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("unknown type `{0}`")]
    UnknownType(String),
}

/// Carrier for a failed `call_strict`: the report travels with the error.
#[derive(Debug, thiserror::Error)]
#[error("invalid value: {report}")]
pub struct Invalid {
    pub report: Report,
}

impl From<Report> for Invalid {
    fn from(report: Report) -> Self {
        Self { report }
    }
}

/// Failure of [`crate::input::Input::parse_into`].
#[derive(Debug, thiserror::Error)]
pub enum ParseIntoError {
    #[error(transparent)]
    Invalid(#[from] Invalid),
    #[error("at JSON path {path} → {source}")]
    Deserialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A schema that cannot be flattened into single-value parameters.
#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    #[error("schema of `{0}` is too complicated for a path parameter")]
    Path(String),
    #[error("schema of `{0}` is too complicated for a query parameter")]
    Query(String),
    #[error("parameters must come from an object schema")]
    NotAnObject,
}

/// Failure loading a type registry from disk.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {message}")]
    Json { path: String, message: String },
}
