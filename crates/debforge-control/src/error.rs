//! Error types for control metadata handling and build ordering
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ControlError>;

/// Whether an error was caused by user input or by a defect in debforge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A mistake in package configuration or usage that the user can fix
    Configuration,
    /// An internal invariant was violated
    Unexpected,
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("A source package with the name '{0}' has already been registered. No two source packages may share the same name.")]
    DuplicatePackage(String),

    #[error("Binary package '{0}' has not been added to the registry")]
    NotRegistered(String),

    #[error("Could not solve dependency graph, possible circular dependency between: {}", .0.join(", "))]
    CircularDependency(Vec<String>),

    #[error("New relation {new} conflicts with existing dependencies: {existing}")]
    ConflictingRelation { new: String, existing: String },

    #[error("Relation '{value}' is in an invalid format: {reason}")]
    InvalidRelation { value: String, reason: String },

    #[error("A paragraph defining a binary package with the name '{0}' already exists. It may be replaced by setting replace_if_exists.")]
    DuplicateBinary(String),

    #[error("The Source field and package directory must have the same name. {source_name} (from control file) != {directory} (from directory name).")]
    NameMismatch {
        source_name: String,
        directory: String,
    },

    #[error("Package '{0}' has no source paragraph in its control file")]
    MissingSourceParagraph(String),

    #[error("Package is missing a {kind} file at {path}")]
    MissingFile { kind: &'static str, path: PathBuf },

    #[error("Missing required field '{field}' in {context}")]
    MissingField { field: String, context: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("While parsing {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Version string '{value}' is in an invalid format: {reason}. Versions must follow the format: [optional epoch]:[upstream version]-[debian revision]")]
    InvalidVersion { value: String, reason: String },

    #[error("Unknown distribution: {0}")]
    UnknownDistribution(String),

    #[error("No data has been loaded, so the {0} cannot be determined")]
    NotLoaded(&'static str),

    #[error("I/O error at {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("{0}\n\nThis is likely a bug in debforge and not in your configuration. Please consider filing a bug report.")]
    Unexpected(String),
}

impl ControlError {
    /// Classify the error as user-facing configuration or internal defect
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unexpected(_) => ErrorKind::Unexpected,
            _ => ErrorKind::Configuration,
        }
    }

    pub fn is_unexpected(&self) -> bool {
        self.kind() == ErrorKind::Unexpected
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }

    /// Create a parse error for a file on disk
    pub fn parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_relation(value: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidRelation {
            value: value.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_version(value: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidVersion {
            value: value.into(),
            reason: reason.to_string(),
        }
    }

    pub fn missing_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
            context: context.into(),
        }
    }

    pub fn invalid_field(field: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.to_string(),
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
