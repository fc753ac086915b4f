//! Error types for the fsim manager
//!
//! Provides error handling for:
//! - Command-line parsing and runtime overrides
//! - Config file loading (missing files, YAML syntax)
//! - Config validation (shape, lookups, value formats)
//! - Task dispatch and handler failures

use std::path::PathBuf;

/// Coarse classification of a [`ManagerError`]
///
/// Tests assert on the kind rather than on a concrete variant so that the
/// contract stays stable when variants are split or renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed command line
    Usage,
    /// Manager environment not set up
    Environment,
    /// A referenced file does not exist
    FileNotFound,
    /// Any other filesystem failure
    Io,
    /// YAML could not be parsed
    Syntax,
    /// A config node has the wrong shape
    Type,
    /// A key or enumerated name could not be resolved
    Lookup,
    /// A scalar has the right type but an invalid format
    Value,
    /// The task handler itself failed
    Task,
}

/// Errors found while validating a parsed config document
///
/// `path` is the dotted location of the offending node inside its document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Key lookup on a null node
    #[error("{path}: '{found}' object is not subscriptable")]
    NotSubscriptable { path: String, found: &'static str },

    /// Iteration over a null node
    #[error("{path}: '{found}' object is not iterable")]
    NotIterable { path: String, found: &'static str },

    /// Node exists but has the wrong YAML type
    #[error("{path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Required key is absent
    #[error("{path}: missing required key '{key}'")]
    MissingKey { path: String, key: String },

    /// Name does not resolve in the table it refers to
    #[error("{path}: unknown {what} '{name}'")]
    UnknownValue {
        path: String,
        what: &'static str,
        name: String,
    },

    /// Scalar failed a format check
    #[error("{path}: invalid value '{value}': {reason}")]
    InvalidValue {
        path: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    /// Create unknown-name error
    pub fn unknown(path: impl Into<String>, what: &'static str, name: impl Into<String>) -> Self {
        Self::UnknownValue {
            path: path.into(),
            what,
            name: name.into(),
        }
    }

    /// Create invalid-value error
    pub fn invalid(
        path: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            path: path.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotSubscriptable { .. } | Self::NotIterable { .. } | Self::TypeMismatch { .. } => {
                ErrorKind::Type
            }
            Self::MissingKey { .. } | Self::UnknownValue { .. } => ErrorKind::Lookup,
            Self::InvalidValue { .. } => ErrorKind::Value,
        }
    }
}

/// Main manager error type
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// Command line rejected by the parser
    #[error("usage error: {0}")]
    Usage(String),

    /// `FSIM_SOURCED` marker missing from the execution context
    #[error("the manager environment is not set up; source the environment script first")]
    NotSourced,

    /// No handler registered for a task name
    #[error("unknown task: '{0}'")]
    UnknownTask(String),

    /// Config or workload file does not exist
    #[error("no such file: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// IO error while reading or writing a file
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML syntax error
    #[error("yaml error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Config parsed but failed validation
    #[error("invalid config {}: {source}", file.display())]
    Config {
        file: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// `-x` override not of the form `SECTION KEY VALUE`
    #[error("invalid runtime override '{0}': expected \"SECTION KEY VALUE\"")]
    InvalidOverride(String),

    /// `managerinit` would overwrite an existing config
    #[error("refusing to overwrite existing config {}", path.display())]
    AlreadyInitialized { path: PathBuf },

    /// Task handler failed
    #[error("task '{task}' failed: {message}")]
    Task { task: String, message: String },
}

impl ManagerError {
    /// Create IO error for path, mapping `NotFound` to [`ManagerError::FileNotFound`]
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// Create config validation error for a file
    pub fn config(file: impl Into<PathBuf>, source: ConfigError) -> Self {
        Self::Config {
            file: file.into(),
            source,
        }
    }

    /// Create task failure
    pub fn task(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Task {
            task: task.into(),
            message: message.into(),
        }
    }

    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Usage(_) | Self::InvalidOverride(_) => ErrorKind::Usage,
            Self::NotSourced => ErrorKind::Environment,
            Self::UnknownTask(_) => ErrorKind::Lookup,
            Self::FileNotFound { .. } => ErrorKind::FileNotFound,
            Self::Io { .. } | Self::AlreadyInitialized { .. } => ErrorKind::Io,
            Self::Yaml { .. } => ErrorKind::Syntax,
            Self::Config { source, .. } => source.kind(),
            Self::Task { .. } => ErrorKind::Task,
        }
    }
}

impl From<clap::Error> for ManagerError {
    fn from(err: clap::Error) -> Self {
        Self::Usage(err.to_string())
    }
}

/// Result type alias for manager operations
pub type ManagerResult<T> = Result<T, ManagerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_subscriptable_display() {
        let err = ConfigError::NotSubscriptable {
            path: "ec2-build-farm.args".to_string(),
            found: "null",
        };
        assert_eq!(
            err.to_string(),
            "ec2-build-farm.args: 'null' object is not subscriptable"
        );
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn not_found_io_error_becomes_file_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ManagerError::io_error("/tmp/GHOST_FILE", io);
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert!(err.to_string().contains("GHOST_FILE"));
    }

    #[test]
    fn other_io_error_stays_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err = ManagerError::io_error("/etc/shadow", io);
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn config_error_kind_propagates() {
        let err = ManagerError::config(
            "config_build_farm.yaml",
            ConfigError::unknown("testing-build-farm.build-farm-type", "build farm type", "BOGUS"),
        );
        assert_eq!(err.kind(), ErrorKind::Lookup);
        assert!(err.to_string().contains("BOGUS"));
    }
}
