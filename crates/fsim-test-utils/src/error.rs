//! Fixture errors

use std::path::PathBuf;

/// Errors raised while preparing test fixtures
///
/// These indicate a broken test setup, never a manager failure.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// Sample file name does not follow the `sample_*` convention
    #[error("sample fixture '{name}' does not start with 'sample_'")]
    NamingConvention { name: String },

    /// Reading a sample or writing a materialized file failed
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sample or replacement text is not valid YAML
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An argument cannot be represented in a shell command line
    #[error("cannot shell-quote argument: {0}")]
    ShellQuote(#[from] shlex::QuoteError),

    /// Nested edit walked into something other than a mapping
    #[error("{path}: not a mapping")]
    NotAMapping { path: String },
}

impl FixtureError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
