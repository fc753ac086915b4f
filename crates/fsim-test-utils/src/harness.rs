//! CLI invocation harness
//!
//! Builds manager command lines, runs them through the real parser and entry
//! point, and classifies the outcome.

use std::fmt::Display;

use fsim_manager::{cli, ErrorKind, ExecutionContext, ManagerArgs, ManagerError, ManagerResult, TaskRegistry};
use regex::Regex;

use crate::bundle::ConfigBundle;
use crate::error::FixtureError;

/// Command-line tokens for one manager run, task name first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    tokens: Vec<String>,
}

impl Invocation {
    /// Bare task with no flags
    #[must_use]
    pub fn new(task: &str) -> Self {
        Self {
            tokens: vec![task.to_string()],
        }
    }

    /// Task followed by a bundle's flags
    #[must_use]
    pub fn with_bundle(task: &str, bundle: &impl ConfigBundle) -> Self {
        let mut invocation = Self::new(task);
        invocation.tokens.extend(bundle.args());
        invocation
    }

    /// Point `flag` at `value`, replacing its current value if present
    #[must_use]
    pub fn with_flag(mut self, flag: &str, value: impl Display) -> Self {
        let value = value.to_string();
        match self.tokens.iter().position(|t| t == flag) {
            Some(i) if i + 1 < self.tokens.len() => self.tokens[i + 1] = value,
            Some(_) => self.tokens.push(value),
            None => self.tokens.extend([flag.to_string(), value]),
        }
        self
    }

    /// Append a raw token
    #[must_use]
    pub fn arg(mut self, token: impl Into<String>) -> Self {
        self.tokens.push(token.into());
        self
    }

    /// Tokens, task name first
    #[inline]
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Shell-quoted command line
    ///
    /// # Errors
    /// Returns error if a token cannot be quoted
    pub fn cmdline(&self) -> Result<String, FixtureError> {
        Ok(shlex::try_join(self.tokens.iter().map(String::as_str))?)
    }

    /// Parse the tokens with the manager's parser
    ///
    /// # Errors
    /// Returns the parser's usage error
    pub fn parse(&self) -> ManagerResult<ManagerArgs> {
        cli::parse_args(&self.tokens)
    }

    /// Parse and run
    ///
    /// # Errors
    /// Returns the first parse, validation, or handler error
    pub fn run(&self, ctx: &ExecutionContext, registry: &TaskRegistry) -> ManagerResult<()> {
        invoke(&self.parse()?, ctx, registry)
    }
}

/// Parse a shell command line with the manager's parser
///
/// # Errors
/// Returns a usage error on unbalanced quoting or rejected arguments
pub fn parse_cmdline(cmdline: &str) -> ManagerResult<ManagerArgs> {
    let tokens = shlex::split(cmdline)
        .ok_or_else(|| ManagerError::Usage(format!("cannot split command line: {cmdline}")))?;
    cli::parse_args(tokens)
}

/// Run the manager entry point on parsed arguments
///
/// # Errors
/// Returns the entry point's error
pub fn invoke(args: &ManagerArgs, ctx: &ExecutionContext, registry: &TaskRegistry) -> ManagerResult<()> {
    tracing::debug!(task = %args.task, "invoking manager");
    fsim_manager::main(args, ctx, registry)
}

/// Assert `result` failed with `kind` and, if given, a message matching `pattern`
///
/// Returns the error for further inspection.
///
/// # Panics
/// Panics if the result succeeded, failed with another kind, or the message
/// has no match for `pattern`
#[track_caller]
pub fn expect_failure<T: std::fmt::Debug>(
    result: ManagerResult<T>,
    kind: ErrorKind,
    pattern: Option<&str>,
) -> ManagerError {
    let err = match result {
        Ok(value) => panic!("expected {kind:?} failure, got success: {value:?}"),
        Err(err) => err,
    };
    assert_eq!(err.kind(), kind, "wrong error kind for: {err}");
    if let Some(pattern) = pattern {
        let re = Regex::new(pattern).unwrap_or_else(|e| panic!("bad pattern {pattern:?}: {e}"));
        let message = err.to_string();
        assert!(re.is_match(&message), "{message:?} does not match /{pattern}/");
    }
    err
}
