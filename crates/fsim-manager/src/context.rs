//! Execution context
//!
//! Ambient settings the entry point needs besides the parsed command line.
//! The binary builds one from the process environment; tests build a fresh
//! one per case so nothing process-wide is mutated.

use std::path::{Path, PathBuf};

/// Environment variable set by the environment script
pub const SOURCED_VAR: &str = "FSIM_SOURCED";
/// Overrides the directory relative config paths resolve against
pub const CONFIG_DIR_VAR: &str = "FSIM_CONFIG_DIR";
/// Overrides the directory workload descriptions are read from
pub const WORKLOADS_DIR_VAR: &str = "FSIM_WORKLOADS_DIR";

/// Settings for one manager invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Whether the environment script has been sourced
    pub sourced: bool,
    /// Base directory for relative config paths
    pub config_dir: PathBuf,
    /// Directory holding workload description files
    pub workloads_dir: PathBuf,
}

impl ExecutionContext {
    /// Create a sourced context rooted at `config_dir`
    ///
    /// Workloads live in `config_dir/workloads`.
    #[must_use]
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        let workloads_dir = config_dir.join("workloads");
        Self {
            sourced: true,
            config_dir,
            workloads_dir,
        }
    }

    /// Set the sourced marker
    #[inline]
    #[must_use]
    pub fn with_sourced(mut self, sourced: bool) -> Self {
        self.sourced = sourced;
        self
    }

    /// Set the workloads directory
    #[inline]
    #[must_use]
    pub fn with_workloads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workloads_dir = dir.into();
        self
    }

    /// Build from the process environment
    ///
    /// # Errors
    /// Returns error if the current directory cannot be determined
    pub fn from_env() -> std::io::Result<Self> {
        let cwd = std::env::current_dir()?;
        Ok(Self::from_lookup(&cwd, |key| std::env::var(key).ok()))
    }

    /// Build from an arbitrary variable lookup, defaulting directories to `cwd`
    pub fn from_lookup(cwd: &Path, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let sourced = lookup(SOURCED_VAR).is_some_and(|v| !v.is_empty() && v != "0");
        let config_dir = lookup(CONFIG_DIR_VAR).map_or_else(|| cwd.to_path_buf(), PathBuf::from);
        let workloads_dir = lookup(WORKLOADS_DIR_VAR)
            .map_or_else(|| config_dir.join("workloads"), PathBuf::from);
        Self {
            sourced,
            config_dir,
            workloads_dir,
        }
    }

    /// Resolve a command-line config path against `config_dir`
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.config_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn unsourced_without_marker() {
        let ctx = ExecutionContext::from_lookup(Path::new("/work"), lookup(&[]));
        assert!(!ctx.sourced);
        assert_eq!(ctx.config_dir, PathBuf::from("/work"));
        assert_eq!(ctx.workloads_dir, PathBuf::from("/work/workloads"));
    }

    #[test]
    fn zero_marker_is_not_sourced() {
        let ctx = ExecutionContext::from_lookup(Path::new("/work"), lookup(&[(SOURCED_VAR, "0")]));
        assert!(!ctx.sourced);
    }

    #[test]
    fn directories_from_variables() {
        let ctx = ExecutionContext::from_lookup(
            Path::new("/work"),
            lookup(&[
                (SOURCED_VAR, "1"),
                (CONFIG_DIR_VAR, "/cfg"),
                (WORKLOADS_DIR_VAR, "/wl"),
            ]),
        );
        assert!(ctx.sourced);
        assert_eq!(ctx.config_dir, PathBuf::from("/cfg"));
        assert_eq!(ctx.workloads_dir, PathBuf::from("/wl"));
    }

    #[test]
    fn builder_setters() {
        let ctx = ExecutionContext::new("/cfg").with_sourced(false).with_workloads_dir("/wl");
        assert!(!ctx.sourced);
        assert_eq!(ctx.config_dir, PathBuf::from("/cfg"));
        assert_eq!(ctx.workloads_dir, PathBuf::from("/wl"));
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let ctx = ExecutionContext::new("/cfg");
        assert_eq!(ctx.resolve(Path::new("config_build.yaml")), PathBuf::from("/cfg/config_build.yaml"));
        assert_eq!(ctx.resolve(Path::new("/tmp/GHOST_FILE")), PathBuf::from("/tmp/GHOST_FILE"));
    }
}
