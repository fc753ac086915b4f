//! Per-test environments and shared fixture locations

use std::path::{Path, PathBuf};

use fsim_manager::{ExecutionContext, TaskRegistry};
use tempfile::TempDir;

use crate::bundle::{BuildBundle, RunBundle};
use crate::harness::Invocation;

/// File name guaranteed not to exist in a fresh [`TestEnv`]
pub const GHOST_FILE: &str = "GHOST_FILE";

/// Workload the sample runtime config names
pub const DEFAULT_WORKLOAD: &str = "linux-uniform.json";

/// Directory holding the checked-in `sample_config_*.yaml` files
///
/// # Panics
/// Panics if the directory is missing
#[must_use]
pub fn sample_backup_configs() -> PathBuf {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../fsim-manager/sample-backup-configs");
    assert!(dir.is_dir(), "sample configs not found at {}", dir.display());
    dir
}

/// Temporary directory plus a fresh, sourced execution context rooted in it
///
/// The directory is removed when the environment is dropped.
#[derive(Debug)]
pub struct TestEnv {
    dir: TempDir,
    ctx: ExecutionContext,
}

impl TestEnv {
    /// Create environment with the default workload present
    ///
    /// # Panics
    /// Panics if the temporary directory cannot be set up
    #[must_use]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let ctx = ExecutionContext::new(dir.path());
        std::fs::create_dir_all(&ctx.workloads_dir).expect("create workloads dir");
        std::fs::write(ctx.workloads_dir.join(DEFAULT_WORKLOAD), "{}\n").expect("write workload");
        Self { dir, ctx }
    }

    /// Root of the temporary directory
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Sourced context rooted in [`path`](Self::path)
    #[inline]
    #[must_use]
    pub fn ctx(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Same context with the sourced marker cleared
    #[must_use]
    pub fn unsourced_ctx(&self) -> ExecutionContext {
        self.ctx.clone().with_sourced(false)
    }

    /// Build bundle materialized from the samples
    ///
    /// # Panics
    /// Panics if the samples cannot be materialized
    #[must_use]
    pub fn build_bundle(&self) -> BuildBundle {
        BuildBundle::from_samples(self.path(), &sample_backup_configs()).expect("materialize build bundle")
    }

    /// Run bundle materialized from the samples
    ///
    /// # Panics
    /// Panics if the samples cannot be materialized
    #[must_use]
    pub fn run_bundle(&self) -> RunBundle {
        RunBundle::from_samples(self.path(), &sample_backup_configs()).expect("materialize run bundle")
    }

    /// Path of [`GHOST_FILE`] in this environment, checked to be absent
    ///
    /// # Panics
    /// Panics if the file exists
    #[must_use]
    pub fn non_existent_file(&self) -> PathBuf {
        let file = self.path().join(GHOST_FILE);
        assert!(!file.exists(), "{} unexpectedly exists", file.display());
        file
    }

    /// Write the default `config_*.yaml` files the way a user would
    ///
    /// # Panics
    /// Panics if `managerinit` fails
    pub fn managerinit(&self) {
        Invocation::new("managerinit")
            .run(&self.ctx, &TaskRegistry::with_defaults())
            .expect("managerinit");
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_env_has_workload_and_no_ghost() {
        let env = TestEnv::new();
        assert!(env.ctx().workloads_dir.join(DEFAULT_WORKLOAD).is_file());
        assert!(env.non_existent_file().ends_with(GHOST_FILE));
        assert!(env.ctx().sourced);
        assert!(!env.unsourced_ctx().sourced);
    }

    #[test]
    fn managerinit_keeps_existing_workloads() {
        let env = TestEnv::new();
        env.managerinit();
        assert!(env.path().join("config_runtime.yaml").is_file());
        assert!(env.ctx().workloads_dir.join(DEFAULT_WORKLOAD).is_file());
    }
}
