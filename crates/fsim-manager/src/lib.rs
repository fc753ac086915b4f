//! fsim manager
//!
//! Command-line and YAML configuration front end of an FPGA simulation
//! deployment manager. A manager run has three phases:
//! 1. **Parse**: the command line selects a task and the config files
//! 2. **Validate**: the files that task consumes are loaded and checked
//! 3. **Dispatch**: the task's handler receives the validated configs
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use fsim_manager::{cli, ExecutionContext, TaskRegistry};
//!
//! let args = cli::parse_args(["runcheck", "-c", "config_runtime.yaml"])?;
//! let ctx = ExecutionContext::from_env()?;
//! fsim_manager::main(&args, &ctx, &TaskRegistry::with_defaults())?;
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod registry;
pub mod tasks;

pub use cli::{construct_argparser, ManagerArgs, RuntimeOverride};
pub use config::{BuildConfig, RuntimeConfig};
pub use context::ExecutionContext;
pub use error::{ConfigError, ErrorKind, ManagerError, ManagerResult};
pub use registry::{TaskConfig, TaskFamily, TaskHandler, TaskInvocation, TaskRegistry};

use config::{BuildDocuments, RunDocuments};

/// Crate version reported by `--version`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run one manager invocation
///
/// Checks the environment, resolves the task's handler, loads and validates
/// the configs its family consumes, then runs the handler. Any failure before
/// dispatch leaves the handler uncalled.
///
/// # Errors
/// Returns the first environment, lookup, load, validation, or handler error
pub fn main(args: &ManagerArgs, ctx: &ExecutionContext, registry: &TaskRegistry) -> ManagerResult<()> {
    if !ctx.sourced {
        return Err(ManagerError::NotSourced);
    }

    let task = args.task.as_str();
    let handler = registry
        .handler(task)
        .ok_or_else(|| ManagerError::UnknownTask(task.to_string()))?;
    let family = TaskFamily::of(registry.resolve(task))
        .or_else(|| TaskFamily::of(task))
        .ok_or_else(|| ManagerError::UnknownTask(task.to_string()))?;
    tracing::info!(task, family = ?family, "starting task");

    let config = match family {
        TaskFamily::Init => TaskConfig::None,
        TaskFamily::Build => {
            let docs = BuildDocuments::load(args, ctx)?;
            TaskConfig::Build(BuildConfig::from_documents(&docs)?)
        }
        TaskFamily::Run => {
            let docs = RunDocuments::load(args, ctx)?;
            TaskConfig::Run(RuntimeConfig::from_documents(
                &docs,
                &args.runtime_overrides,
                &ctx.workloads_dir,
            )?)
        }
    };

    let invocation = TaskInvocation {
        task,
        args,
        ctx,
        config: &config,
    };
    handler.run(&invocation)?;
    tracing::info!(task, "task complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsourced_context_rejected_before_lookup() {
        let args = cli::parse_args(["buildafi"]).unwrap();
        let ctx = ExecutionContext::new("/nonexistent").with_sourced(false);
        let err = main(&args, &ctx, &TaskRegistry::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Environment);
    }

    #[test]
    fn missing_handler_is_unknown_task() {
        let args = cli::parse_args(["buildafi"]).unwrap();
        let ctx = ExecutionContext::new("/nonexistent");
        let err = main(&args, &ctx, &TaskRegistry::new()).unwrap_err();
        assert!(matches!(err, ManagerError::UnknownTask(ref name) if name == "buildafi"));
    }

    #[test]
    fn missing_default_config_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let args = cli::parse_args(["runcheck"]).unwrap();
        let ctx = ExecutionContext::new(dir.path());
        let err = main(&args, &ctx, &TaskRegistry::with_defaults()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert!(err.to_string().contains(cli::defaults::HWDB));
    }
}
