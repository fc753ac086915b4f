//! Observer stubs for task handlers

use std::path::PathBuf;
use std::sync::Arc;

use fsim_manager::{ManagerResult, TaskConfig, TaskHandler, TaskInvocation, TaskRegistry};
use parking_lot::Mutex;

/// One observed handler call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Task name as given on the command line
    pub task: String,
    /// Resolved config files the task's family consumed, in flag order
    pub config_paths: Vec<PathBuf>,
}

/// Handler that records calls and does nothing else
///
/// Clones share one call log, so a test keeps a clone after installing the
/// stub into a registry.
#[derive(Debug, Clone, Default)]
pub struct StubHandler {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl StubHandler {
    /// Create stub with an empty call log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Substitute a new stub for `task` in `registry` and return it
    ///
    /// Aliases resolve to their target, so every name bound to the same
    /// task dispatches to the stub.
    pub fn install(registry: &mut TaskRegistry, task: &str) -> Self {
        let stub = Self::new();
        registry.substitute(task, stub.clone());
        stub
    }

    /// Recorded calls, oldest first
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of recorded calls
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// # Panics
    /// Panics if the stub was called
    #[track_caller]
    pub fn assert_not_called(&self) {
        let calls = self.calls.lock();
        assert!(calls.is_empty(), "handler called before validation failed: {calls:?}");
    }

    /// # Panics
    /// Panics unless the stub was called exactly once
    #[track_caller]
    pub fn assert_called_once(&self) -> RecordedCall {
        let calls = self.calls.lock();
        assert_eq!(calls.len(), 1, "expected one handler call, got {calls:?}");
        calls[0].clone()
    }
}

impl TaskHandler for StubHandler {
    fn run(&self, invocation: &TaskInvocation<'_>) -> ManagerResult<()> {
        let args = invocation.args;
        let paths = match invocation.config {
            TaskConfig::None => Vec::new(),
            TaskConfig::Build(_) => vec![
                &args.config_build,
                &args.config_build_recipes,
                &args.config_build_farm,
                &args.config_hwdb,
            ],
            TaskConfig::Run(_) => vec![&args.config_hwdb, &args.config_runtime],
        };
        self.calls.lock().push(RecordedCall {
            task: invocation.task.to_string(),
            config_paths: paths.into_iter().map(|p| invocation.ctx.resolve(p)).collect(),
        });
        Ok(())
    }
}
