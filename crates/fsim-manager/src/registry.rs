//! Task dispatch table
//!
//! Maps task names to handlers. The entry point receives the registry as an
//! argument, so callers (tests in particular) can build one with substituted
//! handlers instead of patching global state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::cli::ManagerArgs;
use crate::config::{BuildConfig, RuntimeConfig};
use crate::context::ExecutionContext;
use crate::error::ManagerResult;
use crate::tasks;

/// Tasks that need no config files
pub const INIT_TASKS: &[&str] = &["managerinit"];

/// Tasks that consume the build bundle (`-b -r -s -a`)
pub const BUILD_TASKS: &[&str] = &["buildafi", "shareagfi"];

/// Tasks that consume the run bundle (`-a -c`)
pub const RUN_TASKS: &[&str] = &[
    "launchrunfarm",
    "infrasetup",
    "boot",
    "kill",
    "terminaterunfarm",
    "runworkload",
    "runcheck",
    "checkconfig",
];

/// Every task name the parser accepts
pub const TASK_NAMES: &[&str] = &[
    "managerinit",
    "buildafi",
    "shareagfi",
    "launchrunfarm",
    "infrasetup",
    "boot",
    "kill",
    "terminaterunfarm",
    "runworkload",
    "runcheck",
    "checkconfig",
];

/// Which configs a task consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskFamily {
    /// No configs
    Init,
    /// Build bundle
    Build,
    /// Run bundle
    Run,
}

impl TaskFamily {
    /// Family of a task name
    #[must_use]
    pub fn of(task: &str) -> Option<Self> {
        if INIT_TASKS.contains(&task) {
            Some(Self::Init)
        } else if BUILD_TASKS.contains(&task) {
            Some(Self::Build)
        } else if RUN_TASKS.contains(&task) {
            Some(Self::Run)
        } else {
            None
        }
    }
}

/// Validated configuration handed to a task
#[derive(Debug, Clone, PartialEq)]
pub enum TaskConfig {
    /// Init tasks read no configs
    None,
    /// Build tasks
    Build(BuildConfig),
    /// Run tasks
    Run(RuntimeConfig),
}

/// Everything a handler receives
#[derive(Debug, Clone, Copy)]
pub struct TaskInvocation<'a> {
    /// Task name as given on the command line
    pub task: &'a str,
    /// Parsed command line
    pub args: &'a ManagerArgs,
    /// Execution context
    pub ctx: &'a ExecutionContext,
    /// Validated configs
    pub config: &'a TaskConfig,
}

impl<'a> TaskInvocation<'a> {
    /// Build config, for build tasks
    #[must_use]
    pub fn build_config(&self) -> Option<&'a BuildConfig> {
        match self.config {
            TaskConfig::Build(config) => Some(config),
            _ => None,
        }
    }

    /// Runtime config, for run tasks
    #[must_use]
    pub fn runtime_config(&self) -> Option<&'a RuntimeConfig> {
        match self.config {
            TaskConfig::Run(config) => Some(config),
            _ => None,
        }
    }
}

/// A task implementation
pub trait TaskHandler: Send + Sync {
    /// Run the task
    ///
    /// # Errors
    /// Returns error if the task fails
    fn run(&self, invocation: &TaskInvocation<'_>) -> ManagerResult<()>;
}

impl<F> TaskHandler for F
where
    F: Fn(&TaskInvocation<'_>) -> ManagerResult<()> + Send + Sync,
{
    fn run(&self, invocation: &TaskInvocation<'_>) -> ManagerResult<()> {
        self(invocation)
    }
}

/// Task name to handler mapping, with aliases
#[derive(Clone, Default)]
pub struct TaskRegistry {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
    aliases: HashMap<String, String>,
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("TaskRegistry")
            .field("handlers", &names)
            .field("aliases", &self.aliases)
            .finish()
    }
}

impl TaskRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create registry with the built-in task handlers
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("managerinit", tasks::managerinit);
        registry.register("buildafi", tasks::buildafi);
        registry.register("shareagfi", tasks::shareagfi);
        registry.register("runcheck", tasks::runcheck);
        for task in ["launchrunfarm", "infrasetup", "boot", "kill", "terminaterunfarm", "runworkload"] {
            registry.register(task, tasks::plan_run_task);
        }
        registry.alias("checkconfig", "runcheck");
        registry
    }

    /// Register a handler, replacing any previous one
    pub fn register(&mut self, name: &str, handler: impl TaskHandler + 'static) {
        self.handlers.insert(name.to_string(), Arc::new(handler));
    }

    /// Make `alias` dispatch to whatever `target` is bound to
    pub fn alias(&mut self, alias: &str, target: &str) {
        self.handlers.remove(alias);
        self.aliases.insert(alias.to_string(), target.to_string());
    }

    /// Canonical name `name` dispatches through
    #[must_use]
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map_or(name, String::as_str)
    }

    /// Handler bound to `name`, following aliases
    #[must_use]
    pub fn handler(&self, name: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(self.resolve(name)).cloned()
    }

    /// Replace the handler `name` dispatches to
    ///
    /// Substituting an alias replaces its target, so every name bound to the
    /// same task observes the new handler. Returns the previous handler.
    pub fn substitute(
        &mut self,
        name: &str,
        handler: impl TaskHandler + 'static,
    ) -> Option<Arc<dyn TaskHandler>> {
        let canonical = self.resolve(name).to_string();
        tracing::debug!(task = %name, canonical = %canonical, "substituting task handler");
        self.handlers.insert(canonical, Arc::new(handler))
    }

    /// Check if a name dispatches anywhere
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(self.resolve(name))
    }

    /// Registered names and aliases, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .handlers
            .keys()
            .chain(self.aliases.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    /// Number of registered handlers, not counting aliases
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn defaults_cover_every_task_name() {
        let registry = TaskRegistry::with_defaults();
        for name in TASK_NAMES {
            assert!(registry.contains(name), "no handler for {name}");
            assert!(TaskFamily::of(registry.resolve(name)).is_some());
        }
        assert_eq!(registry.names().len(), TASK_NAMES.len());
        assert_eq!(registry.len(), TASK_NAMES.len() - 1, "checkconfig is an alias, not a handler");
    }

    #[test]
    fn families() {
        assert_eq!(TaskFamily::of("managerinit"), Some(TaskFamily::Init));
        assert_eq!(TaskFamily::of("buildafi"), Some(TaskFamily::Build));
        assert_eq!(TaskFamily::of("checkconfig"), Some(TaskFamily::Run));
        assert_eq!(TaskFamily::of("nope"), None);
    }

    #[test]
    fn alias_resolves_to_target() {
        let registry = TaskRegistry::with_defaults();
        assert_eq!(registry.resolve("checkconfig"), "runcheck");
        assert_eq!(registry.resolve("runcheck"), "runcheck");
    }

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn counting(_: &TaskInvocation<'_>) -> ManagerResult<()> {
        CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    #[test]
    fn substituting_alias_replaces_target() {
        let mut registry = TaskRegistry::with_defaults();
        let previous = registry.substitute("checkconfig", counting);
        assert!(previous.is_some());

        let args = crate::cli::parse_args(["runcheck"]).unwrap();
        let ctx = ExecutionContext::new("/nonexistent");
        let config = TaskConfig::None;
        let invocation = TaskInvocation {
            task: "runcheck",
            args: &args,
            ctx: &ctx,
            config: &config,
        };
        registry.handler("runcheck").unwrap().run(&invocation).unwrap();
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_registry() {
        let registry = TaskRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.handler("buildafi").is_none());
    }
}
