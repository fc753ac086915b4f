//! Config file loading and validation
//!
//! Each config role is read from disk as an untyped YAML [`Document`] first;
//! validation into typed structs happens afterwards so that a missing file
//! is always reported before any shape problem in another file.

use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::cli::ManagerArgs;
use crate::context::ExecutionContext;
use crate::error::{ConfigError, ManagerError, ManagerResult};

pub mod build;
pub mod node;
pub mod runtime;

pub use build::{BuildConfig, BuildFarm, BuildFarmKind, BuildJob, BuildRecipe, Ec2FarmArgs, ExternalFarmArgs};
pub use node::Node;
pub use runtime::{HardwareDb, HostSimulator, HwConfig, RuntimeConfig, TargetConfig, WorkloadConfig};

/// One YAML file loaded from disk
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Resolved path
    pub path: PathBuf,
    /// Parsed content; an empty file is null
    pub value: Value,
}

impl Document {
    /// Top-level node
    #[inline]
    #[must_use]
    pub fn root(&self) -> Node<'_> {
        Node::root(&self.value)
    }

    /// Attribute a validation error to this file
    #[must_use]
    pub fn error(&self, source: ConfigError) -> ManagerError {
        ManagerError::config(&self.path, source)
    }
}

/// Read and parse one YAML file
///
/// # Errors
/// Returns [`ManagerError::FileNotFound`] if the file is absent, or a YAML
/// error if it does not parse
pub fn load_document(path: &Path) -> ManagerResult<Document> {
    tracing::debug!(path = %path.display(), "loading config");
    let text = std::fs::read_to_string(path).map_err(|e| ManagerError::io_error(path, e))?;
    let value = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_yaml::from_str(&text).map_err(|source| ManagerError::Yaml {
            path: path.to_path_buf(),
            source,
        })?
    };
    Ok(Document {
        path: path.to_path_buf(),
        value,
    })
}

/// Spot or on-demand capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceMarket {
    /// On-demand instances
    OnDemand,
    /// Spot instances
    Spot,
}

impl InstanceMarket {
    /// Parse a market node
    ///
    /// # Errors
    /// Returns error if the node is not `ondemand` or `spot`
    pub fn parse(node: Node<'_>) -> Result<Self, ConfigError> {
        match node.str()? {
            "ondemand" => Ok(Self::OnDemand),
            "spot" => Ok(Self::Spot),
            other => Err(ConfigError::invalid(
                node.path(),
                other,
                "expected 'ondemand' or 'spot'",
            )),
        }
    }

    /// Config spelling
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnDemand => "ondemand",
            Self::Spot => "spot",
        }
    }
}

/// Raw documents for a build task, in flag order
#[derive(Debug, Clone)]
pub struct BuildDocuments {
    /// `-b`
    pub build: Document,
    /// `-r`
    pub recipes: Document,
    /// `-s`
    pub farm: Document,
    /// `-a`
    pub hwdb: Document,
}

impl BuildDocuments {
    /// Load the four build-task files
    ///
    /// # Errors
    /// Returns the first load failure, in `-b -r -s -a` order
    pub fn load(args: &ManagerArgs, ctx: &ExecutionContext) -> ManagerResult<Self> {
        Ok(Self {
            build: load_document(&ctx.resolve(&args.config_build))?,
            recipes: load_document(&ctx.resolve(&args.config_build_recipes))?,
            farm: load_document(&ctx.resolve(&args.config_build_farm))?,
            hwdb: load_document(&ctx.resolve(&args.config_hwdb))?,
        })
    }
}

/// Raw documents for a run task, in flag order
#[derive(Debug, Clone)]
pub struct RunDocuments {
    /// `-a`
    pub hwdb: Document,
    /// `-c`
    pub runtime: Document,
}

impl RunDocuments {
    /// Load the two run-task files
    ///
    /// # Errors
    /// Returns the first load failure, in `-a -c` order
    pub fn load(args: &ManagerArgs, ctx: &ExecutionContext) -> ManagerResult<Self> {
        Ok(Self {
            hwdb: load_document(&ctx.resolve(&args.config_hwdb))?,
            runtime: load_document(&ctx.resolve(&args.config_runtime))?,
        })
    }
}
