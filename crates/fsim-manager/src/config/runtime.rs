//! Hardware database and runtime configuration

use std::path::{Path, PathBuf};

use serde_yaml::Value;

use super::node::{type_name, Child, Node, ROOT_PATH};
use super::{Document, InstanceMarket, RunDocuments};
use crate::cli::RuntimeOverride;
use crate::error::{ConfigError, ManagerError, ManagerResult};

/// Topologies the runtime knows how to lay out
pub const TOPOLOGIES: &[&str] = &[
    "no_net_config",
    "example_1config",
    "example_2config",
    "example_4config",
    "example_8config",
    "example_16config",
    "example_32config",
    "example_64config",
    "example_128config",
    "example_256config",
];

/// Run farm instance-count keys
pub const RUN_FARM_INSTANCE_KEYS: &[&str] = &["f1_16xlarges", "m4_16xlarges", "f1_4xlarges", "f1_2xlarges"];

/// One hardware database entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HwConfig {
    /// Entry name
    pub name: String,
    /// Published image id
    pub agfi: Option<String>,
    /// Driver triplet to deploy, if not derived from the build
    pub deploy_triplet: Option<String>,
    /// Simulator runtime config overriding the default
    pub custom_runtime_config: Option<String>,
}

fn check_agfi(child: &Child<'_>) -> Result<Option<String>, ConfigError> {
    let Some(agfi) = child.node().opt_str()? else {
        return Ok(None);
    };
    let valid = agfi
        .strip_prefix("agfi-")
        .is_some_and(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_hexdigit()));
    if valid {
        Ok(Some(agfi.to_string()))
    } else {
        Err(ConfigError::invalid(child.path(), agfi, "expected 'agfi-' followed by hex digits"))
    }
}

impl HwConfig {
    fn parse(name: &str, node: Node<'_>) -> Result<Self, ConfigError> {
        let opt = |key: &str| -> Result<Option<String>, ConfigError> {
            match node.get_opt(key)? {
                Some(child) => Ok(child.node().opt_str()?.map(str::to_string)),
                None => Ok(None),
            }
        };
        let agfi = match node.get_opt("agfi")? {
            Some(child) => check_agfi(&child)?,
            None => None,
        };
        Ok(Self {
            name: name.to_string(),
            agfi,
            deploy_triplet: opt("deploy-triplet-libfiresim")?,
            custom_runtime_config: opt("custom-runtime-config")?,
        })
    }
}

/// Hardware configurations by name, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HardwareDb {
    entries: Vec<HwConfig>,
}

impl HardwareDb {
    /// Validate a hardware database document
    ///
    /// # Errors
    /// Returns error if the document is not a mapping of well-formed entries
    pub fn from_document(doc: &Document) -> ManagerResult<Self> {
        Self::parse(doc.root()).map_err(|e| doc.error(e))
    }

    fn parse(root: Node<'_>) -> Result<Self, ConfigError> {
        let entries = root
            .entries()?
            .iter()
            .map(|(name, child)| HwConfig::parse(name, child.node()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// Entry by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HwConfig> {
        self.entries.iter().find(|hw| hw.name == name)
    }

    /// All entries
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[HwConfig] {
        &self.entries
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the database is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `run-farm` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFarmConfig {
    /// Tag identifying instances of this farm
    pub tag: String,
    /// Launch additional instances when more are requested
    pub always_expand: bool,
    /// Give up launching after this many minutes
    pub launch_timeout_minutes: u64,
    /// Capacity market
    pub market: InstanceMarket,
    /// What to do when spot capacity is reclaimed
    pub spot_interruption_behavior: String,
    /// Maximum spot price, or `ondemand`
    pub spot_max_price: String,
    /// Requested instance counts, in [`RUN_FARM_INSTANCE_KEYS`] order
    pub instances: Vec<(String, u64)>,
}

impl RunFarmConfig {
    fn parse(node: Node<'_>) -> Result<Self, ConfigError> {
        let instances = RUN_FARM_INSTANCE_KEYS
            .iter()
            .map(|key| -> Result<(String, u64), ConfigError> {
                let count = match node.get_opt(key)? {
                    Some(child) => child.node().u64()?,
                    None => 0,
                };
                Ok(((*key).to_string(), count))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        if checked_total(&instances).is_none() {
            let counts: Vec<String> = instances.iter().map(|(key, n)| format!("{key}={n}")).collect();
            return Err(ConfigError::invalid(node.path(), counts.join(", "), "instance count overflows"));
        }
        Ok(Self {
            tag: node.get("run-farm-tag")?.node().str()?.to_string(),
            always_expand: node.get("always-expand-run-farm")?.node().bool()?,
            launch_timeout_minutes: node.get("launch-instances-timeout-minutes")?.node().u64()?,
            market: InstanceMarket::parse(node.get("run-instance-market")?.node())?,
            spot_interruption_behavior: node.get("spot-interruption-behavior")?.node().str()?.to_string(),
            spot_max_price: node.get("spot-max-price")?.node().scalar_text()?,
            instances,
        })
    }

    /// Total number of instances requested
    #[must_use]
    pub fn total_instances(&self) -> u64 {
        checked_total(&self.instances).unwrap_or(u64::MAX)
    }
}

fn checked_total(instances: &[(String, u64)]) -> Option<u64> {
    instances.iter().try_fold(0u64, |total, (_, n)| total.checked_add(*n))
}

/// Software simulator used when metasimulating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSimulator {
    /// `verilator`
    Verilator,
    /// `verilator-debug`
    VerilatorDebug,
    /// `vcs`
    Vcs,
    /// `vcs-debug`
    VcsDebug,
}

impl HostSimulator {
    /// Look up a simulator by its config spelling
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "verilator" => Some(Self::Verilator),
            "verilator-debug" => Some(Self::VerilatorDebug),
            "vcs" => Some(Self::Vcs),
            "vcs-debug" => Some(Self::VcsDebug),
            _ => None,
        }
    }
}

/// `metasimulation` section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetasimConfig {
    /// Run software simulation instead of FPGAs
    pub enabled: bool,
    /// Simulator to use when enabled
    pub host_simulator: HostSimulator,
}

impl Default for MetasimConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host_simulator: HostSimulator::Verilator,
        }
    }
}

impl MetasimConfig {
    fn parse(node: Node<'_>) -> Result<Self, ConfigError> {
        let sim = node.get("metasimulation-host-simulator")?;
        let name = sim.node().str()?;
        Ok(Self {
            enabled: node.get("metasimulation-enabled")?.node().bool()?,
            host_simulator: HostSimulator::lookup(name)
                .ok_or_else(|| ConfigError::unknown(sim.path(), "host simulator", name))?,
        })
    }
}

/// `target-config` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    /// Network topology name
    pub topology: String,
    /// Node count for `no_net_config`
    pub no_net_num_nodes: u64,
    /// Link latency in cycles
    pub link_latency: u64,
    /// Switch latency in cycles
    pub switching_latency: u64,
    /// Network bandwidth in Gbit/s
    pub net_bandwidth: u64,
    /// Profiling interval in cycles, negative to disable
    pub profile_interval: i64,
    /// Hardware database entry used by default
    pub default_hw_config: String,
}

impl TargetConfig {
    fn parse(node: Node<'_>, hwdb: &HardwareDb) -> Result<Self, ConfigError> {
        let topology = node.get("topology")?;
        let topology_name = topology.node().str()?;
        if !TOPOLOGIES.contains(&topology_name) {
            return Err(ConfigError::unknown(topology.path(), "topology", topology_name));
        }
        let hw = node.get("default-hw-config")?;
        let hw_name = hw.node().str()?;
        if hwdb.get(hw_name).is_none() {
            return Err(ConfigError::unknown(hw.path(), "hardware config", hw_name));
        }
        Ok(Self {
            topology: topology_name.to_string(),
            no_net_num_nodes: node.get("no-net-num-nodes")?.node().u64()?,
            link_latency: node.get("link-latency")?.node().u64()?,
            switching_latency: node.get("switching-latency")?.node().u64()?,
            net_bandwidth: node.get("net-bandwidth")?.node().u64()?,
            profile_interval: node.get("profile-interval")?.node().i64()?,
            default_hw_config: hw_name.to_string(),
        })
    }
}

/// `workload` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadConfig {
    /// Workload description file name
    pub name: String,
    /// Resolved description file
    pub path: PathBuf,
    /// Stop the run farm once the workload finishes
    pub terminate_on_completion: bool,
    /// Suffix appended to result directories
    pub suffix_tag: Option<String>,
}

impl WorkloadConfig {
    fn parse(node: Node<'_>, workloads_dir: &Path) -> Result<Self, ConfigError> {
        let name = node.get("workload-name")?.node().str()?.to_string();
        let suffix_tag = match node.get_opt("suffix-tag")? {
            Some(child) => child.node().opt_str()?.map(str::to_string),
            None => None,
        };
        Ok(Self {
            path: workloads_dir.join(&name),
            name,
            terminate_on_completion: node.get("terminate-on-completion")?.node().bool()?,
            suffix_tag,
        })
    }
}

/// Validated run-task configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Run farm sizing
    pub run_farm: RunFarmConfig,
    /// Metasimulation settings
    pub metasimulation: MetasimConfig,
    /// Simulated target
    pub target: TargetConfig,
    /// Workload to run
    pub workload: WorkloadConfig,
    /// Hardware database
    pub hwdb: HardwareDb,
}

fn not_mapping(path: &str, value: &Value) -> ConfigError {
    match value {
        Value::Null => ConfigError::NotSubscriptable {
            path: path.to_string(),
            found: "null",
        },
        other => ConfigError::TypeMismatch {
            path: path.to_string(),
            expected: "mapping",
            found: type_name(other),
        },
    }
}

/// Apply `-x` overrides to a runtime document before validation
///
/// # Errors
/// Returns error if a section is absent or not a mapping
pub fn apply_overrides(value: &mut Value, overrides: &[RuntimeOverride]) -> Result<(), ConfigError> {
    for o in overrides {
        let Some(root) = value.as_mapping_mut() else {
            return Err(not_mapping(ROOT_PATH, value));
        };
        let section = root.get_mut(o.section.as_str()).ok_or_else(|| ConfigError::MissingKey {
            path: ROOT_PATH.to_string(),
            key: o.section.clone(),
        })?;
        let Some(section) = section.as_mapping_mut() else {
            return Err(not_mapping(&o.section, section));
        };
        tracing::info!(section = %o.section, key = %o.key, value = ?o.value, "overriding runtime config");
        section.insert(Value::String(o.key.clone()), o.value.clone());
    }
    Ok(())
}

impl RuntimeConfig {
    /// Validate the run-task documents
    ///
    /// Overrides are applied to a copy of the runtime document. The workload
    /// file must exist under `workloads_dir`.
    ///
    /// # Errors
    /// Returns the first validation failure, attributed to the file it was found in
    pub fn from_documents(
        docs: &RunDocuments,
        overrides: &[RuntimeOverride],
        workloads_dir: &Path,
    ) -> ManagerResult<Self> {
        let hwdb = HardwareDb::from_document(&docs.hwdb)?;

        let mut value = docs.runtime.value.clone();
        apply_overrides(&mut value, overrides).map_err(|e| docs.runtime.error(e))?;
        let root = Node::root(&value);
        let rerr = |e: ConfigError| docs.runtime.error(e);

        let run_farm = RunFarmConfig::parse(root.get("run-farm").map_err(rerr)?.node()).map_err(rerr)?;
        let metasimulation = match root.get_opt("metasimulation").map_err(rerr)? {
            Some(child) => MetasimConfig::parse(child.node()).map_err(rerr)?,
            None => MetasimConfig::default(),
        };
        let target =
            TargetConfig::parse(root.get("target-config").map_err(rerr)?.node(), &hwdb).map_err(rerr)?;
        let workload =
            WorkloadConfig::parse(root.get("workload").map_err(rerr)?.node(), workloads_dir).map_err(rerr)?;

        if !workload.path.is_file() {
            return Err(ManagerError::FileNotFound { path: workload.path });
        }

        Ok(Self {
            run_farm,
            metasimulation,
            target,
            workload,
            hwdb,
        })
    }
}
