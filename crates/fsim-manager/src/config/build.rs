//! Build configuration
//!
//! Validates `config_build.yaml` together with the recipes and build farm
//! files it references. Farms are resolved lazily: only farms used by a
//! requested build are checked.

use std::collections::BTreeMap;

use super::node::{Child, Node, ROOT_PATH};
use super::runtime::HardwareDb;
use super::{BuildDocuments, Document, InstanceMarket};
use crate::error::{ConfigError, ManagerResult};

/// Supported build farm backends, keyed by their `build-farm-type` spelling
pub const BUILD_FARM_TYPES: &[(&str, BuildFarmKind)] = &[
    ("AWSEC2F1", BuildFarmKind::AwsEc2F1),
    ("ExternallyProvisioned", BuildFarmKind::ExternallyProvisioned),
];

/// Build farm backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildFarmKind {
    /// Build instances launched on EC2
    AwsEc2F1,
    /// Pre-existing hosts reached over ssh
    ExternallyProvisioned,
}

impl BuildFarmKind {
    /// Look up a `build-farm-type` value
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        BUILD_FARM_TYPES
            .iter()
            .find(|(spelling, _)| *spelling == name)
            .map(|(_, kind)| *kind)
    }
}

/// Arguments of an `AWSEC2F1` farm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ec2FarmArgs {
    /// EC2 instance type of build hosts
    pub instance_type: String,
    /// Capacity market
    pub market: InstanceMarket,
    /// What to do when spot capacity is reclaimed
    pub spot_interruption_behavior: String,
    /// Maximum spot price, or `ondemand`
    pub spot_max_price: String,
    /// Build directory on each host
    pub default_build_dir: String,
}

impl Ec2FarmArgs {
    fn parse(args: Node<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            // TODO: check instance-type against the EC2 instance catalogue once one is vendored
            instance_type: args.get("instance-type")?.node().str()?.to_string(),
            market: InstanceMarket::parse(args.get("build-instance-market")?.node())?,
            spot_interruption_behavior: args
                .get("spot-interruption-behavior")?
                .node()
                .str()?
                .to_string(),
            spot_max_price: args.get("spot-max-price")?.node().scalar_text()?,
            default_build_dir: args.get("default-build-dir")?.node().str()?.to_string(),
        })
    }
}

/// Arguments of an `ExternallyProvisioned` farm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalFarmArgs {
    /// Build directory on each host
    pub default_build_dir: String,
    /// Hostnames builds are distributed over
    pub hosts: Vec<String>,
}

impl ExternalFarmArgs {
    fn parse(args: Node<'_>) -> Result<Self, ConfigError> {
        let default_build_dir = args.get("default-build-dir")?.node().str()?.to_string();
        let hosts = args
            .get("build-farm-hosts")?
            .node()
            .sequence()?
            .iter()
            .map(|host| host.node().str().map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            default_build_dir,
            hosts,
        })
    }
}

/// A resolved build farm
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildFarm {
    /// `AWSEC2F1`
    AwsEc2F1(Ec2FarmArgs),
    /// `ExternallyProvisioned`
    ExternallyProvisioned(ExternalFarmArgs),
}

impl BuildFarm {
    /// Parse one farm entry
    ///
    /// The type is resolved before `args` is touched, so an unknown type is
    /// reported even when its arguments are malformed.
    ///
    /// # Errors
    /// Returns error on unknown type or malformed arguments
    pub fn parse(node: Node<'_>) -> Result<Self, ConfigError> {
        let ty = node.get("build-farm-type")?;
        let name = ty.node().str()?;
        let kind = BuildFarmKind::lookup(name)
            .ok_or_else(|| ConfigError::unknown(ty.path(), "build farm type", name))?;
        let args = node.get("args")?;
        match kind {
            BuildFarmKind::AwsEc2F1 => Ec2FarmArgs::parse(args.node()).map(Self::AwsEc2F1),
            BuildFarmKind::ExternallyProvisioned => {
                ExternalFarmArgs::parse(args.node()).map(Self::ExternallyProvisioned)
            }
        }
    }

    /// Backend of this farm
    #[must_use]
    pub fn kind(&self) -> BuildFarmKind {
        match self {
            Self::AwsEc2F1(_) => BuildFarmKind::AwsEc2F1,
            Self::ExternallyProvisioned(_) => BuildFarmKind::ExternallyProvisioned,
        }
    }

    /// Build directory on the farm's hosts
    #[must_use]
    pub fn default_build_dir(&self) -> &str {
        match self {
            Self::AwsEc2F1(args) => &args.default_build_dir,
            Self::ExternallyProvisioned(args) => &args.default_build_dir,
        }
    }
}

/// One build recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecipe {
    /// Recipe name
    pub name: String,
    /// Top-level design
    pub design: String,
    /// Target configuration
    pub target_config: String,
    /// Platform configuration
    pub platform_config: String,
    /// Optional pre-built driver triplet
    pub deploy_triplet: Option<String>,
    /// Optional script run after the build completes
    pub post_build_hook: Option<String>,
    /// Bucket the bitstream is uploaded to
    pub s3_bucket_name: String,
    /// Farm override; falls back to `default-build-farm`
    pub build_farm: Option<String>,
}

impl BuildRecipe {
    fn parse(name: &str, node: Node<'_>) -> Result<Self, ConfigError> {
        let opt_str = |key: &str| -> Result<Option<String>, ConfigError> {
            match node.get_opt(key)? {
                Some(child) => Ok(child.node().opt_str()?.map(str::to_string)),
                None => Ok(None),
            }
        };
        Ok(Self {
            name: name.to_string(),
            design: node.get("DESIGN")?.node().str()?.to_string(),
            target_config: node.get("TARGET_CONFIG")?.node().str()?.to_string(),
            platform_config: node.get("PLATFORM_CONFIG")?.node().str()?.to_string(),
            deploy_triplet: opt_str("deploy-triplet")?,
            post_build_hook: opt_str("post-build-hook")?,
            s3_bucket_name: node.get("s3-bucket-name")?.node().str()?.to_string(),
            build_farm: opt_str("build-farm")?,
        })
    }

    /// `DESIGN-TARGET_CONFIG-PLATFORM_CONFIG`, or the explicit deploy triplet
    #[must_use]
    pub fn triplet(&self) -> String {
        self.deploy_triplet.clone().unwrap_or_else(|| {
            format!("{}-{}-{}", self.design, self.target_config, self.platform_config)
        })
    }
}

/// A requested build and the farm it runs on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildJob {
    /// Recipe to build
    pub recipe: BuildRecipe,
    /// Name of the resolved farm in [`BuildConfig::farms`]
    pub farm: String,
}

/// Validated build-task configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Farm for recipes without their own
    pub default_build_farm: Option<String>,
    /// Requested builds, in file order
    pub builds: Vec<BuildJob>,
    /// Recipes whose images are shared
    pub agfis_to_share: Vec<String>,
    /// Account name to 12-digit account id
    pub share_with_accounts: Vec<(String, String)>,
    /// Farms referenced by `builds`
    pub farms: BTreeMap<String, BuildFarm>,
    /// Hardware database the build results are recorded against
    pub hwdb: HardwareDb,
}

fn account_id(child: &Child<'_>) -> Result<String, ConfigError> {
    let id = child.node().scalar_text()?;
    if id.len() == 12 && id.bytes().all(|b| b.is_ascii_digit()) {
        Ok(id)
    } else {
        Err(ConfigError::invalid(child.path(), id, "account ids are 12 digits"))
    }
}

fn names(doc: &Document, child: Option<Child<'_>>) -> ManagerResult<Vec<(String, String)>> {
    let Some(child) = child else {
        return Ok(Vec::new());
    };
    let items = child.node().sequence().map_err(|e| doc.error(e))?;
    items
        .iter()
        .map(|item| -> ManagerResult<(String, String)> {
            let name = item.node().str().map_err(|e| doc.error(e))?;
            Ok((item.path().to_string(), name.to_string()))
        })
        .collect()
}

impl BuildConfig {
    /// Validate the four build-task documents
    ///
    /// # Errors
    /// Returns the first validation failure, attributed to the file it was found in
    pub fn from_documents(docs: &BuildDocuments) -> ManagerResult<Self> {
        let build = docs.build.root();
        let recipes = docs.recipes.root();
        let farms_root = docs.farm.root();
        let berr = |e: ConfigError| docs.build.error(e);

        build.mapping().map_err(berr)?;
        let default_build_farm = match build.get_opt("default-build-farm").map_err(berr)? {
            Some(child) => child.node().opt_str().map_err(berr)?.map(str::to_string),
            None => None,
        };

        let requested = names(&docs.build, Some(build.get("builds").map_err(berr)?))?;
        let agfis = names(&docs.build, build.get_opt("agfis-to-share").map_err(berr)?)?;

        let share_with_accounts = match build.get_opt("share-with-accounts").map_err(berr)? {
            Some(child) => child
                .node()
                .entries()
                .map_err(berr)?
                .iter()
                .map(|(name, id)| -> ManagerResult<(String, String)> {
                    Ok(((*name).to_string(), account_id(id).map_err(berr)?))
                })
                .collect::<ManagerResult<Vec<(String, String)>>>()?,
            None => Vec::new(),
        };

        recipes.mapping().map_err(|e| docs.recipes.error(e))?;
        let lookup_recipe = |path: &str, name: &str| -> ManagerResult<BuildRecipe> {
            let node = recipes
                .get_opt(name)
                .map_err(|e| docs.recipes.error(e))?
                .ok_or_else(|| berr(ConfigError::unknown(path, "build recipe", name)))?;
            BuildRecipe::parse(name, node.node()).map_err(|e| docs.recipes.error(e))
        };

        let mut farms = BTreeMap::new();
        let mut builds = Vec::with_capacity(requested.len());
        for (path, name) in &requested {
            let recipe = lookup_recipe(path, name)?;
            let farm = match (&recipe.build_farm, &default_build_farm) {
                (Some(farm), _) | (None, Some(farm)) => farm.clone(),
                (None, None) => {
                    return Err(docs.recipes.error(ConfigError::MissingKey {
                        path: name.clone(),
                        key: "build-farm".to_string(),
                    }))
                }
            };
            if !farms.contains_key(&farm) {
                let node = farms_root
                    .get_opt(&farm)
                    .map_err(|e| docs.farm.error(e))?
                    .ok_or_else(|| docs.farm.error(ConfigError::unknown(ROOT_PATH, "build farm", &farm)))?;
                let parsed = BuildFarm::parse(node.node()).map_err(|e| docs.farm.error(e))?;
                tracing::debug!(farm = %farm, kind = ?parsed.kind(), "resolved build farm");
                farms.insert(farm.clone(), parsed);
            }
            builds.push(BuildJob { recipe, farm });
        }

        let mut agfis_to_share = Vec::with_capacity(agfis.len());
        for (path, name) in agfis {
            recipes
                .get_opt(&name)
                .map_err(|e| docs.recipes.error(e))?
                .ok_or_else(|| berr(ConfigError::unknown(path, "build recipe", &name)))?;
            agfis_to_share.push(name);
        }

        let hwdb = HardwareDb::from_document(&docs.hwdb)?;

        Ok(Self {
            default_build_farm,
            builds,
            agfis_to_share,
            share_with_accounts,
            farms,
            hwdb,
        })
    }
}
