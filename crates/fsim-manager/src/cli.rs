//! Command-line parser factory
//!
//! The parser takes the task name as its first positional argument, followed
//! by the config file flags. Flag letters are part of the public contract:
//! `-b` build, `-r` build recipes, `-s` build farm, `-a` hardware database,
//! `-c` runtime, `-x` runtime override.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::builder::PossibleValuesParser;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde_yaml::Value;

use crate::error::{ManagerError, ManagerResult};
use crate::registry::TASK_NAMES;

/// Program name reported in usage text
pub const PROGRAM_NAME: &str = "fsim";

/// Default file names for each config role
pub mod defaults {
    /// `-b`
    pub const BUILD: &str = "config_build.yaml";
    /// `-r`
    pub const BUILD_RECIPES: &str = "config_build_recipes.yaml";
    /// `-s`
    pub const BUILD_FARM: &str = "config_build_farm.yaml";
    /// `-a`
    pub const HWDB: &str = "config_hwdb.yaml";
    /// `-c`
    pub const RUNTIME: &str = "config_runtime.yaml";
}

/// Construct the manager argument parser
#[must_use]
pub fn construct_argparser() -> Command {
    Command::new(PROGRAM_NAME)
        .version(crate::VERSION)
        .about("FPGA simulation deployment manager")
        .arg(
            Arg::new("task")
                .required(true)
                .value_parser(PossibleValuesParser::new(TASK_NAMES.iter().copied()))
                .help("Management task to run"),
        )
        .arg(
            Arg::new("config_build")
                .short('b')
                .long("buildconfigfile")
                .value_parser(value_parser!(PathBuf))
                .default_value(defaults::BUILD)
                .help("Build configuration file"),
        )
        .arg(
            Arg::new("config_build_recipes")
                .short('r')
                .long("buildrecipesconfigfile")
                .value_parser(value_parser!(PathBuf))
                .default_value(defaults::BUILD_RECIPES)
                .help("Build recipes configuration file"),
        )
        .arg(
            Arg::new("config_build_farm")
                .short('s')
                .long("buildfarmconfigfile")
                .value_parser(value_parser!(PathBuf))
                .default_value(defaults::BUILD_FARM)
                .help("Build farm configuration file"),
        )
        .arg(
            Arg::new("config_hwdb")
                .short('a')
                .long("hwdbconfigfile")
                .value_parser(value_parser!(PathBuf))
                .default_value(defaults::HWDB)
                .help("Hardware database configuration file"),
        )
        .arg(
            Arg::new("config_runtime")
                .short('c')
                .long("runtimeconfigfile")
                .value_parser(value_parser!(PathBuf))
                .default_value(defaults::RUNTIME)
                .help("Runtime configuration file"),
        )
        .arg(
            Arg::new("overrideconfigdata")
                .short('x')
                .long("overrideconfigdata")
                .action(ArgAction::Append)
                .help("Override a runtime config value, e.g. \"target-config link-latency 6405\""),
        )
}

/// One `-x SECTION KEY VALUE` runtime override
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeOverride {
    /// Top-level runtime section
    pub section: String,
    /// Key within the section
    pub key: String,
    /// Replacement value, parsed as a YAML scalar
    pub value: Value,
}

impl std::str::FromStr for RuntimeOverride {
    type Err = ManagerError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = raw.split_whitespace().collect();
        let [section, key, value] = words.as_slice() else {
            return Err(ManagerError::InvalidOverride(raw.to_string()));
        };
        let value = match serde_yaml::from_str(value) {
            Ok(parsed @ (Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_))) => parsed,
            _ => Value::String((*value).to_string()),
        };
        Ok(Self {
            section: (*section).to_string(),
            key: (*key).to_string(),
            value,
        })
    }
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerArgs {
    /// Task name
    pub task: String,
    /// `-b`
    pub config_build: PathBuf,
    /// `-r`
    pub config_build_recipes: PathBuf,
    /// `-s`
    pub config_build_farm: PathBuf,
    /// `-a`
    pub config_hwdb: PathBuf,
    /// `-c`
    pub config_runtime: PathBuf,
    /// `-x`, in command-line order
    pub runtime_overrides: Vec<RuntimeOverride>,
}

impl ManagerArgs {
    /// Extract arguments from parser matches
    ///
    /// # Errors
    /// Returns error if a required value is absent or an override is malformed
    pub fn from_matches(matches: &ArgMatches) -> ManagerResult<Self> {
        let task = matches
            .get_one::<String>("task")
            .cloned()
            .ok_or_else(|| ManagerError::Usage("missing task".to_string()))?;
        let path = |id: &str| -> ManagerResult<PathBuf> {
            matches
                .get_one::<PathBuf>(id)
                .cloned()
                .ok_or_else(|| ManagerError::Usage(format!("missing value for {id}")))
        };
        let runtime_overrides = matches
            .get_many::<String>("overrideconfigdata")
            .into_iter()
            .flatten()
            .map(|raw| raw.parse())
            .collect::<ManagerResult<Vec<RuntimeOverride>>>()?;

        Ok(Self {
            task,
            config_build: path("config_build")?,
            config_build_recipes: path("config_build_recipes")?,
            config_build_farm: path("config_build_farm")?,
            config_hwdb: path("config_hwdb")?,
            config_runtime: path("config_runtime")?,
            runtime_overrides,
        })
    }
}

/// Parse tokens (without the program name) with `parser`
///
/// # Errors
/// Returns [`ManagerError::Usage`] if the tokens are rejected
pub fn parse_with<I, T>(parser: &Command, tokens: I) -> ManagerResult<ManagerArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let argv = std::iter::once(OsString::from(PROGRAM_NAME)).chain(tokens.into_iter().map(Into::into));
    let matches = parser.clone().try_get_matches_from(argv)?;
    ManagerArgs::from_matches(&matches)
}

/// Parse tokens (without the program name) with a fresh parser
///
/// # Errors
/// Returns [`ManagerError::Usage`] if the tokens are rejected
pub fn parse_args<I, T>(tokens: I) -> ManagerResult<ManagerArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    parse_with(&construct_argparser(), tokens)
}
