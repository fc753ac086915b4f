//! Config bundles
//!
//! A bundle is the fixed set of documents one task family consumes. Members
//! are always written and emitted in flag order.

use std::path::Path;

use crate::error::FixtureError;
use crate::scoped_yaml::ScopedYamlDocument;

/// Flag letters, one per config role
pub mod flags {
    /// Build config
    pub const BUILD: &str = "-b";
    /// Build recipes
    pub const RECIPES: &str = "-r";
    /// Build farm
    pub const FARM: &str = "-s";
    /// Hardware database
    pub const HWDB: &str = "-a";
    /// Runtime config
    pub const RUNTIME: &str = "-c";
}

/// Sample file names, one per config role
pub mod samples {
    /// Build config
    pub const BUILD: &str = "sample_config_build.yaml";
    /// Build recipes
    pub const RECIPES: &str = "sample_config_build_recipes.yaml";
    /// Build farm
    pub const FARM: &str = "sample_config_build_farm.yaml";
    /// Hardware database
    pub const HWDB: &str = "sample_config_hwdb.yaml";
    /// Runtime config
    pub const RUNTIME: &str = "sample_config_runtime.yaml";
}

/// A task family's full set of config documents
pub trait ConfigBundle {
    /// Members with their flags, in flag order
    fn members(&self) -> Vec<(&'static str, &ScopedYamlDocument)>;

    /// Dump every member to disk
    ///
    /// # Errors
    /// Returns the first write failure
    fn write(&self) -> Result<(), FixtureError> {
        self.members().into_iter().try_for_each(|(_, doc)| doc.dump())
    }

    /// Flag/path pairs for the manager's parser
    fn args(&self) -> Vec<String> {
        self.members()
            .into_iter()
            .flat_map(|(flag, doc)| [flag.to_string(), doc.path().display().to_string()])
            .collect()
    }

    /// [`args`](Self::args) as one shell-quoted string
    ///
    /// # Errors
    /// Returns error if a path cannot be quoted
    fn cmdline(&self) -> Result<String, FixtureError> {
        let args = self.args();
        Ok(shlex::try_join(args.iter().map(String::as_str))?)
    }
}

/// Configs consumed by build tasks: `-b -r -s -a`
#[derive(Debug, Clone, PartialEq)]
pub struct BuildBundle {
    /// `config_build.yaml`
    pub build: ScopedYamlDocument,
    /// `config_build_recipes.yaml`
    pub recipes: ScopedYamlDocument,
    /// `config_build_farm.yaml`
    pub farm: ScopedYamlDocument,
    /// `config_hwdb.yaml`
    pub hwdb: ScopedYamlDocument,
}

impl BuildBundle {
    /// Materialize the build samples from `samples_dir` into `tmp_dir`
    ///
    /// # Errors
    /// Returns error if a sample cannot be materialized
    pub fn from_samples(tmp_dir: &Path, samples_dir: &Path) -> Result<Self, FixtureError> {
        let doc = |name: &str| ScopedYamlDocument::materialize(tmp_dir, &samples_dir.join(name));
        Ok(Self {
            build: doc(samples::BUILD)?,
            recipes: doc(samples::RECIPES)?,
            farm: doc(samples::FARM)?,
            hwdb: doc(samples::HWDB)?,
        })
    }
}

impl ConfigBundle for BuildBundle {
    fn members(&self) -> Vec<(&'static str, &ScopedYamlDocument)> {
        vec![
            (flags::BUILD, &self.build),
            (flags::RECIPES, &self.recipes),
            (flags::FARM, &self.farm),
            (flags::HWDB, &self.hwdb),
        ]
    }
}

/// Configs consumed by run tasks: `-a -c`
#[derive(Debug, Clone, PartialEq)]
pub struct RunBundle {
    /// `config_hwdb.yaml`
    pub hwdb: ScopedYamlDocument,
    /// `config_runtime.yaml`
    pub runtime: ScopedYamlDocument,
}

impl RunBundle {
    /// Materialize the run samples from `samples_dir` into `tmp_dir`
    ///
    /// # Errors
    /// Returns error if a sample cannot be materialized
    pub fn from_samples(tmp_dir: &Path, samples_dir: &Path) -> Result<Self, FixtureError> {
        let doc = |name: &str| ScopedYamlDocument::materialize(tmp_dir, &samples_dir.join(name));
        Ok(Self {
            hwdb: doc(samples::HWDB)?,
            runtime: doc(samples::RUNTIME)?,
        })
    }
}

impl ConfigBundle for RunBundle {
    fn members(&self) -> Vec<(&'static str, &ScopedYamlDocument)> {
        vec![(flags::HWDB, &self.hwdb), (flags::RUNTIME, &self.runtime)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_backup_configs;
    use pretty_assertions::assert_eq;

    #[test]
    fn build_args_in_flag_order() {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = BuildBundle::from_samples(tmp.path(), &sample_backup_configs()).unwrap();
        let args = bundle.args();
        let flags: Vec<&str> = args.iter().step_by(2).map(String::as_str).collect();
        assert_eq!(flags, ["-b", "-r", "-s", "-a"]);
        assert!(args[1].ends_with("test_config_build.yaml"));
        assert!(args[7].ends_with("test_config_hwdb.yaml"));
    }

    #[test]
    fn run_args_in_flag_order() {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = RunBundle::from_samples(tmp.path(), &sample_backup_configs()).unwrap();
        let args = bundle.args();
        assert_eq!(args[0], "-a");
        assert_eq!(args[2], "-c");
        assert!(args[3].ends_with("test_config_runtime.yaml"));
    }

    #[test]
    fn write_dumps_every_member() {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = BuildBundle::from_samples(tmp.path(), &sample_backup_configs()).unwrap();
        bundle.write().unwrap();
        for (_, doc) in bundle.members() {
            assert!(doc.path().is_file(), "{} not written", doc.path().display());
        }
    }

    #[test]
    fn cmdline_quotes_paths_with_spaces() {
        let tmp = tempfile::tempdir().unwrap();
        let spaced = tmp.path().join("with space");
        std::fs::create_dir(&spaced).unwrap();
        let bundle = RunBundle::from_samples(&spaced, &sample_backup_configs()).unwrap();
        let cmdline = bundle.cmdline().unwrap();
        assert_eq!(shlex::split(&cmdline).unwrap(), bundle.args());
    }
}
