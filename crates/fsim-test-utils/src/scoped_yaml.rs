//! Scoped YAML documents
//!
//! A [`ScopedYamlDocument`] is one sample config copied into a per-test
//! directory. Tests edit [`ScopedYamlDocument::data`] in memory, or replace it
//! wholesale from a string, then [`dump`](ScopedYamlDocument::dump) it before
//! the manager reads the file. No structural validation happens here.

use std::io::Read;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::error::FixtureError;

static SAMPLE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^sample_").expect("static pattern"));

/// Name a sample is materialized under: `sample_*` becomes `test_*`
///
/// # Errors
/// Returns [`FixtureError::NamingConvention`] unless the prefix is replaced exactly once
pub fn test_file_name(sample_name: &str) -> Result<String, FixtureError> {
    let prefix = &*SAMPLE_PREFIX;
    if prefix.find_iter(sample_name).count() != 1 {
        return Err(FixtureError::NamingConvention {
            name: sample_name.to_string(),
        });
    }
    Ok(prefix.replacen(sample_name, 1, "test_").into_owned())
}

/// One sample config materialized into a temporary directory
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedYamlDocument {
    source: PathBuf,
    path: PathBuf,
    /// In-memory content, written out by [`dump`](Self::dump)
    pub data: Value,
}

impl ScopedYamlDocument {
    /// Copy `sample` into `tmp_dir` under its `test_*` name
    ///
    /// The file itself is not written until [`dump`](Self::dump).
    ///
    /// # Errors
    /// Returns error if the name breaks the naming convention or the sample
    /// cannot be read and parsed
    pub fn materialize(tmp_dir: &Path, sample: &Path) -> Result<Self, FixtureError> {
        let name = sample
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = tmp_dir.join(test_file_name(&name)?);
        let file = std::fs::File::open(sample).map_err(|e| FixtureError::io(sample, e))?;
        let mut doc = Self {
            source: sample.to_path_buf(),
            path,
            data: Value::Null,
        };
        doc.load(file)?;
        Ok(doc)
    }

    /// Replace the content by parsing YAML text
    ///
    /// # Errors
    /// Returns error if `text` is not valid YAML
    pub fn load_str(&mut self, text: &str) -> Result<(), FixtureError> {
        self.data = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_yaml::from_str(text)?
        };
        Ok(())
    }

    /// Replace the content by parsing a YAML stream
    ///
    /// # Errors
    /// Returns error if the stream cannot be read or is not valid YAML
    pub fn load(&mut self, mut reader: impl Read) -> Result<(), FixtureError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| FixtureError::io(&self.source, e))?;
        self.load_str(&text)
    }

    /// Write the in-memory content to the materialized path
    ///
    /// # Errors
    /// Returns error if serialization or the write fails
    pub fn dump(&self) -> Result<(), FixtureError> {
        let text = serde_yaml::to_string(&self.data)?;
        std::fs::write(&self.path, text).map_err(|e| FixtureError::io(&self.path, e))
    }

    /// Set a nested key, creating intermediate mappings as needed
    ///
    /// # Errors
    /// Returns error if an intermediate node exists but is not a mapping
    pub fn set_path(&mut self, keys: &[&str], value: Value) -> Result<(), FixtureError> {
        let Some((last, parents)) = keys.split_last() else {
            self.data = value;
            return Ok(());
        };
        let mut node = &mut self.data;
        let mut walked = Vec::with_capacity(parents.len());
        for key in parents {
            if node.is_null() {
                *node = Value::Mapping(Mapping::new());
            }
            let Some(map) = node.as_mapping_mut() else {
                return Err(FixtureError::NotAMapping { path: walked.join(".") });
            };
            walked.push(*key);
            node = map.entry(Value::from(*key)).or_insert(Value::Null);
        }
        if node.is_null() {
            *node = Value::Mapping(Mapping::new());
        }
        let Some(map) = node.as_mapping_mut() else {
            return Err(FixtureError::NotAMapping { path: walked.join(".") });
        };
        map.insert(Value::from(*last), value);
        Ok(())
    }

    /// Materialized file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sample the document was created from
    #[inline]
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn rename_rule() {
        assert_eq!(test_file_name("sample_config_build.yaml").unwrap(), "test_config_build.yaml");
        assert_eq!(test_file_name("sample_sample_x.yaml").unwrap(), "test_sample_x.yaml");
        assert!(matches!(
            test_file_name("config_build.yaml"),
            Err(FixtureError::NamingConvention { .. })
        ));
        assert!(test_file_name("my_sample_config.yaml").is_err());
    }

    proptest! {
        #[test]
        fn rename_is_total_over_sample_names(suffix in "[a-z_.]{0,24}") {
            let name = format!("sample_{suffix}");
            let renamed = test_file_name(&name).unwrap();
            prop_assert_eq!(renamed, format!("test_{suffix}"));
        }

        #[test]
        fn names_without_prefix_rejected(name in "[a-rt-z][a-z_.]{0,24}") {
            prop_assert!(test_file_name(&name).is_err());
        }
    }

    #[test]
    fn materialize_load_dump() {
        let samples = tempfile::tempdir().unwrap();
        let sample = samples.path().join("sample_thing.yaml");
        std::fs::write(&sample, "a:\n  b: 1\n").unwrap();
        let tmp = tempfile::tempdir().unwrap();

        let mut doc = ScopedYamlDocument::materialize(tmp.path(), &sample).unwrap();
        assert_eq!(doc.path(), tmp.path().join("test_thing.yaml"));
        assert_eq!(doc.source(), sample);
        assert_eq!(doc.data["a"]["b"], Value::from(1));
        assert!(!doc.path().exists());

        doc.set_path(&["a", "c", "d"], Value::from("x")).unwrap();
        doc.dump().unwrap();
        let written: Value = serde_yaml::from_str(&std::fs::read_to_string(doc.path()).unwrap()).unwrap();
        assert_eq!(written["a"]["c"]["d"], Value::from("x"));

        doc.load_str("builds:\n").unwrap();
        assert_eq!(doc.data["builds"], Value::Null);
    }

    #[test]
    fn set_path_through_scalar_fails() {
        let mut doc = ScopedYamlDocument {
            source: PathBuf::from("sample_x.yaml"),
            path: PathBuf::from("test_x.yaml"),
            data: serde_yaml::from_str("a: 1\n").unwrap(),
        };
        let err = doc.set_path(&["a", "b"], Value::Null).unwrap_err();
        assert!(matches!(err, FixtureError::NotAMapping { ref path } if path == "a"));
    }
}
