//! Path-aware access into a parsed YAML document
//!
//! [`Node`] pairs a borrowed [`Value`] with its dotted location so every
//! accessor can report exactly where a document went wrong.

use serde_yaml::{Mapping, Value};

use crate::error::ConfigError;

/// YAML type name used in error messages
#[must_use]
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// Location label of a document's top level
pub const ROOT_PATH: &str = "top level";

/// Borrowed YAML node with its location
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    path: &'a str,
    value: &'a Value,
    is_root: bool,
}

/// Child node; owns its path since the path is built on lookup
#[derive(Debug, Clone)]
pub struct Child<'a> {
    path: String,
    value: &'a Value,
}

impl<'a> Child<'a> {
    /// Borrow as a [`Node`]
    #[inline]
    #[must_use]
    pub fn node(&self) -> Node<'_> {
        Node {
            path: &self.path,
            value: self.value,
            is_root: false,
        }
    }

    /// Dotted location
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Underlying value
    #[inline]
    #[must_use]
    pub fn value(&self) -> &'a Value {
        self.value
    }
}

impl<'a> Node<'a> {
    /// Top level of a document
    #[inline]
    #[must_use]
    pub fn root(value: &'a Value) -> Self {
        Self {
            path: ROOT_PATH,
            value,
            is_root: true,
        }
    }

    fn child_path(&self, key: &str) -> String {
        if self.is_root {
            key.to_string()
        } else {
            format!("{}.{key}", self.path)
        }
    }

    /// Dotted location
    #[inline]
    #[must_use]
    pub fn path(&self) -> &'a str {
        self.path
    }

    /// Underlying value
    #[inline]
    #[must_use]
    pub fn value(&self) -> &'a Value {
        self.value
    }

    /// Whether this node is null
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    fn mismatch(&self, expected: &'static str) -> ConfigError {
        ConfigError::TypeMismatch {
            path: self.path.to_string(),
            expected,
            found: type_name(self.value),
        }
    }

    /// View as a mapping, for key lookups
    ///
    /// # Errors
    /// Null yields [`ConfigError::NotSubscriptable`], other non-mappings a type mismatch
    pub fn mapping(&self) -> Result<&'a Mapping, ConfigError> {
        match self.value {
            Value::Mapping(map) => Ok(map),
            Value::Null => Err(ConfigError::NotSubscriptable {
                path: self.path.to_string(),
                found: "null",
            }),
            _ => Err(self.mismatch("mapping")),
        }
    }

    /// Optional child by key
    ///
    /// # Errors
    /// Returns error if this node is not a mapping
    pub fn get_opt(&self, key: &str) -> Result<Option<Child<'a>>, ConfigError> {
        let map = self.mapping()?;
        Ok(map.get(key).map(|value| Child {
            path: self.child_path(key),
            value,
        }))
    }

    /// Required child by key
    ///
    /// # Errors
    /// Returns error if this node is not a mapping or the key is absent
    pub fn get(&self, key: &str) -> Result<Child<'a>, ConfigError> {
        self.get_opt(key)?.ok_or_else(|| ConfigError::MissingKey {
            path: self.path.to_string(),
            key: key.to_string(),
        })
    }

    /// Iterate a sequence
    ///
    /// # Errors
    /// Null yields [`ConfigError::NotIterable`], other non-sequences a type mismatch
    pub fn sequence(&self) -> Result<Vec<Child<'a>>, ConfigError> {
        match self.value {
            Value::Sequence(items) => Ok(items
                .iter()
                .enumerate()
                .map(|(i, value)| Child {
                    path: format!("{}[{i}]", self.path),
                    value,
                })
                .collect()),
            Value::Null => Err(ConfigError::NotIterable {
                path: self.path.to_string(),
                found: "null",
            }),
            _ => Err(self.mismatch("sequence")),
        }
    }

    /// Iterate mapping entries with string keys, in document order
    ///
    /// # Errors
    /// Returns error if this node is not a mapping or a key is not a string
    pub fn entries(&self) -> Result<Vec<(&'a str, Child<'a>)>, ConfigError> {
        let map = match self.value {
            Value::Mapping(map) => map,
            Value::Null => {
                return Err(ConfigError::NotIterable {
                    path: self.path.to_string(),
                    found: "null",
                })
            }
            _ => return Err(self.mismatch("mapping")),
        };
        map.iter()
            .map(|(key, value)| -> Result<(&'a str, Child<'a>), ConfigError> {
                let name = key.as_str().ok_or_else(|| ConfigError::TypeMismatch {
                    path: format!("{}.<key>", self.path),
                    expected: "string",
                    found: type_name(key),
                })?;
                Ok((
                    name,
                    Child {
                        path: self.child_path(name),
                        value,
                    },
                ))
            })
            .collect()
    }

    /// String scalar
    ///
    /// # Errors
    /// Returns error if this node is not a string
    pub fn str(&self) -> Result<&'a str, ConfigError> {
        self.value.as_str().ok_or_else(|| self.mismatch("string"))
    }

    /// Nullable string scalar
    ///
    /// # Errors
    /// Returns error if this node is neither null nor a string
    pub fn opt_str(&self) -> Result<Option<&'a str>, ConfigError> {
        if self.is_null() {
            Ok(None)
        } else {
            self.str().map(Some)
        }
    }

    /// Boolean scalar
    ///
    /// # Errors
    /// Returns error if this node is not a bool
    pub fn bool(&self) -> Result<bool, ConfigError> {
        self.value.as_bool().ok_or_else(|| self.mismatch("bool"))
    }

    /// Integer scalar
    ///
    /// # Errors
    /// Returns error if this node is not an integer
    pub fn i64(&self) -> Result<i64, ConfigError> {
        self.value.as_i64().ok_or_else(|| self.mismatch("integer"))
    }

    /// Non-negative integer scalar
    ///
    /// # Errors
    /// Returns error if this node is not an integer or is negative
    pub fn u64(&self) -> Result<u64, ConfigError> {
        let n = self.i64()?;
        u64::try_from(n).map_err(|_| ConfigError::invalid(self.path, n.to_string(), "must not be negative"))
    }

    /// Scalar rendered as text, for values that may be written as numbers or strings
    ///
    /// # Errors
    /// Returns error if this node is not a string or number
    pub fn scalar_text(&self) -> Result<String, ConfigError> {
        match self.value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(self.mismatch("string or number")),
        }
    }
}
