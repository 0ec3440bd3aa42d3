use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

use serde::Serialize;

/// Nested configuration map used for algorithm option templates.
pub type ConfigMap = BTreeMap<String, ConfigValue>;

/// A single configuration value.
///
/// Configuration trees are built from scalars and nested maps. Algorithm
/// classes declare a default template (see e.g. `SolverParams::defaults`),
/// and the keys of that template double as the set of allowed keys: merging
/// or setting a key that the template does not declare fails with
/// [`ConfigError::UnknownKey`] rather than being silently ignored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Map(ConfigMap),
    /// Explicitly unset value (e.g. a rho that should fall back to a
    /// problem-specific heuristic).
    None,
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        match self {
            ConfigValue::Int(i) if *i >= 0 => Some(*i as usize),
            _ => None,
        }
    }

    /// Numeric accessor; integer values coerce to float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ConfigMap> {
        match self {
            ConfigValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ConfigValue::None)
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        ConfigValue::Int(v)
    }
}

impl From<usize> for ConfigValue {
    fn from(v: usize) -> Self {
        ConfigValue::Int(v as i64)
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        ConfigValue::Float(v)
    }
}

impl From<f32> for ConfigValue {
    fn from(v: f32) -> Self {
        ConfigValue::Float(v as f64)
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::Str(v.to_string())
    }
}

impl From<ConfigMap> for ConfigValue {
    fn from(v: ConfigMap) -> Self {
        ConfigValue::Map(v)
    }
}

/// Builds a [`ConfigMap`] from (key, value) pairs.
///
/// # Example
///
/// ```rust
/// use sparsedl_core::config::{map, ConfigValue};
///
/// let overrides = map([
///     ("Verbose", true.into()),
///     ("MaxMainIter", 20usize.into()),
/// ]);
/// assert_eq!(overrides["Verbose"], ConfigValue::Bool(true));
/// ```
pub fn map<'a, I>(entries: I) -> ConfigMap
where
    I: IntoIterator<Item = (&'a str, ConfigValue)>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Error raised for invalid configuration access or construction.
///
/// Raised eagerly at configuration-construction time (or on the offending
/// `get`/`set` call), never deferred to solve time.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A key was referenced that the option template does not declare.
    UnknownKey { path: String },
    /// A value had the wrong type for the requested access.
    TypeMismatch {
        path: String,
        expected: &'static str,
    },
    /// A path component traversed through a non-map value.
    NotAMap { path: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::UnknownKey { path } => {
                write!(f, "unknown configuration key '{}'", path)
            }
            ConfigError::TypeMismatch { path, expected } => {
                write!(
                    f,
                    "configuration key '{}' does not hold a {} value",
                    path, expected
                )
            }
            ConfigError::NotAMap { path } => {
                write!(f, "configuration key '{}' is not a nested map", path)
            }
        }
    }
}

impl Error for ConfigError {}

/// Validated, nested key-value configuration container.
///
/// A `ConfigDict` is constructed by deep-merging caller overrides onto a
/// default template declared by the algorithm class. Every override key is
/// validated along its nested path against the template, so a typo like
/// `MaxManIter` fails immediately instead of leaving the default silently in
/// place. After construction the merged tree contains every declared key,
/// and `get`/`set` validate against it in the same way.
///
/// # Example
///
/// ```rust
/// use sparsedl_core::config::{map, ConfigDict};
///
/// let defaults = map([("Verbose", false.into()), ("MaxMainIter", 1000usize.into())]);
/// let opt = ConfigDict::new(defaults, map([("Verbose", true.into())])).unwrap();
/// assert_eq!(opt.bool(&["Verbose"]).unwrap(), true);
/// assert!(opt.get(&["NoSuchKey"]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigDict {
    values: ConfigMap,
}

impl ConfigDict {
    /// Builds a configuration by merging `overrides` onto `defaults`.
    pub fn new(defaults: ConfigMap, overrides: ConfigMap) -> Result<Self, ConfigError> {
        let mut values = defaults;
        merge_map(&mut values, overrides, &mut Vec::new())?;
        Ok(ConfigDict { values })
    }

    /// Builds a configuration holding the defaults unchanged.
    pub fn from_defaults(defaults: ConfigMap) -> Self {
        ConfigDict { values: defaults }
    }

    /// Navigates nested maps by key sequence.
    pub fn get(&self, path: &[&str]) -> Result<&ConfigValue, ConfigError> {
        let mut current = &self.values;
        for (i, key) in path.iter().enumerate() {
            let value = current
                .get(*key)
                .ok_or_else(|| ConfigError::UnknownKey {
                    path: path[..=i].join("."),
                })?;
            if i + 1 == path.len() {
                return Ok(value);
            }
            current = value.as_map().ok_or_else(|| ConfigError::NotAMap {
                path: path[..=i].join("."),
            })?;
        }
        Err(ConfigError::UnknownKey {
            path: String::new(),
        })
    }

    /// Sets the value at a nested key path. The key must already be declared
    /// by the template; assigning a map to a map key merges recursively with
    /// the same validation as construction.
    pub fn set(&mut self, path: &[&str], value: ConfigValue) -> Result<(), ConfigError> {
        if path.is_empty() {
            return Err(ConfigError::UnknownKey {
                path: String::new(),
            });
        }
        let mut current = &mut self.values;
        for (i, key) in path.iter().enumerate() {
            if !current.contains_key(*key) {
                return Err(ConfigError::UnknownKey {
                    path: path[..=i].join("."),
                });
            }
            if i + 1 == path.len() {
                let slot = current.get_mut(*key).unwrap();
                match (slot, value) {
                    (ConfigValue::Map(existing), ConfigValue::Map(overrides)) => {
                        let mut prefix: Vec<String> =
                            path.iter().map(|s| s.to_string()).collect();
                        return merge_map(existing, overrides, &mut prefix);
                    }
                    (slot, value) => {
                        *slot = value;
                        return Ok(());
                    }
                }
            }
            current = match current.get_mut(*key).unwrap() {
                ConfigValue::Map(m) => m,
                _ => {
                    return Err(ConfigError::NotAMap {
                        path: path[..=i].join("."),
                    });
                }
            };
        }
        unreachable!()
    }

    /// Extracts a nested sub-configuration (e.g. the `BPDN` options inside a
    /// dictionary learning option set) as its own `ConfigDict`.
    pub fn sub(&self, path: &[&str]) -> Result<ConfigDict, ConfigError> {
        let value = self.get(path)?;
        let m = value.as_map().ok_or_else(|| ConfigError::NotAMap {
            path: path.join("."),
        })?;
        Ok(ConfigDict { values: m.clone() })
    }

    /// Consumes the configuration, returning its fully merged value tree.
    /// Useful for embedding a validated option set as a sub-map of a larger
    /// default tree.
    pub fn into_map(self) -> ConfigMap {
        self.values
    }

    pub fn bool(&self, path: &[&str]) -> Result<bool, ConfigError> {
        self.get(path)?
            .as_bool()
            .ok_or_else(|| ConfigError::TypeMismatch {
                path: path.join("."),
                expected: "boolean",
            })
    }

    pub fn usize(&self, path: &[&str]) -> Result<usize, ConfigError> {
        self.get(path)?
            .as_usize()
            .ok_or_else(|| ConfigError::TypeMismatch {
                path: path.join("."),
                expected: "non-negative integer",
            })
    }

    pub fn float(&self, path: &[&str]) -> Result<f64, ConfigError> {
        self.get(path)?
            .as_float()
            .ok_or_else(|| ConfigError::TypeMismatch {
                path: path.join("."),
                expected: "numeric",
            })
    }

    /// Numeric accessor for keys that may be explicitly unset.
    pub fn float_opt(&self, path: &[&str]) -> Result<Option<f64>, ConfigError> {
        let value = self.get(path)?;
        if value.is_none() {
            return Ok(None);
        }
        value
            .as_float()
            .map(Some)
            .ok_or_else(|| ConfigError::TypeMismatch {
                path: path.join("."),
                expected: "numeric",
            })
    }
}

fn merge_map(
    template: &mut ConfigMap,
    overrides: ConfigMap,
    path: &mut Vec<String>,
) -> Result<(), ConfigError> {
    for (key, value) in overrides {
        path.push(key.clone());
        match template.get_mut(&key) {
            None => {
                return Err(ConfigError::UnknownKey {
                    path: path.join("."),
                });
            }
            Some(ConfigValue::Map(existing)) => match value {
                ConfigValue::Map(nested) => merge_map(existing, nested, path)?,
                _ => {
                    return Err(ConfigError::TypeMismatch {
                        path: path.join("."),
                        expected: "nested map",
                    });
                }
            },
            Some(slot) => {
                *slot = value;
            }
        }
        path.pop();
    }
    Ok(())
}
