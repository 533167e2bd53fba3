//! The format-agnostic configuration tree.
//!
//! Every front end (YAML, TOML, JSON) converts its native document into a
//! [`ConfigValue`] so that merging and substitution never care which format a
//! file was written in.

use indexmap::IndexMap;

use super::error::ParseError;

/// Keyed children of a [`ConfigValue::Mapping`], in document order.
pub type Mapping = IndexMap<String, ConfigValue>;

/// A parsed configuration value: a mapping, a sequence or a scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<ConfigValue>),
    Mapping(Mapping),
}

impl Default for ConfigValue {
    fn default() -> Self {
        Self::empty_mapping()
    }
}

impl ConfigValue {
    pub fn empty_mapping() -> Self {
        Self::Mapping(Mapping::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ConfigValue]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the child stored under `key` when this value is a mapping.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Looks up a dotted path such as `database.port`.
    ///
    /// Only mapping keys are traversed; sequence indices are not supported.
    pub fn get_path(&self, path: &str) -> Option<&ConfigValue> {
        path.split('.').try_fold(self, |current, part| current.get(part))
    }

    /// Converts a parsed YAML document.
    ///
    /// Scalar mapping keys are stringified the way they would print; keys
    /// that are themselves collections cannot be represented and are rejected.
    pub fn from_yaml(value: serde_yaml::Value) -> Result<Self, ParseError> {
        use serde_yaml::Value as Yaml;

        Ok(match value {
            Yaml::Null => Self::Null,
            Yaml::Bool(b) => Self::Boolean(b),
            Yaml::Number(n) => yaml_number(&n),
            Yaml::String(s) => Self::String(s),
            Yaml::Sequence(items) => Self::Sequence(
                items
                    .into_iter()
                    .map(Self::from_yaml)
                    .collect::<Result<_, _>>()?,
            ),
            Yaml::Mapping(entries) => {
                let mut map = Mapping::new();
                for (key, value) in entries {
                    map.insert(yaml_key(key)?, Self::from_yaml(value)?);
                }
                Self::Mapping(map)
            }
            Yaml::Tagged(tagged) => Self::from_yaml(tagged.value)?,
        })
    }

    /// Converts a parsed TOML value. Datetimes become strings.
    pub fn from_toml(value: toml::Value) -> Self {
        use toml::Value as Toml;

        match value {
            Toml::String(s) => Self::String(s),
            Toml::Integer(i) => Self::Integer(i),
            Toml::Float(f) => Self::Float(f),
            Toml::Boolean(b) => Self::Boolean(b),
            Toml::Datetime(dt) => Self::String(dt.to_string()),
            Toml::Array(items) => Self::Sequence(items.into_iter().map(Self::from_toml).collect()),
            Toml::Table(table) => Self::Mapping(
                table
                    .into_iter()
                    .map(|(key, value)| (key, Self::from_toml(value)))
                    .collect(),
            ),
        }
    }

    /// Converts a parsed JSON value.
    ///
    /// Integers outside the `i64` range are kept as their decimal text.
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Boolean(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else if n.is_u64() {
                    Self::String(n.to_string())
                } else {
                    n.as_f64().map_or(Self::Null, Self::Float)
                }
            }
            Json::String(s) => Self::String(s),
            Json::Array(items) => Self::Sequence(items.into_iter().map(Self::from_json).collect()),
            Json::Object(entries) => Self::Mapping(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Self::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Renders the tree as JSON. Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Sequence(items) => items.iter().map(Self::to_json).collect(),
            Self::Mapping(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

fn yaml_number(n: &serde_yaml::Number) -> ConfigValue {
    if let Some(i) = n.as_i64() {
        ConfigValue::Integer(i)
    } else if n.is_u64() {
        ConfigValue::String(n.to_string())
    } else {
        n.as_f64().map_or(ConfigValue::Null, ConfigValue::Float)
    }
}

fn yaml_key(key: serde_yaml::Value) -> Result<String, ParseError> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Null => Ok("null".to_string()),
        Yaml::Tagged(tagged) => yaml_key(tagged.value),
        Yaml::Sequence(_) | Yaml::Mapping(_) => Err(ParseError::Structure(
            "mapping keys must be scalars".to_string(),
        )),
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for ConfigValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Vec<ConfigValue>> for ConfigValue {
    fn from(items: Vec<ConfigValue>) -> Self {
        Self::Sequence(items)
    }
}

impl From<Mapping> for ConfigValue {
    fn from(map: Mapping) -> Self {
        Self::Mapping(map)
    }
}
