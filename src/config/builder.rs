use std::fmt;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use super::env::EnvSource;
use super::merge::merge_at_path;
use super::resolve::{EnvLookup, ProcessEnv};
use super::source::{ConfigSource, FileSource};
use super::value::ConfigValue;
use super::ConfigError;

/// Builder for loading configuration from several sources.
///
/// Sources are merged in registration order, with later sources overriding
/// earlier ones. Mappings merge recursively and sequences are concatenated;
/// any other value is replaced.
///
/// ## Environment References
///
/// String values in files may reference environment variables:
///
/// ```yaml
/// database:
///   host: "${DB_HOST}"
///   port: "${DB_PORT:-5432}"
///   url: "postgres://${DB_HOST}:${DB_PORT:-5432}/app"
/// ```
///
/// `port` becomes the integer `5432` when `DB_PORT` is unset, because the
/// whole value is a single reference. `url` stays a string.
///
/// ## Example
///
/// ```no_run
/// use serde::Deserialize;
/// use settings_sources::Config;
///
/// #[derive(Deserialize)]
/// struct MyConfig {
///     name: String,
///     port: u16,
/// }
///
/// let config: MyConfig = Config::builder()
///     .with_yaml("config/")
///     .with_toml("config/local.toml")
///     .build()?;
/// # Ok::<(), settings_sources::ConfigError>(())
/// ```
#[must_use = "builders do nothing until .build() is called"]
pub struct Config {
    sources: Vec<Box<dyn ConfigSource>>,
    lookup: Box<dyn EnvLookup + Send + Sync>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            lookup: Box::new(ProcessEnv),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("sources", &self.sources)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Creates a new configuration builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Adds a YAML file, or a directory of `.yaml`/`.yml` files.
    pub fn with_yaml(self, path: impl AsRef<Path>) -> Self {
        self.with_source(FileSource::yaml(path))
    }

    /// Adds a TOML file, or a directory of `.toml` files.
    pub fn with_toml(self, path: impl AsRef<Path>) -> Self {
        self.with_source(FileSource::toml(path))
    }

    /// Adds a JSON file, or a directory of `.json` files.
    pub fn with_json(self, path: impl AsRef<Path>) -> Self {
        self.with_source(FileSource::json(path))
    }

    /// Overlays environment variables with the given prefix.
    ///
    /// With prefix `MYAPP` and separator `__`, `MYAPP__DATABASE__PORT=5432`
    /// sets `database.port` to the integer `5432`. Like every source it is
    /// applied in registration order:
    ///
    /// ```no_run
    /// # use settings_sources::Config;
    /// # use serde::Deserialize;
    /// # #[derive(Deserialize)] struct MyConfig { }
    /// // defaults -> env overrides -> local file overrides env
    /// let config: MyConfig = Config::builder()
    ///     .with_toml("config/default.toml")
    ///     .with_env("MYAPP", "__")
    ///     .with_toml("config/local.toml")
    ///     .build()?;
    /// # Ok::<(), settings_sources::ConfigError>(())
    /// ```
    pub fn with_env(self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.with_source(EnvSource::new(prefix, separator))
    }

    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Replaces the process environment for `${...}` references and for
    /// [`with_env`](Self::with_env) overlays.
    pub fn with_lookup(mut self, lookup: impl EnvLookup + Send + Sync + 'static) -> Self {
        self.lookup = Box::new(lookup);
        self
    }

    /// Loads and merges every source into one tree.
    pub fn build_value(self) -> Result<ConfigValue, ConfigError> {
        let mut merged = ConfigValue::empty_mapping();

        for source in &self.sources {
            let entries = source.entries(self.lookup.as_ref())?;
            debug!(source = ?source, entries = entries.len(), "applying config source");
            for entry in entries {
                merge_at_path(&mut merged, &entry.path, entry.value);
            }
        }

        Ok(merged)
    }

    /// Builds the configuration and deserializes it into `T`.
    pub fn build<T: DeserializeOwned>(self) -> Result<T, ConfigError> {
        let value = self.build_value()?;
        serde_json::from_value(value.to_json()).map_err(ConfigError::Deserialize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Debug, Deserialize)]
    struct Database {
        host: String,
        port: u16,
        tags: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    struct AppConfig {
        database: Database,
        debug: bool,
    }

    #[test]
    fn test_sources_merge_in_order() {
        let dir = TempDir::new().unwrap();
        let yaml = dir.path().join("base.yaml");
        let toml = dir.path().join("local.toml");
        fs::write(
            &yaml,
            "database:\n  host: ${DB_HOST}\n  port: ${DB_PORT:-5432}\n  tags: [base]\ndebug: false\n",
        )
        .unwrap();
        fs::write(&toml, "debug = true\n[database]\ntags = [\"local\"]\n").unwrap();

        let lookup: HashMap<String, String> =
            HashMap::from([("DB_HOST".to_string(), "db.internal".to_string())]);

        let config: AppConfig = Config::builder()
            .with_yaml(&yaml)
            .with_toml(&toml)
            .with_lookup(lookup)
            .build()
            .unwrap();

        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.tags, vec!["base", "local"]);
        assert!(config.debug);
    }

    #[test]
    fn test_missing_sources_build_empty() {
        let value = Config::builder()
            .with_yaml("/nonexistent/config.yaml")
            .build_value()
            .unwrap();
        assert_eq!(value, ConfigValue::empty_mapping());
    }

    #[test]
    fn test_missing_var_propagates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "host: ${SETTINGS_SOURCES_BUILDER_UNSET}\n").unwrap();

        let result = Config::builder()
            .with_yaml(&path)
            .with_lookup(HashMap::new())
            .build_value();
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn test_deserialize_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "debug = \"not a bool\"\n").unwrap();

        let result = Config::builder().with_toml(&path).build::<AppConfig>();
        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn test_env_overlay_between_files() {
        let lookup: HashMap<String, String> = HashMap::from([(
            "SSBUILDERTEST__DATABASE__PORT".to_string(),
            "6000".to_string(),
        )]);

        let dir = TempDir::new().unwrap();
        let base = dir.path().join("base.toml");
        fs::write(
            &base,
            "debug = false\n[database]\nhost = \"h\"\nport = 1\ntags = []\n",
        )
        .unwrap();

        let config: AppConfig = Config::builder()
            .with_toml(&base)
            .with_env("SSBUILDERTEST", "__")
            .with_lookup(lookup)
            .build()
            .unwrap();
        assert_eq!(config.database.port, 6000);
    }
}
