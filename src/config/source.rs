use std::fmt;
use std::path::{Path, PathBuf};

use super::file::TreeLoader;
use super::format::{FileEncoding, FileFormat, Json, Toml, Yaml};
use super::resolve::{EnvLookup, ProcessEnv, Resolver};
use super::value::ConfigValue;
use super::ConfigError;

/// A value contributed by a source, placed at `path` in the merged tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigEntry {
    pub path: Vec<String>,
    pub value: ConfigValue,
}

impl ConfigEntry {
    pub fn root(value: ConfigValue) -> Self {
        Self {
            path: Vec::new(),
            value,
        }
    }

    pub fn at_path(path: Vec<String>, value: ConfigValue) -> Self {
        Self { path, value }
    }
}

/// Anything that contributes configuration values to a [`Config`](super::Config).
///
/// `lookup` is used to resolve `${...}` references, for sources that have them.
pub trait ConfigSource: Send + Sync + fmt::Debug {
    fn entries(&self, lookup: &dyn EnvLookup) -> Result<Vec<ConfigEntry>, ConfigError>;
}

/// A file or directory of files in one format, with environment references
/// resolved after merging.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    loader: TreeLoader,
    structured_values: bool,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>, format: impl FileFormat + 'static) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            loader: TreeLoader::new(format),
            structured_values: false,
        }
    }

    /// YAML source matching `.yaml` and `.yml` files.
    pub fn yaml(path: impl AsRef<Path>) -> Self {
        Self::new(path, Yaml)
    }

    /// TOML source matching `.toml` files.
    pub fn toml(path: impl AsRef<Path>) -> Self {
        Self::new(path, Toml)
    }

    /// JSON source matching `.json` files.
    pub fn json(path: impl AsRef<Path>) -> Self {
        Self::new(path, Json)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn encoding(mut self, encoding: FileEncoding) -> Self {
        self.loader = self.loader.encoding(encoding);
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.loader = self.loader.extensions(extensions);
        self
    }

    /// See [`Resolver::structured_values`].
    pub fn structured_values(mut self, enabled: bool) -> Self {
        self.structured_values = enabled;
        self
    }

    /// Loads, merges and resolves against the process environment.
    pub fn load(&self) -> Result<ConfigValue, ConfigError> {
        self.load_with(&ProcessEnv)
    }

    /// Loads, merges and resolves against `lookup`.
    ///
    /// Parsing failures and missing variables are returned as
    /// [`ConfigError::FileParsing`] and [`ConfigError::MissingEnvVar`]
    /// respectively, regardless of format.
    pub fn load_with(&self, lookup: &dyn EnvLookup) -> Result<ConfigValue, ConfigError> {
        let tree = self.loader.load(&self.path)?;
        Resolver::new(lookup)
            .structured_values(self.structured_values)
            .resolve(tree)
    }
}

impl ConfigSource for FileSource {
    fn entries(&self, lookup: &dyn EnvLookup) -> Result<Vec<ConfigEntry>, ConfigError> {
        Ok(vec![ConfigEntry::root(self.load_with(lookup)?)])
    }
}
