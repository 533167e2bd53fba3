//! Loading a configuration tree from a file or a directory of files.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use walkdir::WalkDir;

use super::format::{parse_file, FileEncoding, FileFormat};
use super::merge::deep_merge;
use super::value::ConfigValue;
use super::ConfigError;

/// Loads a single file, or merges every matching file below a directory.
///
/// Directory contents are visited files first, each directory sorted by
/// name, then subdirectories depth-first in name order. Later files win
/// over earlier ones on conflicting keys.
#[derive(Debug, Clone)]
pub struct TreeLoader {
    format: Arc<dyn FileFormat>,
    extensions: Vec<String>,
    encoding: FileEncoding,
}

impl TreeLoader {
    /// Creates a loader using the format's default file extensions.
    pub fn new(format: impl FileFormat + 'static) -> Self {
        let extensions = format.extensions().iter().map(|ext| ext.to_string()).collect();
        Self {
            format: Arc::new(format),
            extensions,
            encoding: FileEncoding::default(),
        }
    }

    /// Replaces the suffixes a file name must end with (case-sensitive) to
    /// be picked up during a directory load.
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn encoding(mut self, encoding: FileEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Loads `path` into one tree.
    ///
    /// A path that is neither a file nor a directory yields an empty mapping.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<ConfigValue, ConfigError> {
        let path = path.as_ref();

        if path.is_dir() {
            let files = self.discover(path)?;
            let mut merged = ConfigValue::empty_mapping();
            for file in &files {
                deep_merge(&mut merged, self.load_file(file)?);
            }
            debug!(
                path = %path.display(),
                format = self.format.name(),
                files = files.len(),
                "merged config directory"
            );
            Ok(merged)
        } else if path.is_file() {
            self.load_file(path)
        } else {
            debug!(path = %path.display(), "config path does not exist, nothing to load");
            Ok(ConfigValue::empty_mapping())
        }
    }

    /// Lists the files a directory load would merge, in merge order.
    pub fn discover(&self, dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
        let walker = WalkDir::new(dir).follow_links(false).sort_by(|a, b| {
            a.file_type()
                .is_dir()
                .cmp(&b.file_type().is_dir())
                .then_with(|| a.file_name().cmp(b.file_name()))
        });

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf);
                ConfigError::parsing(path, io::Error::from(e))
            })?;

            if entry.file_type().is_dir() || !entry.path().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if self.extensions.iter().any(|ext| name.ends_with(ext.as_str())) {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    fn load_file(&self, path: &Path) -> Result<ConfigValue, ConfigError> {
        let value = parse_file(path, self.format.as_ref(), self.encoding)
            .map_err(|e| ConfigError::parsing(path, e))?;
        debug!(path = %path.display(), format = self.format.name(), "loaded config file");

        Ok(if value.is_null() {
            ConfigValue::empty_mapping()
        } else {
            value
        })
    }
}
