use super::coerce::infer_scalar;
use super::resolve::EnvLookup;
use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;

/// Overlays environment variables named `PREFIX<sep>PATH<sep>...`.
///
/// Variables are read through the builder's [`EnvLookup`], the process
/// environment unless replaced.
///
/// The remainder after the prefix is split on the separator and lower-cased
/// to form the config path; values are typed with natural-type inference.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
    separator: String,
}

impl EnvSource {
    pub fn new(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        assert!(!separator.is_empty(), "separator must not be empty");
        Self {
            prefix: prefix.into(),
            separator,
        }
    }

    /// Builds entries from an explicit list of variables.
    pub fn entries_from<I, K, V>(&self, vars: I) -> Vec<ConfigEntry>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let prefix_with_sep = format!("{}{}", self.prefix, self.separator);
        let mut entries: Vec<(String, ConfigEntry)> = Vec::new();

        for (key, value) in vars {
            let key = key.as_ref();
            let Some(path_str) = key.strip_prefix(&prefix_with_sep) else {
                continue;
            };
            if path_str.is_empty() {
                continue;
            }

            let path: Vec<String> = path_str
                .split(self.separator.as_str())
                .map(str::to_lowercase)
                .collect();

            entries.push((
                key.to_string(),
                ConfigEntry::at_path(path, infer_scalar(value.as_ref())),
            ));
        }

        // Process environment order is unspecified.
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.into_iter().map(|(_, entry)| entry).collect()
    }
}

impl ConfigSource for EnvSource {
    fn entries(&self, lookup: &dyn EnvLookup) -> Result<Vec<ConfigEntry>, ConfigError> {
        Ok(self.entries_from(lookup.vars()))
    }
}
