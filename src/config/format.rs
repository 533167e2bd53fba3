//! File format front ends and text decoding.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::error::ParseError;
use super::value::ConfigValue;

/// A serialization format that can turn file contents into a [`ConfigValue`].
///
/// The loader calls [`parse`](FileFormat::parse) once per contributing file and
/// is otherwise unaware of the format behind it.
pub trait FileFormat: Send + Sync + fmt::Debug {
    /// Human readable format name used in logs.
    fn name(&self) -> &'static str;

    /// File name suffixes that qualify a file when loading a directory.
    fn extensions(&self) -> &'static [&'static str];

    fn parse(&self, contents: &str) -> Result<ConfigValue, ParseError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Yaml;

impl FileFormat for Yaml {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".yaml", ".yml"]
    }

    fn parse(&self, contents: &str) -> Result<ConfigValue, ParseError> {
        if contents.trim().is_empty() {
            return Ok(ConfigValue::Null);
        }
        let mut document: serde_yaml::Value = serde_yaml::from_str(contents)?;
        document.apply_merge()?;
        ConfigValue::from_yaml(document)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Toml;

impl FileFormat for Toml {
    fn name(&self) -> &'static str {
        "toml"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".toml"]
    }

    fn parse(&self, contents: &str) -> Result<ConfigValue, ParseError> {
        let table: toml::Table = toml::from_str(contents)?;
        Ok(ConfigValue::from_toml(toml::Value::Table(table)))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl FileFormat for Json {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".json"]
    }

    fn parse(&self, contents: &str) -> Result<ConfigValue, ParseError> {
        if contents.trim().is_empty() {
            return Ok(ConfigValue::Null);
        }
        let document: serde_json::Value = serde_json::from_str(contents)?;
        Ok(ConfigValue::from_json(document))
    }
}

/// Text encoding of configuration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileEncoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl FileEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
        }
    }

    /// Decodes raw file bytes, dropping a leading byte order mark.
    pub fn decode(&self, bytes: Vec<u8>) -> Result<String, ParseError> {
        let text = match self {
            Self::Utf8 => {
                String::from_utf8(bytes).map_err(|e| self.invalid(e.to_string()))?
            }
            Self::Utf16Le | Self::Utf16Be => {
                if bytes.len() % 2 != 0 {
                    return Err(self.invalid("odd number of bytes".to_string()));
                }
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| match self {
                        Self::Utf16Be => u16::from_be_bytes([pair[0], pair[1]]),
                        _ => u16::from_le_bytes([pair[0], pair[1]]),
                    })
                    .collect();
                String::from_utf16(&units).map_err(|e| self.invalid(e.to_string()))?
            }
        };

        Ok(match text.strip_prefix('\u{feff}') {
            Some(rest) => rest.to_string(),
            None => text,
        })
    }

    fn invalid(&self, reason: String) -> ParseError {
        ParseError::Encoding {
            encoding: self.label(),
            reason,
        }
    }
}

impl FromStr for FileEncoding {
    type Err = ParseError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let normalized: String = label
            .chars()
            .filter(|c| !matches!(c, '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "utf8" | "utf8sig" => Ok(Self::Utf8),
            "utf16le" => Ok(Self::Utf16Le),
            "utf16be" => Ok(Self::Utf16Be),
            _ => Err(ParseError::UnknownEncoding(label.to_string())),
        }
    }
}

/// Reads a whole file, decodes it and hands it to `format`.
pub fn parse_file(
    path: &Path,
    format: &dyn FileFormat,
    encoding: FileEncoding,
) -> Result<ConfigValue, ParseError> {
    let bytes = std::fs::read(path)?;
    let contents = encoding.decode(bytes)?;
    format.parse(&contents)
}
