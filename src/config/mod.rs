//! Configuration loading, merging and environment variable substitution.

mod builder;
mod coerce;
mod env;
mod error;
mod file;
mod format;
mod merge;
mod resolve;
mod source;
mod value;

pub use builder::Config;
pub use coerce::{infer_collection, infer_scalar};
pub use env::EnvSource;
pub use error::{ConfigError, ParseError};
pub use file::TreeLoader;
pub use format::{parse_file, FileEncoding, FileFormat, Json, Toml, Yaml};
pub use merge::{deep_merge, deep_merge_all, merge_at_path};
pub use resolve::{resolve, scan, EnvLookup, ProcessEnv, Reference, Resolver, Segment};
pub use source::{ConfigEntry, ConfigSource, FileSource};
pub use value::{ConfigValue, Mapping};
