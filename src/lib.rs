pub mod config;
mod error;

pub use config::{Config, ConfigError, ConfigValue, FileSource};
pub use error::Error;
