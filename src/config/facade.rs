//! Config loading facade: assembles the layered sources and deserializes.

use super::{merge, sources, ReplicateConfig};
use crate::error::ConfigError;
use std::path::Path;

/// Loads [`ReplicateConfig`] from its layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults, the global file, an optional explicit file, then environment
    pub fn load(explicit: Option<&Path>) -> Result<ReplicateConfig, ConfigError> {
        let mut builder = merge::builder_with_defaults()?;
        builder = sources::global_file::add_to_builder(builder)?;
        if let Some(path) = explicit {
            builder = sources::file::add_to_builder(builder, path)?;
        }
        builder = sources::env::add_to_builder(builder);

        let config: ReplicateConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load defaults plus a single file, ignoring global and environment sources
    pub fn load_from_file(path: &Path) -> Result<ReplicateConfig, ConfigError> {
        let builder = sources::file::add_to_builder(merge::builder_with_defaults()?, path)?;
        let config: ReplicateConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
