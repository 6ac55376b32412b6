//! Storage infrastructure: configuration file and layout definitions.
//!
//! - `config` reads the application config file from the platform-appropriate
//!   directory and provides defaults on first run.
//! - `definitions` maps dock definitions to and from the group/entry layout
//!   of a [`ConfigStore`](crate::infrastructure::config_store::ConfigStore).

pub mod config;
pub mod definitions;
