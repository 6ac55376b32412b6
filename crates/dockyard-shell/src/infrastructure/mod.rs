//! Infrastructure layer for the dock shell.
//!
//! Contains the adapters facing the outside world: the windowing platform,
//! the TOML-backed layout store, the application config file, and the tokio
//! event loop that drives a layout controller.

pub mod config_store;
pub mod event_loop;
pub mod platform;
pub mod storage;
