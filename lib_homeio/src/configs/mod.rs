//! Configuration loading.

pub mod config_endpoint;
