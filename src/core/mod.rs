// Core modules: configuration, error types, and the shared data model

pub mod config;
pub mod errors;
pub mod types;

pub use config::Config;
