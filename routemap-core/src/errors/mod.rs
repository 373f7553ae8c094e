//! Error enums for every routemap subsystem.
//!
//! Nothing here is fatal to a scan except `ScanError`. Per-file failures are
//! `ExtractError`s and are collected alongside the results.

mod config_error;
mod extract_error;
mod mapping_error;
mod scan_error;

pub use config_error::ConfigError;
pub use extract_error::ExtractError;
pub use mapping_error::MappingError;
pub use scan_error::ScanError;
