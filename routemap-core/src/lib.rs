//! # routemap-core
//!
//! Shared foundation for the routemap workspace: error enums, configuration,
//! the extraction event handler, cancellation, and common types.

pub mod config;
pub mod errors;
pub mod events;
pub mod logging;
pub mod traits;
pub mod types;
