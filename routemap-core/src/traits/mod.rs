//! Shared traits used across routemap crates.

pub mod cancellation;

pub use cancellation::CancellationToken;
