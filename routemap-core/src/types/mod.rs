//! Types shared across routemap crates.

pub mod collections;
mod framework;

pub use framework::Framework;
