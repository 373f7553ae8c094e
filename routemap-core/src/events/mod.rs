//! Observability sink threaded through extraction calls.

pub mod handler;
pub mod types;

pub use handler::{ExtractionEventHandler, NoOpHandler, TracingHandler};
pub use types::{PartialCoverage, ScanSummary};
