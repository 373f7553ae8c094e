use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::Framework;

/// A construct the parsers recognised but could not fully interpret.
///
/// Emitted instead of silently dropping data; the result set is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialCoverage {
    pub file: PathBuf,
    pub line: u32,
    pub framework: Framework,
    pub construct: String,
}

/// Counters reported once a scan finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub files_discovered: usize,
    pub files_parsed: usize,
    pub files_failed: usize,
    /// Primary endpoints (one per declaration site).
    pub endpoints: usize,
    /// Primary endpoints plus all variants.
    pub endpoint_variants: usize,
    pub frameworks: Vec<Framework>,
    pub duration_ms: u64,
}
