//! Event handler trait. Every method defaults to a no-op so callers only
//! implement what they observe.

use std::path::Path;

use crate::errors::ExtractError;
use crate::types::Framework;

use super::types::{PartialCoverage, ScanSummary};

pub trait ExtractionEventHandler: Send + Sync {
    fn on_scan_started(&self, _root: &Path, _frameworks: &[Framework]) {}

    fn on_file_extracted(&self, _path: &Path, _endpoints: usize) {}

    fn on_file_error(&self, _error: &ExtractError) {}

    fn on_partial_coverage(&self, _event: &PartialCoverage) {}

    fn on_scan_complete(&self, _summary: &ScanSummary) {}
}

/// Default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpHandler;

impl ExtractionEventHandler for NoOpHandler {}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHandler;

impl ExtractionEventHandler for TracingHandler {
    fn on_scan_started(&self, root: &Path, frameworks: &[Framework]) {
        tracing::info!(root = %root.display(), ?frameworks, "endpoint scan started");
    }

    fn on_file_extracted(&self, path: &Path, endpoints: usize) {
        tracing::trace!(file = %path.display(), endpoints, "file extracted");
    }

    fn on_file_error(&self, error: &ExtractError) {
        tracing::warn!(file = %error.path().display(), %error, "skipping unreadable file");
    }

    fn on_partial_coverage(&self, event: &PartialCoverage) {
        tracing::debug!(
            file = %event.file.display(),
            line = event.line,
            framework = %event.framework,
            construct = %event.construct,
            "construct only partially understood"
        );
    }

    fn on_scan_complete(&self, summary: &ScanSummary) {
        tracing::info!(
            files = summary.files_parsed,
            failed = summary.files_failed,
            endpoints = summary.endpoints,
            duration_ms = summary.duration_ms,
            "endpoint scan complete"
        );
    }
}
