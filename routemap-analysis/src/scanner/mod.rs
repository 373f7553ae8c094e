//! Directory scanner: walk, detect frameworks, extract in parallel.
//!
//! Files are extracted on rayon workers, each with its own tokenizer and
//! parser state. Per-worker [`EndpointSet`]s are merged at the end, so the
//! only shared state during extraction is the token cache. Cancellation is
//! checked between files.

pub mod detect;
pub mod language_detect;
pub mod types;
pub mod walker;

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use routemap_core::config::RoutemapConfig;
use routemap_core::errors::{ConfigError, ExtractError, ScanError};
use routemap_core::events::{ExtractionEventHandler, ScanSummary};
use routemap_core::traits::CancellationToken;
use routemap_core::types::Framework;

use self::language_detect::Language;
use self::types::SourceFile;
use crate::frameworks::spring::entities;
use crate::frameworks::{ExtractionContext, ExtractorRegistry};
use crate::model::{EndpointSet, EntityMappings};
use crate::tokenizer::cache::TokenCache;
use crate::tokenizer::runner::read_source;

const TOKEN_CACHE_CAPACITY: u64 = 4_096;

/// Result of one scan.
#[derive(Debug, Default)]
pub struct ScanOutput {
    pub endpoints: EndpointSet,
    /// Files that could not be read. Each was skipped; the scan continued.
    pub errors: Vec<ExtractError>,
    pub summary: ScanSummary,
}

/// Per-worker accumulator, merged once all files are done.
#[derive(Default)]
struct PartialScan {
    endpoints: EndpointSet,
    errors: Vec<ExtractError>,
    parsed: usize,
}

impl PartialScan {
    fn merge(mut self, other: PartialScan) -> PartialScan {
        self.endpoints.merge(other.endpoints);
        self.errors.extend(other.errors);
        self.parsed += other.parsed;
        self
    }
}

pub struct Scanner {
    config: RoutemapConfig,
    cancel: CancellationToken,
    token_cache: TokenCache,
}

impl Scanner {
    pub fn new(config: RoutemapConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
            token_cache: TokenCache::new(TOKEN_CACHE_CAPACITY),
        }
    }

    /// Scanner configured from `<root>/routemap.toml`, or defaults when absent.
    pub fn from_root(root: &Path) -> Result<Self, ConfigError> {
        Ok(Self::new(RoutemapConfig::load(root)?))
    }

    pub fn config(&self) -> &RoutemapConfig {
        &self.config
    }

    /// Token to cancel a running scan from another thread.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Walk `root` and extract endpoints from every supported file.
    pub fn scan(&self, root: &Path, handler: &dyn ExtractionEventHandler) -> Result<ScanOutput, ScanError> {
        let start = Instant::now();
        let files = walker::walk_directory(root, &self.config.scan, &self.cancel)?;
        self.extract_all(root, &files, handler, start)
    }

    /// Extract endpoints from an explicit file list. Relative paths are
    /// resolved against `root`; unsupported extensions are ignored.
    pub fn scan_files(
        &self,
        root: &Path,
        files: &[PathBuf],
        handler: &dyn ExtractionEventHandler,
    ) -> Result<ScanOutput, ScanError> {
        let start = Instant::now();
        if !root.is_dir() {
            return Err(ScanError::RootNotFound(root.to_path_buf()));
        }
        let mut sources: Vec<SourceFile> = files
            .iter()
            .filter_map(|path| {
                let path = if path.is_absolute() { path.clone() } else { root.join(path) };
                let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                SourceFile::new(root, &path, size)
            })
            .collect();
        sources.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        sources.dedup_by(|a, b| a.path == b.path);
        self.extract_all(root, &sources, handler, start)
    }

    fn frameworks(&self, files: &[SourceFile]) -> Vec<Framework> {
        match &self.config.extraction.frameworks {
            Some(frameworks) => frameworks.clone(),
            None => detect::detect_frameworks(files),
        }
    }

    /// Entity mappings from the configured table and from Java bean classes.
    fn entity_mappings(&self, root: &Path, files: &[SourceFile]) -> Option<EntityMappings> {
        let extraction = &self.config.extraction;
        if !extraction.expand_models {
            return None;
        }
        let mut mappings = EntityMappings::new();
        if let Some(table) = &extraction.entity_mappings {
            match EntityMappings::load(&root.join(table)) {
                Ok(loaded) => mappings.merge(loaded),
                Err(error) => tracing::warn!(%error, "entity mappings not loaded"),
            }
        }
        if extraction.scan_java_entities {
            let discovered = files
                .par_iter()
                .filter(|f| f.language == Language::Java)
                .filter_map(|f| read_source(&f.path).ok())
                .map(|source| entities::discover(&source))
                .reduce(EntityMappings::new, |mut a, b| {
                    a.merge(b);
                    a
                });
            mappings.merge(discovered);
        }
        tracing::debug!(entities = mappings.len(), "entity mappings ready");
        (!mappings.is_empty()).then_some(mappings)
    }

    fn extract_all(
        &self,
        root: &Path,
        files: &[SourceFile],
        handler: &dyn ExtractionEventHandler,
        start: Instant,
    ) -> Result<ScanOutput, ScanError> {
        let frameworks = self.frameworks(files);
        handler.on_scan_started(root, &frameworks);

        let mappings = self.entity_mappings(root, files);
        let ctx = ExtractionContext::new(root)
            .with_events(handler)
            .with_entity_mappings(mappings.as_ref(), self.config.extraction.max_model_depth)
            .with_token_cache(&self.token_cache);

        let (registry, prepare_errors) = ExtractorRegistry::for_frameworks(&frameworks, files, &ctx);
        for error in &prepare_errors {
            handler.on_file_error(error);
        }

        let relevant: Vec<&SourceFile> = files.iter().filter(|f| registry.is_relevant(f)).collect();
        let run = || {
            relevant
                .par_iter()
                .fold(PartialScan::default, |mut acc, file| {
                    if self.cancel.is_cancelled() {
                        return acc;
                    }
                    match read_source(&file.path) {
                        Ok(source) => {
                            let endpoints = registry.extract_file(file, &source, &ctx);
                            handler.on_file_extracted(&file.path, endpoints.len());
                            acc.endpoints.extend(endpoints);
                            acc.parsed += 1;
                        }
                        Err(error) => {
                            handler.on_file_error(&error);
                            acc.errors.push(error);
                        }
                    }
                    acc
                })
                .reduce(PartialScan::default, PartialScan::merge)
        };
        let merged = match self.thread_pool() {
            Some(pool) => pool.install(run),
            None => run(),
        };
        if self.cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let mut errors = prepare_errors;
        errors.extend(merged.errors);
        let summary = ScanSummary {
            files_discovered: files.len(),
            files_parsed: merged.parsed,
            files_failed: errors.len(),
            endpoints: merged.endpoints.len(),
            endpoint_variants: merged.endpoints.variant_count(),
            frameworks,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        handler.on_scan_complete(&summary);
        Ok(ScanOutput {
            endpoints: merged.endpoints,
            errors,
            summary,
        })
    }

    fn thread_pool(&self) -> Option<rayon::ThreadPool> {
        let threads = self.config.scan.effective_threads();
        if threads == 0 {
            return None;
        }
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => Some(pool),
            Err(error) => {
                tracing::warn!(%error, threads, "falling back to the global thread pool");
                None
            }
        }
    }
}
