//! Per-framework endpoint extractors.
//!
//! Each framework has a token-driven state machine under its own module. An
//! [`EndpointExtractor`] wraps one of them behind a file filter so the scanner
//! can dispatch files without knowing framework details.

pub mod django;
pub mod dotnet;
pub mod rails;
pub mod spring;
pub mod subparser;

use std::path::Path;
use std::sync::Arc;

use routemap_core::errors::ExtractError;
use routemap_core::events::{ExtractionEventHandler, NoOpHandler, PartialCoverage};
use routemap_core::types::Framework;

use crate::aggregate::{Aggregator, DEFAULT_MODEL_DEPTH};
use crate::model::{Endpoint, EntityMappings};
use crate::scanner::types::SourceFile;
use crate::tokenizer::cache::TokenCache;
use crate::tokenizer::runner::{run_source, run_tokens, TokenConsumer};
use crate::tokenizer::{Token, Tokenizer, TokenizerOptions};

/// Per-scan inputs shared by every extractor call.
#[derive(Clone, Copy)]
pub struct ExtractionContext<'a> {
    pub root: &'a Path,
    pub entity_mappings: Option<&'a EntityMappings>,
    pub max_model_depth: usize,
    pub events: &'a dyn ExtractionEventHandler,
    pub token_cache: Option<&'a TokenCache>,
}

impl<'a> ExtractionContext<'a> {
    pub fn new(root: &'a Path) -> Self {
        Self {
            root,
            entity_mappings: None,
            max_model_depth: DEFAULT_MODEL_DEPTH,
            events: &NoOpHandler,
            token_cache: None,
        }
    }

    pub fn with_events(mut self, events: &'a dyn ExtractionEventHandler) -> Self {
        self.events = events;
        self
    }

    pub fn with_entity_mappings(mut self, mappings: Option<&'a EntityMappings>, max_depth: usize) -> Self {
        self.entity_mappings = mappings;
        self.max_model_depth = max_depth;
        self
    }

    pub fn with_token_cache(mut self, cache: &'a TokenCache) -> Self {
        self.token_cache = Some(cache);
        self
    }

    pub fn aggregator(&self) -> Aggregator<'a> {
        Aggregator::new(self.entity_mappings, self.max_model_depth)
    }

    /// Run `consumer` over `source`, through the token cache when one is set.
    pub fn run<C: TokenConsumer + ?Sized>(&self, source: &str, options: TokenizerOptions, consumer: &mut C) {
        match self.token_cache {
            Some(cache) => run_tokens(&cache.tokens(source, options), consumer),
            None => run_source(source, options, consumer),
        }
    }

    /// Token stream for `source`, shared through the cache when one is set.
    pub fn tokens(&self, source: &str, options: TokenizerOptions) -> Arc<[Token]> {
        match self.token_cache {
            Some(cache) => cache.tokens(source, options),
            None => Tokenizer::tokenize(source, options).into(),
        }
    }

    pub fn report_partial(
        &self,
        file: &SourceFile,
        line: u32,
        framework: Framework,
        construct: impl Into<String>,
    ) {
        let event = PartialCoverage {
            file: file.path.clone(),
            line,
            framework,
            construct: construct.into(),
        };
        tracing::debug!(file = %file.relative_path, line, construct = %event.construct, "partial coverage");
        self.events.on_partial_coverage(&event);
    }
}

impl std::fmt::Debug for ExtractionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionContext")
            .field("root", &self.root)
            .field("entity_mappings", &self.entity_mappings.map(|m| m.len()))
            .field("max_model_depth", &self.max_model_depth)
            .finish_non_exhaustive()
    }
}

/// Trait for extracting endpoints from one source file.
pub trait EndpointExtractor: Send + Sync {
    fn framework(&self) -> Framework;
    /// Whether this extractor wants to see `file` at all.
    fn matches(&self, file: &SourceFile) -> bool;
    /// Extract endpoints from the file's content. Never fails: unmatched or
    /// malformed input simply yields fewer endpoints.
    fn extract(&self, file: &SourceFile, source: &str, ctx: &ExtractionContext<'_>) -> Vec<Endpoint>;
}

/// Registry of the extractors taking part in one scan.
#[derive(Default)]
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn EndpointExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, extractor: Box<dyn EndpointExtractor>) {
        self.extractors.push(extractor);
    }

    /// Built-in extractors for `frameworks`.
    ///
    /// Django needs its URL configuration resolved across the whole file list
    /// first; files that cannot be read during that pass are returned.
    pub fn for_frameworks(
        frameworks: &[Framework],
        files: &[SourceFile],
        ctx: &ExtractionContext<'_>,
    ) -> (Self, Vec<ExtractError>) {
        let mut registry = Self::new();
        let mut errors = Vec::new();
        for framework in frameworks {
            match framework {
                Framework::Spring => registry.register(Box::new(spring::SpringExtractor)),
                Framework::Django => {
                    let (extractor, errs) = django::DjangoExtractor::prepare(files, ctx);
                    errors.extend(errs);
                    registry.register(Box::new(extractor));
                }
                Framework::Rails => registry.register(Box::new(rails::RailsExtractor)),
                Framework::DotNet => registry.register(Box::new(dotnet::DotNetExtractor)),
            }
        }
        (registry, errors)
    }

    pub fn frameworks(&self) -> Vec<Framework> {
        self.extractors.iter().map(|e| e.framework()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    /// Whether any extractor wants `file`.
    pub fn is_relevant(&self, file: &SourceFile) -> bool {
        self.extractors.iter().any(|e| e.matches(file))
    }

    /// Extract from `file` with every matching extractor.
    pub fn extract_file(&self, file: &SourceFile, source: &str, ctx: &ExtractionContext<'_>) -> Vec<Endpoint> {
        self.extractors
            .iter()
            .filter(|e| e.matches(file))
            .flat_map(|e| e.extract(file, source, ctx))
            .collect()
    }
}
