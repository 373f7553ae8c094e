//! Spring MVC (Java annotation) endpoints.

pub mod annotation;
pub mod entities;
pub mod parser;

use routemap_core::types::Framework;

use super::{EndpointExtractor, ExtractionContext};
use crate::model::Endpoint;
use crate::scanner::language_detect::Language;
use crate::scanner::types::SourceFile;

pub use parser::parse_controller;

pub struct SpringExtractor;

impl EndpointExtractor for SpringExtractor {
    fn framework(&self) -> Framework {
        Framework::Spring
    }

    fn matches(&self, file: &SourceFile) -> bool {
        file.language == Language::Java
    }

    fn extract(&self, file: &SourceFile, source: &str, ctx: &ExtractionContext<'_>) -> Vec<Endpoint> {
        // Cheap reject before tokenizing.
        if !source.contains("Controller") {
            return Vec::new();
        }
        let aggregator = ctx.aggregator();
        parse_controller(file, source, ctx)
            .iter()
            .map(|candidate| aggregator.build(candidate))
            .collect()
    }
}
