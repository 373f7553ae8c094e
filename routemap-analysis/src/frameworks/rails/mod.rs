//! Rails routes DSL (`config/routes.rb` and `config/routes/*.rb`).

pub mod parser;
pub mod routes;
pub mod ruby;

use routemap_core::types::Framework;

use super::{EndpointExtractor, ExtractionContext};
use crate::model::Endpoint;
use crate::scanner::language_detect::Language;
use crate::scanner::types::SourceFile;

pub use parser::parse_routes;

pub struct RailsExtractor;

impl EndpointExtractor for RailsExtractor {
    fn framework(&self) -> Framework {
        Framework::Rails
    }

    fn matches(&self, file: &SourceFile) -> bool {
        file.language == Language::Ruby
            && (file.file_name() == "routes.rb"
                || file.relative_path.starts_with("config/routes/")
                || file.relative_path.contains("/config/routes/"))
    }

    fn extract(&self, file: &SourceFile, source: &str, ctx: &ExtractionContext<'_>) -> Vec<Endpoint> {
        let aggregator = ctx.aggregator();
        parse_routes(file, source, ctx)
            .iter()
            .map(|candidate| aggregator.build(candidate))
            .collect()
    }
}
