//! ASP.NET MVC, Web API and ASP.NET Core controllers.
//!
//! [`classes::ClassParser`] recovers the class/method structure of a C# file
//! with [`attributes`] and [`parameters`] sub-parsers for the declarations;
//! [`routing`] turns controller actions into candidates.

pub mod attributes;
pub mod classes;
pub mod parameters;
pub mod routing;
pub mod syntax;

use routemap_core::types::Framework;

use self::classes::ClassParser;
use super::{EndpointExtractor, ExtractionContext};
use crate::model::Endpoint;
use crate::scanner::language_detect::Language;
use crate::scanner::types::SourceFile;
use crate::tokenizer::TokenizerOptions;

pub struct DotNetExtractor;

impl EndpointExtractor for DotNetExtractor {
    fn framework(&self) -> Framework {
        Framework::DotNet
    }

    fn matches(&self, file: &SourceFile) -> bool {
        file.language == Language::CSharp
    }

    fn extract(&self, file: &SourceFile, source: &str, ctx: &ExtractionContext<'_>) -> Vec<Endpoint> {
        if !source.contains("Controller") {
            return Vec::new();
        }
        let mut parser = ClassParser::new();
        ctx.run(source, TokenizerOptions::CSHARP, &mut parser);
        let classes = parser.into_classes();
        tracing::trace!(file = %file.relative_path, classes = classes.len(), "parsed C# classes");

        let aggregator = ctx.aggregator();
        routing::controller_candidates(file, &classes, ctx)
            .iter()
            .map(|candidate| aggregator.build(candidate))
            .collect()
    }
}
