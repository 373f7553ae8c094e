//! # routemap-analysis
//!
//! Static HTTP endpoint extraction for Spring MVC, Django, Rails and
//! ASP.NET. Contains the tokenizer, scope tracking, framework parsers,
//! endpoint aggregation and the directory scanner.

#![allow(clippy::module_inception)]

pub mod aggregate;
pub mod frameworks;
pub mod model;
pub mod scanner;
pub mod scope;
pub mod tokenizer;

pub use frameworks::{EndpointExtractor, ExtractionContext, ExtractorRegistry};
pub use model::{Endpoint, EndpointSet, HttpMethod, Parameter, ParameterSource};
pub use scanner::{ScanOutput, Scanner};
