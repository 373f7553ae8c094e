//! Endpoint model shared by every framework parser.

pub mod endpoint;
pub mod endpoint_set;
pub mod entity_mappings;
pub mod http_method;
pub mod model_field;
pub mod parameter;
pub mod path;

pub use endpoint::{Endpoint, EndpointKey};
pub use endpoint_set::EndpointSet;
pub use entity_mappings::EntityMappings;
pub use http_method::HttpMethod;
pub use model_field::ModelField;
pub use parameter::{Parameter, ParameterMap, ParameterSource};
