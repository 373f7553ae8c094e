//! Turns one raw declaration into a primary endpoint plus variants.
//!
//! Every {base path} x {sub path} x {method} combination becomes an endpoint;
//! all but the first are attached as variants of the first.

use std::path::PathBuf;

use routemap_core::types::Framework;

use crate::model::parameter::merge_parameter;
use crate::model::path::{join_paths, path_parameters};
use crate::model::{
    Endpoint, EntityMappings, HttpMethod, ModelField, Parameter, ParameterMap, ParameterSource,
};

/// Default nesting bound for bound-model flattening.
pub const DEFAULT_MODEL_DEPTH: usize = 4;

/// Raw declaration collected by a framework parser.
#[derive(Debug, Clone)]
pub struct EndpointCandidate {
    pub framework: Framework,
    pub file_path: PathBuf,
    pub relative_file_path: String,
    /// Class-level / enclosing-scope paths. Empty means `[""]`.
    pub base_paths: Vec<String>,
    /// Method-level paths. Empty means `[""]`.
    pub sub_paths: Vec<String>,
    /// Methods declared at class scope; used when `methods` is empty.
    pub class_methods: Vec<HttpMethod>,
    pub methods: Vec<HttpMethod>,
    pub parameters: ParameterMap,
    pub bound_model: Option<ModelField>,
    pub class_authorization: Option<String>,
    pub authorization: Option<String>,
    pub controller: Option<String>,
    pub action: Option<String>,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    pub headers: Vec<String>,
    pub start_line: u32,
    pub end_line: u32,
}

impl EndpointCandidate {
    pub fn new(framework: Framework, file_path: PathBuf, relative_file_path: String) -> Self {
        Self {
            framework,
            file_path,
            relative_file_path,
            base_paths: Vec::new(),
            sub_paths: Vec::new(),
            class_methods: Vec::new(),
            methods: Vec::new(),
            parameters: ParameterMap::new(),
            bound_model: None,
            class_authorization: None,
            authorization: None,
            controller: None,
            action: None,
            consumes: Vec::new(),
            produces: Vec::new(),
            headers: Vec::new(),
            start_line: 0,
            end_line: 0,
        }
    }

    pub fn add_parameter(&mut self, parameter: Parameter) {
        merge_parameter(&mut self.parameters, parameter);
    }

    /// Method-level methods, else class-level, else `GET`. Duplicates removed.
    pub fn effective_methods(&self) -> Vec<HttpMethod> {
        let declared = if self.methods.is_empty() {
            &self.class_methods
        } else {
            &self.methods
        };
        let mut methods = Vec::new();
        for m in declared {
            if !methods.contains(m) {
                methods.push(*m);
            }
        }
        if methods.is_empty() {
            methods.push(HttpMethod::Get);
        }
        methods
    }

    /// Every normalized base x sub path, duplicates removed.
    pub fn effective_paths(&self) -> Vec<String> {
        let bases = or_root(&self.base_paths);
        let subs = or_root(&self.sub_paths);
        let mut paths = Vec::new();
        for base in bases {
            for sub in subs {
                let path = join_paths(base, sub);
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        paths
    }
}

fn or_root(paths: &[String]) -> &[String] {
    static ROOT: [String; 1] = [String::new()];
    if paths.is_empty() {
        &ROOT
    } else {
        paths
    }
}

/// Combine class- and method-scope authorization with a logical AND.
pub fn combine_authorization(class: Option<&str>, method: Option<&str>) -> Option<String> {
    match (class, method) {
        (Some(c), Some(m)) => Some(format!("{c} and {m}")),
        (Some(c), None) => Some(c.to_string()),
        (None, Some(m)) => Some(m.to_string()),
        (None, None) => None,
    }
}

/// Builds endpoints from candidates, optionally flattening bound models.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    entity_mappings: Option<&'a EntityMappings>,
    max_model_depth: usize,
}

impl<'a> Aggregator<'a> {
    pub fn new(entity_mappings: Option<&'a EntityMappings>, max_model_depth: usize) -> Self {
        Self {
            entity_mappings,
            max_model_depth,
        }
    }

    pub fn build(&self, candidate: &EndpointCandidate) -> Endpoint {
        let authorization = combine_authorization(
            candidate.class_authorization.as_deref(),
            candidate.authorization.as_deref(),
        );
        let methods = candidate.effective_methods();

        let mut primary: Option<Endpoint> = None;
        for path in candidate.effective_paths() {
            for method in &methods {
                let endpoint = self.make_endpoint(candidate, &path, *method, authorization.clone());
                match primary.as_mut() {
                    Some(p) => p.add_variant(endpoint),
                    None => primary = Some(endpoint),
                }
            }
        }
        // effective_paths and effective_methods are never empty
        primary.unwrap_or_else(|| self.make_endpoint(candidate, "/", HttpMethod::Get, authorization))
    }

    fn make_endpoint(
        &self,
        candidate: &EndpointCandidate,
        path: &str,
        method: HttpMethod,
        authorization: Option<String>,
    ) -> Endpoint {
        let mut parameters = candidate.parameters.clone();
        for name in path_parameters(path) {
            merge_parameter(&mut parameters, Parameter::new(name, ParameterSource::Path));
        }
        if let (Some(mappings), Some(model)) = (self.entity_mappings, &candidate.bound_model) {
            for param in mappings.expand(model, ParameterSource::Body, self.max_model_depth) {
                merge_parameter(&mut parameters, param);
            }
        }

        Endpoint {
            framework: candidate.framework,
            file_path: candidate.file_path.clone(),
            relative_file_path: candidate.relative_file_path.clone(),
            http_method: method,
            path_template: path.to_string(),
            start_line: candidate.start_line,
            end_line: candidate.end_line.max(candidate.start_line),
            parameters,
            bound_model: candidate.bound_model.clone(),
            authorization,
            controller: candidate.controller.clone(),
            action: candidate.action.clone(),
            consumes: candidate.consumes.clone(),
            produces: candidate.produces.clone(),
            headers: candidate.headers.clone(),
            variants: Vec::new(),
        }
    }
}

impl Default for Aggregator<'_> {
    fn default() -> Self {
        Self::new(None, DEFAULT_MODEL_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> EndpointCandidate {
        EndpointCandidate::new(
            Framework::Spring,
            PathBuf::from("/app/src/UserController.java"),
            "src/UserController.java".into(),
        )
    }

    #[test]
    fn test_defaults_to_get_root() {
        let endpoint = Aggregator::default().build(&candidate());
        assert_eq!(endpoint.path_template, "/");
        assert_eq!(endpoint.http_method, HttpMethod::Get);
        assert!(endpoint.variants.is_empty());
    }

    #[test]
    fn test_cross_product_order() {
        let mut c = candidate();
        c.base_paths = vec!["/a".into(), "/b/".into()];
        c.sub_paths = vec!["x".into()];
        c.class_methods = vec![HttpMethod::Get, HttpMethod::Post];
        let endpoint = Aggregator::default().build(&c);

        let combos: Vec<_> = endpoint
            .all_variants()
            .map(|e| (e.path_template.as_str(), e.http_method))
            .collect();
        assert_eq!(
            combos,
            vec![
                ("/a/x", HttpMethod::Get),
                ("/a/x", HttpMethod::Post),
                ("/b/x", HttpMethod::Get),
                ("/b/x", HttpMethod::Post),
            ]
        );
    }

    #[test]
    fn test_method_level_overrides_class_level() {
        let mut c = candidate();
        c.class_methods = vec![HttpMethod::Get, HttpMethod::Post];
        c.methods = vec![HttpMethod::Delete, HttpMethod::Delete];
        assert_eq!(c.effective_methods(), vec![HttpMethod::Delete]);
    }

    #[test]
    fn test_authorization_and() {
        let mut c = candidate();
        c.class_authorization = Some("hasRole('USER')".into());
        c.authorization = Some("hasRole('ADMIN')".into());
        let endpoint = Aggregator::default().build(&c);
        assert_eq!(
            endpoint.authorization.as_deref(),
            Some("hasRole('USER') and hasRole('ADMIN')")
        );
    }

    #[test]
    fn test_path_placeholders_become_parameters() {
        let mut c = candidate();
        c.sub_paths = vec!["/users/{id}".into()];
        c.add_parameter(Parameter::new("id", ParameterSource::Unknown).with_data_type("long"));
        let endpoint = Aggregator::default().build(&c);
        let id = &endpoint.parameters["id"];
        assert_eq!(id.source, ParameterSource::Path);
        assert_eq!(id.data_type.as_deref(), Some("long"));
    }

    #[test]
    fn test_bound_model_expansion() {
        let mut mappings = EntityMappings::new();
        mappings.add_field("User", ModelField::new("String", "getEmail", false));
        let mut c = candidate();
        c.bound_model = Some(ModelField::new("User", "user", false));

        let expanded = Aggregator::new(Some(&mappings), 4).build(&c);
        assert_eq!(expanded.parameters["email"].source, ParameterSource::Body);

        let opaque = Aggregator::default().build(&c);
        assert!(opaque.parameters.is_empty());
        assert_eq!(opaque.bound_model, c.bound_model);
    }
}
