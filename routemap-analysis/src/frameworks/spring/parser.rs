//! Spring MVC controller parser.
//!
//! Three phases per handler method: annotations (class- and method-level
//! mappings, security), signature (parameter declarations and their binding
//! annotations), then the body, skipped by brace depth. The candidate is
//! committed when the body closes, and only if the class carried a
//! controller annotation.

use routemap_core::types::Framework;

use super::annotation::{Annotation, AnnotationParser};
use crate::aggregate::EndpointCandidate;
use crate::frameworks::subparser::SubParser;
use crate::frameworks::ExtractionContext;
use crate::model::{HttpMethod, ModelField, Parameter, ParameterMap, ParameterSource};
use crate::scanner::types::SourceFile;
use crate::scope::ScopeTracker;
use crate::tokenizer::runner::TokenConsumer;
use crate::tokenizer::{Token, TokenKind, TokenizerOptions};

const MAPPING_ANNOTATIONS: &[(&str, Option<HttpMethod>)] = &[
    ("RequestMapping", None),
    ("GetMapping", Some(HttpMethod::Get)),
    ("PostMapping", Some(HttpMethod::Post)),
    ("PutMapping", Some(HttpMethod::Put)),
    ("DeleteMapping", Some(HttpMethod::Delete)),
    ("PatchMapping", Some(HttpMethod::Patch)),
];

/// Run the parser over one Java source file.
pub fn parse_controller(
    file: &SourceFile,
    source: &str,
    ctx: &ExtractionContext<'_>,
) -> Vec<EndpointCandidate> {
    let mut parser = SpringParser::new(file, *ctx);
    ctx.run(source, TokenizerOptions::JAVA, &mut parser);
    parser.candidates
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Class level or between members.
    Members,
    /// After a mapped method's annotations, before its `(`.
    Signature,
    /// Inside the parameter list opened at `base` paren depth.
    Parameters { base: usize },
    /// After `)`, waiting for the body or `;`.
    AfterParameters,
    /// Inside the method body opened at `depth` brace depth.
    Body { depth: usize },
}

#[derive(Debug, Default)]
struct Mapping {
    seen: bool,
    paths: Vec<String>,
    methods: Vec<HttpMethod>,
    consumes: Vec<String>,
    produces: Vec<String>,
    headers: Vec<String>,
    authorization: Option<String>,
}

#[derive(Debug, Default)]
struct ParamDraft {
    annotations: Vec<Annotation>,
    tokens: Vec<String>,
    angle_depth: usize,
}

impl ParamDraft {
    /// `(type, name)` once at least a type and a name were seen.
    fn split(&self) -> Option<(String, String)> {
        let (name, type_tokens) = self.tokens.split_last()?;
        if type_tokens.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
            return None;
        }
        Some((type_tokens.concat(), name.clone()))
    }
}

struct SpringParser<'a> {
    file: &'a SourceFile,
    ctx: ExtractionContext<'a>,
    scope: ScopeTracker,
    phase: Phase,
    annotation: Option<AnnotationParser>,
    has_controller: bool,
    in_class: bool,
    expecting_class_name: bool,
    class_name: Option<String>,
    class_body_depth: Option<usize>,
    class_mapping: Mapping,
    method: Mapping,
    method_start: Option<u32>,
    action: Option<String>,
    param: ParamDraft,
    parameters: ParameterMap,
    bound_model: Option<ModelField>,
    previous_param: Option<(String, String)>,
    candidates: Vec<EndpointCandidate>,
}

impl<'a> SpringParser<'a> {
    fn new(file: &'a SourceFile, ctx: ExtractionContext<'a>) -> Self {
        Self {
            file,
            ctx,
            scope: ScopeTracker::new(),
            phase: Phase::Members,
            annotation: None,
            has_controller: false,
            in_class: false,
            expecting_class_name: false,
            class_name: None,
            class_body_depth: None,
            class_mapping: Mapping::default(),
            method: Mapping::default(),
            method_start: None,
            action: None,
            param: ParamDraft::default(),
            parameters: ParameterMap::new(),
            bound_model: None,
            previous_param: None,
            candidates: Vec::new(),
        }
    }

    fn at_class_level(&self) -> bool {
        self.class_body_depth.is_none()
    }

    fn at_member_level(&self) -> bool {
        self.class_body_depth == Some(self.scope.brace_depth()) && self.scope.paren_depth() == 0
    }

    fn apply_annotation(&mut self, annotation: Annotation) {
        match self.phase {
            Phase::Parameters { .. } => {
                self.param.annotations.push(annotation);
                return;
            }
            Phase::Body { .. } => return,
            _ => {}
        }

        let class_level = self.at_class_level();
        if !class_level && !self.at_member_level() {
            return;
        }
        match annotation.name.as_str() {
            "Controller" | "RestController" if class_level => self.has_controller = true,
            "PreAuthorize" => {
                if let Some(expr) = annotation.literal(&["value"]) {
                    let target = if class_level { &mut self.class_mapping } else { &mut self.method };
                    target.authorization = Some(expr.to_string());
                }
            }
            name => {
                if let Some((_, implied)) = MAPPING_ANNOTATIONS.iter().find(|(n, _)| *n == name) {
                    self.apply_mapping(&annotation, *implied, class_level);
                }
            }
        }
    }

    fn apply_mapping(&mut self, annotation: &Annotation, implied: Option<HttpMethod>, class_level: bool) {
        let mut unresolved = Vec::new();
        let paths: Vec<String> = annotation
            .values(&["value", "path"])
            .iter()
            .map(|v| {
                if !v.literal {
                    unresolved.push(format!("non-literal mapping path `{}`", v.text));
                }
                v.text.clone()
            })
            .collect();
        let mut methods: Vec<HttpMethod> = implied.into_iter().collect();
        for value in annotation.values(&["method"]) {
            match HttpMethod::from_source(&value.text) {
                Some(m) => methods.push(m),
                None => unresolved.push(format!("unrecognised request method `{}`", value.text)),
            }
        }
        let texts = |key: &str| -> Vec<String> {
            annotation.values(&[key]).iter().map(|v| v.text.clone()).collect()
        };

        let target = if class_level {
            &mut self.class_mapping
        } else {
            &mut self.method
        };
        target.seen = true;
        target.paths.extend(paths);
        target.methods.extend(methods);
        target.consumes.extend(texts("consumes"));
        target.produces.extend(texts("produces"));
        target.headers.extend(texts("headers"));
        if !class_level && self.method_start.is_none() {
            self.method_start = Some(annotation.line);
        }

        for construct in unresolved {
            self.ctx.report_partial(self.file, annotation.line, Framework::Spring, construct);
        }
    }

    fn process_member(&mut self, token: &Token) {
        match &token.kind {
            TokenKind::Word(w) if self.at_class_level() && matches!(w.as_str(), "class" | "interface" | "enum") => {
                self.in_class = true;
                self.expecting_class_name = true;
                return;
            }
            TokenKind::Word(w) if self.expecting_class_name => {
                self.class_name = Some(w.clone());
                self.expecting_class_name = false;
                return;
            }
            TokenKind::Punct('{') if self.in_class && self.class_body_depth.is_none() => {
                self.class_body_depth = Some(self.scope.brace_depth());
                return;
            }
            TokenKind::Punct('}') if self.class_body_depth.is_some_and(|d| self.scope.brace_depth() < d) => {
                self.end_class();
                return;
            }
            _ => {}
        }

        if self.method.seen && self.at_member_level() {
            if token.is_punct(';') {
                self.reset_method();
            } else {
                self.phase = Phase::Signature;
                self.process_signature(token);
            }
        } else if self.ends_unmapped_member(token) {
            self.reset_method();
        }
    }

    /// `;` or the opening `{` of a member that carried no mapping annotation.
    fn ends_unmapped_member(&self, token: &Token) -> bool {
        let Some(class_depth) = self.class_body_depth else {
            return false;
        };
        match token.punct() {
            Some(';') => self.at_member_level(),
            Some('{') => self.scope.brace_depth() == class_depth + 1 && self.scope.paren_depth() == 0,
            _ => false,
        }
    }

    fn process_signature(&mut self, token: &Token) {
        match &token.kind {
            TokenKind::Word(w) => self.action = Some(w.clone()),
            TokenKind::Punct('(') => {
                self.phase = Phase::Parameters {
                    base: self.scope.paren_depth(),
                }
            }
            TokenKind::Punct(';' | '{' | '}' | '=') => {
                self.reset_method();
                self.phase = Phase::Members;
            }
            _ => {}
        }
    }

    fn process_parameter(&mut self, token: &Token, base: usize) {
        if self.scope.paren_depth() < base {
            self.commit_param();
            self.phase = Phase::AfterParameters;
            return;
        }
        match &token.kind {
            TokenKind::Punct(',') if self.scope.paren_depth() == base && self.param.angle_depth == 0 => {
                self.commit_param();
            }
            TokenKind::Punct('<') => {
                self.param.angle_depth += 1;
                self.param.tokens.push("<".into());
            }
            TokenKind::Punct('>') => {
                self.param.angle_depth = self.param.angle_depth.saturating_sub(1);
                self.param.tokens.push(">".into());
            }
            TokenKind::Punct(c @ ('[' | ']' | '.' | '?' | ',')) => self.param.tokens.push(c.to_string()),
            TokenKind::Word(w) if w == "final" => {}
            TokenKind::Word(w) => self.param.tokens.push(w.clone()),
            _ => {}
        }
    }

    fn commit_param(&mut self) {
        let draft = std::mem::take(&mut self.param);
        let Some((data_type, name)) = draft.split() else {
            return;
        };

        if simple_name(&data_type) == "BindingResult" {
            if self.bound_model.is_none() {
                if let Some((prev_type, prev_name)) = self.previous_param.take() {
                    self.bound_model = Some(ModelField::new(prev_type, &prev_name, false));
                }
            }
            return;
        }

        for annotation in &draft.annotations {
            let source = match annotation.name.as_str() {
                "RequestParam" => ParameterSource::Query,
                "PathVariable" => ParameterSource::Path,
                "CookieValue" => ParameterSource::Cookie,
                "SessionAttribute" => ParameterSource::Session,
                "RequestBody" => {
                    self.bound_model = Some(ModelField::new(data_type.clone(), &name, false));
                    ParameterSource::Body
                }
                "ModelAttribute" => {
                    self.bound_model = Some(ModelField::new(data_type.clone(), &name, false));
                    continue;
                }
                _ => continue,
            };
            let key = annotation
                .literal(&["value", "name"])
                .unwrap_or(&name)
                .to_string();
            let mut param = Parameter::new(key.clone(), source).with_data_type(data_type.clone());
            if let Some(default) = annotation.literal(&["defaultValue"]) {
                param = param.with_default(default);
            }
            // the declaring annotation fixes the source; first one wins
            self.parameters.entry(key).or_insert(param);
        }
        self.previous_param = Some((data_type, name));
    }

    fn commit_endpoint(&mut self, end_line: u32) {
        let method = std::mem::take(&mut self.method);
        if self.has_controller {
            let class = &self.class_mapping;
            let mut candidate = EndpointCandidate::new(
                Framework::Spring,
                self.file.path.clone(),
                self.file.relative_path.clone(),
            );
            candidate.base_paths = class.paths.clone();
            candidate.sub_paths = method.paths;
            candidate.class_methods = class.methods.clone();
            candidate.methods = method.methods;
            candidate.parameters = std::mem::take(&mut self.parameters);
            candidate.bound_model = self.bound_model.take();
            candidate.class_authorization = class.authorization.clone();
            candidate.authorization = method.authorization;
            candidate.controller = self.class_name.clone();
            candidate.action = self.action.take();
            candidate.consumes = prefer(method.consumes, &class.consumes);
            candidate.produces = prefer(method.produces, &class.produces);
            candidate.headers = prefer(method.headers, &class.headers);
            candidate.start_line = self.method_start.unwrap_or(end_line);
            candidate.end_line = end_line;
            self.candidates.push(candidate);
        }
        self.reset_method();
    }

    fn reset_method(&mut self) {
        self.method = Mapping::default();
        self.method_start = None;
        self.action = None;
        self.param = ParamDraft::default();
        self.parameters.clear();
        self.bound_model = None;
        self.previous_param = None;
    }

    fn end_class(&mut self) {
        self.reset_method();
        self.in_class = false;
        self.has_controller = false;
        self.class_name = None;
        self.class_body_depth = None;
        self.class_mapping = Mapping::default();
    }
}

impl TokenConsumer for SpringParser<'_> {
    fn process_token(&mut self, token: &Token) {
        self.scope.interpret_token(token);

        if let Some(parser) = self.annotation.as_mut() {
            let consumed = parser.process_token(token);
            if parser.has_item() || !consumed {
                if let Some(annotation) = self.annotation.take().and_then(|mut p| p.pull_item()) {
                    self.apply_annotation(annotation);
                }
            }
            if consumed {
                return;
            }
        }

        if token.is_punct('@') && !matches!(self.phase, Phase::Body { .. }) {
            self.annotation = Some(AnnotationParser::new());
            return;
        }

        match self.phase {
            Phase::Members => self.process_member(token),
            Phase::Signature => self.process_signature(token),
            Phase::Parameters { base } => self.process_parameter(token, base),
            Phase::AfterParameters => match token.punct() {
                Some('{') => {
                    self.phase = Phase::Body {
                        depth: self.scope.brace_depth(),
                    }
                }
                Some(';') => {
                    self.commit_endpoint(token.line);
                    self.phase = Phase::Members;
                }
                _ => {}
            },
            Phase::Body { depth } => {
                if token.is_punct('}') && self.scope.brace_depth() < depth {
                    self.commit_endpoint(token.line);
                    self.phase = Phase::Members;
                } else if token.is_eof() {
                    self.reset_method();
                }
            }
        }
    }

    fn should_continue(&self) -> bool {
        !self.in_class || self.has_controller
    }
}

fn prefer(own: Vec<String>, inherited: &[String]) -> Vec<String> {
    if own.is_empty() {
        inherited.to_vec()
    } else {
        own
    }
}

fn simple_name(type_name: &str) -> &str {
    type_name.rsplit('.').next().unwrap_or(type_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::frameworks::test_support::{ctx, source_file, RecordingHandler};
    use crate::model::{Endpoint, EntityMappings};

    fn parse(source: &str) -> Vec<Endpoint> {
        let file = source_file("src/main/java/com/acme/UserController.java");
        parse_controller(&file, source, &ctx())
            .iter()
            .map(|c| Aggregator::default().build(c))
            .collect()
    }

    #[test]
    fn test_class_and_method_mapping() {
        let endpoints = parse(
            r#"
            @RestController
            @RequestMapping("/users")
            public class UserController {
                @GetMapping("/{id}")
                public User show(@PathVariable("id") String id) {
                    return service.find(id);
                }
            }
            "#,
        );
        assert_eq!(endpoints.len(), 1);
        let e = &endpoints[0];
        assert_eq!(e.path_template, "/users/{id}");
        assert_eq!(e.http_method, HttpMethod::Get);
        assert_eq!(e.parameters.len(), 1);
        assert_eq!(e.parameters["id"].source, ParameterSource::Path);
        assert_eq!(e.parameters["id"].data_type.as_deref(), Some("String"));
        assert_eq!(e.controller.as_deref(), Some("UserController"));
        assert_eq!(e.action.as_deref(), Some("show"));
        assert_eq!((e.start_line, e.end_line), (5, 8));
    }

    #[test]
    fn test_class_methods_become_variants() {
        let endpoints = parse(
            r#"
            @Controller
            @RequestMapping(value = "/search", method = {RequestMethod.GET, RequestMethod.POST})
            public class SearchController {
                @RequestMapping
                public String search(@RequestParam(value = "q", defaultValue = "*") String query) {
                    return "results";
                }
            }
            "#,
        );
        assert_eq!(endpoints.len(), 1);
        let primary = &endpoints[0];
        assert_eq!(primary.http_method, HttpMethod::Get);
        assert_eq!(primary.variants.len(), 1);
        let variant = &primary.variants[0];
        assert_eq!(variant.http_method, HttpMethod::Post);
        assert_eq!(variant.path_template, "/search");
        assert_eq!(variant.parameters, primary.parameters);
        assert_eq!(primary.parameters["q"].default_value.as_deref(), Some("*"));
        assert_eq!(primary.parameters["q"].source, ParameterSource::Query);
    }

    #[test]
    fn test_method_level_overrides_class_methods() {
        let endpoints = parse(
            r#"
            @RestController
            @RequestMapping(path = "/api", method = RequestMethod.GET)
            class Api {
                @DeleteMapping("items/{id}/")
                void remove(@PathVariable Long id) {}

                @RequestMapping("/health")
                String health() { return "ok"; }
            }
            "#,
        );
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].path_template, "/api/items/{id}");
        assert_eq!(endpoints[0].http_methods(), vec![HttpMethod::Delete]);
        assert_eq!(endpoints[0].parameters["id"].data_type.as_deref(), Some("Long"));
        assert_eq!(endpoints[1].path_template, "/api/health");
        assert_eq!(endpoints[1].http_method, HttpMethod::Get);
    }

    #[test]
    fn test_no_controller_annotation_yields_nothing() {
        let endpoints = parse(
            r#"
            @Service
            public class UserService {
                @GetMapping("/x")
                public void x() {}
            }
            "#,
        );
        assert!(endpoints.is_empty());
    }

    #[test]
    fn test_unmapped_methods_and_nested_braces() {
        let endpoints = parse(
            r#"
            @RestController
            public class C {
                @Autowired
                private Service service;

                private void helper() { if (x) { y(); } }

                @PostMapping(value = "/save", consumes = "application/json")
                public ResponseEntity<Void> save(@RequestBody Order order, @CookieValue("sid") String sid,
                                                 @SessionAttribute("cart") Cart cart) {
                    Runnable r = () -> { helper(); };
                    return ok();
                }
            }
            "#,
        );
        assert_eq!(endpoints.len(), 1);
        let e = &endpoints[0];
        assert_eq!(e.path_template, "/save");
        assert_eq!(e.http_method, HttpMethod::Post);
        assert_eq!(e.consumes, vec!["application/json".to_string()]);
        assert_eq!(e.parameters["order"].source, ParameterSource::Body);
        assert_eq!(e.parameters["sid"].source, ParameterSource::Cookie);
        assert_eq!(e.parameters["cart"].source, ParameterSource::Session);
        assert_eq!(e.bound_model, Some(ModelField::new("Order", "order", false)));
    }

    #[test]
    fn test_binding_result_marks_model_and_authorization() {
        let endpoints = parse(
            r#"
            @Controller
            @PreAuthorize("hasRole('USER')")
            public class OwnerController {
                @PreAuthorize("hasRole('ADMIN')")
                @PostMapping("/owners/new")
                public String create(@Valid Owner owner, BindingResult result, Map<String, Object> model) {
                    return "x";
                }
            }
            "#,
        );
        let e = &endpoints[0];
        assert_eq!(e.bound_model, Some(ModelField::new("Owner", "owner", false)));
        assert_eq!(
            e.authorization.as_deref(),
            Some("hasRole('USER') and hasRole('ADMIN')")
        );
    }

    #[test]
    fn test_authorization_of_unmapped_method_does_not_carry_over() {
        let endpoints = parse(
            r#"
            @RestController
            class AccountController {
                @PreAuthorize("hasRole('ADMIN')")
                public void helper() {}

                @PreAuthorize("hasRole('AUDIT')")
                private int counter;

                @GetMapping("/x")
                public String x() {
                    return "x";
                }
            }
            "#,
        );
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].authorization, None);
    }

    #[test]
    fn test_bound_model_expanded_with_mappings() {
        let mut mappings = EntityMappings::new();
        mappings.add_field("Owner", ModelField::new("String", "getLastName", false));
        let file = source_file("src/OwnerController.java");
        let source = r#"
            @Controller
            class OwnerController {
                @GetMapping("/owners")
                String find(@ModelAttribute Owner owner) { return "x"; }
            }
        "#;
        let context = ctx().with_entity_mappings(Some(&mappings), 4);
        let candidates = parse_controller(&file, source, &context);
        let endpoint = context.aggregator().build(&candidates[0]);
        assert_eq!(endpoint.parameters["lastName"].source, ParameterSource::Body);
    }

    #[test]
    fn test_non_literal_path_reported() {
        let handler = RecordingHandler::default();
        let file = source_file("src/C.java");
        let source = r#"
            @RestController
            class C {
                @GetMapping(Paths.USERS)
                void list() {}
            }
        "#;
        let candidates = parse_controller(&file, source, &ctx().with_events(&handler));
        assert_eq!(candidates[0].sub_paths, vec!["Paths.USERS".to_string()]);
        assert_eq!(handler.constructs(), vec!["non-literal mapping path `Paths.USERS`".to_string()]);
    }

    #[test]
    fn test_interface_methods_without_body() {
        let endpoints = parse(
            r#"
            @RestController
            @RequestMapping("/v1")
            public abstract class Base {
                @GetMapping("/ping")
                public abstract String ping();
            }
            "#,
        );
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].path_template, "/v1/ping");
    }

    #[test]
    fn test_deterministic() {
        let source = r#"
            @RestController
            @RequestMapping({"/a", "/b"})
            class C { @PutMapping("/x") void x(@RequestParam int n) {} }
        "#;
        assert_eq!(parse(source), parse(source));
        assert_eq!(parse(source)[0].all_variants().count(), 2);
    }
}
