//! End-to-end scans over small polyglot source trees.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use routemap_analysis::model::{EndpointSet, HttpMethod, ParameterSource};
use routemap_analysis::Scanner;
use routemap_core::config::{RoutemapConfig, CONFIG_FILE_NAME};
use routemap_core::errors::ExtractError;
use routemap_core::events::{ExtractionEventHandler, NoOpHandler, PartialCoverage, ScanSummary};
use routemap_core::types::Framework;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

const ORDER_CONTROLLER: &str = r#"package shop.web;

@RestController
@RequestMapping("/orders")
public class OrderController {
    @PostMapping
    public Order create(@RequestBody Order order) {
        return order;
    }

    @GetMapping("/{id}")
    public Order show(@PathVariable Long id) {
        return null;
    }
}
"#;

const ORDER_ENTITY: &str = r#"package shop.model;

public class Order {
    private Long id;
    private String name;

    public Long getId() { return id; }
    public String getName() { return name; }
}
"#;

const ROUTES: &str = r#"Rails.application.routes.draw do
  resources :items, only: [:index, :show]
  mount Sidekiq::Web => '/sidekiq'
end
"#;

const PRODUCTS_CONTROLLER: &str = r#"using Microsoft.AspNetCore.Mvc;

[ApiController]
[Route("api/[controller]")]
public class ProductsController : ControllerBase
{
    [HttpGet("{id:int}")]
    public IActionResult Get(int id) => Ok();
}
"#;

fn polyglot(root: &Path) {
    write(root, "java/src/shop/web/OrderController.java", ORDER_CONTROLLER);
    write(root, "java/src/shop/model/Order.java", ORDER_ENTITY);
    write(root, "config/routes.rb", ROUTES);
    write(root, "mysite/urls.py", "from django.urls import path\nfrom . import views\n\nurlpatterns = [\n    path('hello/<slug:name>/', views.hello),\n]\n");
    write(root, "mysite/views.py", "def hello(request, name):\n    lang = request.GET.get('lang')\n    return HttpResponse(name)\n");
    write(root, "dotnet/Controllers/ProductsController.cs", PRODUCTS_CONTROLLER);
    write(root, "node_modules/pkg/urls.py", "urlpatterns = [path('ignored/', views.x)]\n");
}

fn find<'a>(set: &'a EndpointSet, path: &str, method: HttpMethod) -> &'a routemap_analysis::Endpoint {
    set.iter_all()
        .find(|e| e.path_template == path && e.http_method == method)
        .unwrap_or_else(|| panic!("no {method} {path} in {:?}", set.iter_all().map(|e| &e.path_template).collect::<Vec<_>>()))
}

#[derive(Default)]
struct Recorder {
    partial: Mutex<Vec<PartialCoverage>>,
    extracted: Mutex<usize>,
    summary: Mutex<Option<ScanSummary>>,
    errors: Mutex<usize>,
}

impl ExtractionEventHandler for Recorder {
    fn on_file_extracted(&self, _path: &Path, _endpoints: usize) {
        *self.extracted.lock().unwrap() += 1;
    }

    fn on_file_error(&self, _error: &ExtractError) {
        *self.errors.lock().unwrap() += 1;
    }

    fn on_partial_coverage(&self, event: &PartialCoverage) {
        self.partial.lock().unwrap().push(event.clone());
    }

    fn on_scan_complete(&self, summary: &ScanSummary) {
        *self.summary.lock().unwrap() = Some(summary.clone());
    }
}

#[test]
fn test_polyglot_scan() {
    let dir = tempfile::tempdir().unwrap();
    polyglot(dir.path());

    let recorder = Recorder::default();
    let output = Scanner::from_root(dir.path()).unwrap().scan(dir.path(), &recorder).unwrap();

    assert!(output.errors.is_empty());
    assert_eq!(
        output.summary.frameworks,
        vec![Framework::Spring, Framework::Django, Framework::Rails, Framework::DotNet]
    );

    let create = find(&output.endpoints, "/orders", HttpMethod::Post);
    assert_eq!(create.framework, Framework::Spring);
    assert_eq!(create.parameters["order"].source, ParameterSource::Body);
    // bound model flattened through the discovered Order bean
    assert_eq!(create.parameters["name"].source, ParameterSource::Body);
    assert_eq!(create.parameters["name"].data_type.as_deref(), Some("String"));

    let show = find(&output.endpoints, "/orders/{id}", HttpMethod::Get);
    assert_eq!(show.parameters["id"].source, ParameterSource::Path);

    let items = find(&output.endpoints, "/items/:id", HttpMethod::Get);
    assert_eq!(items.action.as_deref(), Some("show"));
    find(&output.endpoints, "/items", HttpMethod::Get);

    let hello = find(&output.endpoints, "/hello/{name}", HttpMethod::Get);
    assert_eq!(hello.framework, Framework::Django);
    assert_eq!(hello.parameters["lang"].source, ParameterSource::Query);

    let product = find(&output.endpoints, "/api/Products/{id:int}", HttpMethod::Get);
    assert_eq!(product.framework, Framework::DotNet);
    assert_eq!(product.relative_file_path, "dotnet/Controllers/ProductsController.cs");

    assert!(output.endpoints.iter_all().all(|e| !e.relative_file_path.starts_with("node_modules")));

    let partial = recorder.partial.lock().unwrap();
    assert!(partial.iter().any(|p| p.framework == Framework::Rails && p.construct.starts_with("mount")));
    let summary = recorder.summary.lock().unwrap().clone().unwrap();
    assert_eq!(summary, output.summary);
    assert_eq!(summary.endpoints, output.endpoints.len());
    assert_eq!(*recorder.extracted.lock().unwrap(), summary.files_parsed);
}

#[test]
fn test_config_restricts_frameworks_and_disables_expansion() {
    let dir = tempfile::tempdir().unwrap();
    polyglot(dir.path());
    write(
        dir.path(),
        CONFIG_FILE_NAME,
        "[extraction]\nframeworks = [\"spring\"]\nexpand_models = false\n",
    );

    let output = Scanner::from_root(dir.path()).unwrap().scan(dir.path(), &NoOpHandler).unwrap();
    assert_eq!(output.summary.frameworks, vec![Framework::Spring]);
    assert!(output.endpoints.iter_all().all(|e| e.framework == Framework::Spring));

    let create = find(&output.endpoints, "/orders", HttpMethod::Post);
    assert!(!create.parameters.contains_key("name"));
    assert_eq!(create.bound_model.as_ref().map(|m| m.field_type.as_str()), Some("Order"));
}

#[test]
fn test_entity_mapping_table_from_config() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/OrderController.java", ORDER_CONTROLLER);
    write(
        dir.path(),
        "mappings.json",
        r#"{"Order": [{"type": "String", "name": "reference"}, {"type": "Address", "name": "shipTo"}],
            "Address": [{"type": "String", "name": "city"}]}"#,
    );
    let mut config = RoutemapConfig::default();
    config.extraction.entity_mappings = Some("mappings.json".into());
    config.extraction.scan_java_entities = false;

    let output = Scanner::new(config).scan(dir.path(), &NoOpHandler).unwrap();
    let create = find(&output.endpoints, "/orders", HttpMethod::Post);
    assert_eq!(create.parameters["reference"].source, ParameterSource::Body);
    assert_eq!(create.parameters["shipTo.city"].source, ParameterSource::Body);
}

#[test]
fn test_scan_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    polyglot(dir.path());
    let scanner = Scanner::new(RoutemapConfig::default());
    let first = scanner.scan(dir.path(), &NoOpHandler).unwrap().endpoints.into_sorted_vec();
    let second = scanner.scan(dir.path(), &NoOpHandler).unwrap().endpoints.into_sorted_vec();
    assert_eq!(first, second);
}

#[test]
fn test_find_matching_for_finding_correlation() {
    let dir = tempfile::tempdir().unwrap();
    polyglot(dir.path());
    let output = Scanner::new(RoutemapConfig::default()).scan(dir.path(), &NoOpHandler).unwrap();

    let hits = output.endpoints.find_matching("/items/42", Some(HttpMethod::Get));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].controller.as_deref(), Some("items"));

    let hits = output.endpoints.find_matching("/orders/7", None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].action.as_deref(), Some("show"));
}

#[test]
fn test_missing_root() {
    let err = Scanner::new(RoutemapConfig::default())
        .scan(Path::new("/definitely/not/here"), &NoOpHandler)
        .unwrap_err();
    assert!(matches!(err, routemap_core::errors::ScanError::RootNotFound(_)));
}
