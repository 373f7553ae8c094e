//! Django endpoints.
//!
//! Django routes live in `urls.py` modules, apart from the views that handle
//! them, so extraction runs in two steps. [`DjangoExtractor::prepare`] reads
//! every URLconf once per scan, follows `include()` chains from the root
//! modules and records, per views file, which views are routed and under
//! which URL. [`EndpointExtractor::extract`] then parses each routed view.

pub mod admin;
pub mod python;
pub mod urls;
pub mod views;

use routemap_core::errors::ExtractError;
use routemap_core::types::collections::{FxHashMap, FxHashSet};
use routemap_core::types::Framework;

use self::urls::{parse_urlconf, UrlPattern, UrlTarget};
use self::views::{parse_view, ViewTarget};
use super::{EndpointExtractor, ExtractionContext};
use crate::model::path::join_paths;
use crate::model::Endpoint;
use crate::scanner::language_detect::Language;
use crate::scanner::types::SourceFile;
use crate::tokenizer::runner::read_source;
use crate::tokenizer::{Tokenizer, TokenizerOptions};

const URLCONF_FILE: &str = "urls.py";
const ADMIN_FILE: &str = "admin.py";

#[derive(Debug, Default)]
pub struct DjangoExtractor {
    /// Views file (relative path) -> routed views.
    targets: FxHashMap<String, Vec<ViewTarget>>,
    /// Prefixes `admin.site.urls` is routed under.
    admin_prefixes: Vec<String>,
}

impl DjangoExtractor {
    /// Resolve every URLconf in `files`. Unreadable URLconfs are returned and
    /// skipped.
    pub fn prepare(files: &[SourceFile], ctx: &ExtractionContext<'_>) -> (Self, Vec<ExtractError>) {
        let mut errors = Vec::new();
        let mut confs: FxHashMap<&str, (&SourceFile, Vec<UrlPattern>)> = FxHashMap::default();
        for file in files
            .iter()
            .filter(|f| f.language == Language::Python && f.file_name() == URLCONF_FILE)
        {
            match read_source(&file.path) {
                Ok(source) => {
                    let tokens = Tokenizer::tokenize(&source, TokenizerOptions::PYTHON);
                    confs.insert(file.relative_path.as_str(), (file, parse_urlconf(&tokens)));
                }
                Err(e) => errors.push(e),
            }
        }

        let resolver = ModuleResolver::new(files);
        let mut included: FxHashSet<String> = FxHashSet::default();
        for (rel, (_, patterns)) in &confs {
            collect_includes(patterns, rel, &resolver, &mut included);
        }
        let mut roots: Vec<&str> = confs.keys().copied().filter(|rel| !included.contains(*rel)).collect();
        if roots.is_empty() {
            // every URLconf includes another: start from all of them
            roots = confs.keys().copied().collect();
        }
        roots.sort_unstable();

        let mut extractor = Self::default();
        let mut walker = ConfWalker {
            confs: &confs,
            resolver: &resolver,
            ctx,
            extractor: &mut extractor,
            stack: Vec::new(),
        };
        for root in roots {
            walker.walk_module(root, "", &[]);
        }
        tracing::debug!(
            urlconfs = confs.len(),
            view_files = extractor.targets.len(),
            admin = !extractor.admin_prefixes.is_empty(),
            "django urlconfs resolved"
        );
        (extractor, errors)
    }

    /// Routed views in `relative_path`.
    pub fn targets_for(&self, relative_path: &str) -> &[ViewTarget] {
        self.targets.get(relative_path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn admin_prefixes(&self) -> &[String] {
        &self.admin_prefixes
    }
}

impl EndpointExtractor for DjangoExtractor {
    fn framework(&self) -> Framework {
        Framework::Django
    }

    fn matches(&self, file: &SourceFile) -> bool {
        file.language == Language::Python
            && (self.targets.contains_key(&file.relative_path)
                || (!self.admin_prefixes.is_empty() && file.file_name() == ADMIN_FILE))
    }

    fn extract(&self, file: &SourceFile, source: &str, ctx: &ExtractionContext<'_>) -> Vec<Endpoint> {
        let aggregator = ctx.aggregator();
        let mut endpoints = Vec::new();
        for target in self.targets_for(&file.relative_path) {
            match parse_view(file, source, target, ctx) {
                Some(candidate) => endpoints.push(aggregator.build(&candidate)),
                None => ctx.report_partial(
                    file,
                    0,
                    Framework::Django,
                    format!("view `{}` for `{}` not found", target.view, target.path),
                ),
            }
        }
        if !self.admin_prefixes.is_empty() && file.file_name() == ADMIN_FILE {
            let tokens = ctx.tokens(source, TokenizerOptions::PYTHON);
            let registrations = admin::evaluate(source, &tokens);
            for prefix in &self.admin_prefixes {
                endpoints.extend(
                    admin::admin_candidates(file, prefix, &registrations)
                        .iter()
                        .map(|c| aggregator.build(c)),
                );
            }
        }
        endpoints
    }
}

/// Maps dotted module names to files of the scan.
struct ModuleResolver<'f> {
    by_path: FxHashMap<&'f str, &'f SourceFile>,
}

impl<'f> ModuleResolver<'f> {
    fn new(files: &'f [SourceFile]) -> Self {
        Self {
            by_path: files
                .iter()
                .filter(|f| f.language == Language::Python)
                .map(|f| (f.relative_path.as_str(), f))
                .collect(),
        }
    }

    /// File of `module` referenced from the module at `from`.
    ///
    /// Relative modules (`.views`, `..core.views`) resolve against `from`'s
    /// package. Absolute ones are tried under `from`'s directory and then
    /// each parent up to the root.
    fn resolve(&self, module: &str, from: &str) -> Option<&'f SourceFile> {
        let from_dir = from.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        let dots = module.chars().take_while(|c| *c == '.').count();
        if dots > 0 {
            let mut dir = from_dir;
            for _ in 1..dots {
                dir = dir.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("");
            }
            let rest = module[dots..].replace('.', "/");
            return self.lookup(&join_rel(dir, &rest));
        }

        let rel = module.replace('.', "/");
        let mut dir = from_dir;
        loop {
            if let Some(file) = self.lookup(&join_rel(dir, &rel)) {
                return Some(file);
            }
            if dir.is_empty() {
                return None;
            }
            dir = dir.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("");
        }
    }

    fn lookup(&self, stem: &str) -> Option<&'f SourceFile> {
        if stem.is_empty() {
            return self.by_path.get("__init__.py").copied();
        }
        self.by_path
            .get(format!("{stem}.py").as_str())
            .or_else(|| self.by_path.get(format!("{stem}/__init__.py").as_str()))
            .copied()
    }

    /// `(views file, view name)` for a qualified view reference.
    fn resolve_view(&self, reference: &str, from: &str) -> Option<(&'f SourceFile, String)> {
        let (module, view) = reference.rsplit_once('.')?;
        let module = if module.is_empty() { "." } else { module };
        let file = self.resolve(module, from)?;
        Some((file, view.to_string()))
    }
}

fn join_rel(dir: &str, rest: &str) -> String {
    match (dir.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => dir.to_string(),
        (false, false) => format!("{dir}/{rest}"),
    }
}

fn collect_includes(patterns: &[UrlPattern], from: &str, resolver: &ModuleResolver<'_>, out: &mut FxHashSet<String>) {
    for pattern in patterns {
        match &pattern.target {
            UrlTarget::Include(module) => {
                if let Some(file) = resolver.resolve(module, from) {
                    out.insert(file.relative_path.clone());
                }
            }
            UrlTarget::Nested(inner) => collect_includes(inner, from, resolver, out),
            _ => {}
        }
    }
}

struct ConfWalker<'w, 'f> {
    confs: &'w FxHashMap<&'f str, (&'f SourceFile, Vec<UrlPattern>)>,
    resolver: &'w ModuleResolver<'f>,
    ctx: &'w ExtractionContext<'w>,
    extractor: &'w mut DjangoExtractor,
    /// URLconfs on the current include chain.
    stack: Vec<&'f str>,
}

impl<'w, 'f> ConfWalker<'w, 'f> {
    fn walk_module(&mut self, rel: &'f str, prefix: &str, params: &[(String, Option<String>)]) {
        if self.stack.contains(&rel) {
            return;
        }
        let Some((file, patterns)) = self.confs.get(rel) else {
            return;
        };
        let (file, patterns) = (*file, patterns);
        self.stack.push(rel);
        self.walk_patterns(file, patterns, prefix, params);
        self.stack.pop();
    }

    fn walk_patterns(
        &mut self,
        file: &'f SourceFile,
        patterns: &'w [UrlPattern],
        prefix: &str,
        params: &[(String, Option<String>)],
    ) {
        for pattern in patterns {
            if pattern.dynamic_route {
                self.ctx.report_partial(
                    file,
                    pattern.line,
                    Framework::Django,
                    format!("non-literal route `{}`", pattern.route),
                );
            }
            let path = join_paths(prefix, &pattern.route);
            let mut params = params.to_vec();
            params.extend(pattern.params.iter().cloned());

            match &pattern.target {
                UrlTarget::View(reference) => match self.resolver.resolve_view(reference, &file.relative_path) {
                    Some((views_file, view)) => {
                        let targets = self
                            .extractor
                            .targets
                            .entry(views_file.relative_path.clone())
                            .or_default();
                        let target = ViewTarget {
                            path,
                            view,
                            param_types: params,
                        };
                        if !targets.contains(&target) {
                            targets.push(target);
                        }
                    }
                    None => self.ctx.report_partial(
                        file,
                        pattern.line,
                        Framework::Django,
                        format!("unresolved view `{reference}`"),
                    ),
                },
                UrlTarget::Include(module) => match self.resolver.resolve(module, &file.relative_path) {
                    Some(included) if self.confs.contains_key(included.relative_path.as_str()) => {
                        self.walk_module(included.relative_path.as_str(), &path, &params);
                    }
                    _ => self.ctx.report_partial(
                        file,
                        pattern.line,
                        Framework::Django,
                        format!("unresolved include `{module}`"),
                    ),
                },
                UrlTarget::Nested(inner) => self.walk_patterns(file, inner, &path, &params),
                UrlTarget::AdminSite => {
                    if !self.extractor.admin_prefixes.contains(&path) {
                        self.extractor.admin_prefixes.push(path);
                    }
                }
                UrlTarget::Unresolved(expr) => self.ctx.report_partial(
                    file,
                    pattern.line,
                    Framework::Django,
                    format!("unresolved url target `{expr}`"),
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::frameworks::test_support::RecordingHandler;
    use crate::model::{HttpMethod, ParameterSource};

    fn write(root: &Path, rel: &str, content: &str) -> SourceFile {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        SourceFile::new(root, &path, content.len() as u64).unwrap()
    }

    struct Project {
        dir: tempfile::TempDir,
        files: Vec<SourceFile>,
    }

    impl Project {
        fn root(&self) -> &Path {
            self.dir.path()
        }
    }

    fn project() -> Project {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let files = vec![
            write(
                root,
                "mysite/urls.py",
                "from django.contrib import admin\nfrom django.urls import include, path\n\nurlpatterns = [\n    path('blog/', include('blog.urls')),\n    path('admin/', admin.site.urls),\n    path('broken/', include('missing.urls')),\n]\n",
            ),
            write(
                root,
                "blog/urls.py",
                "from django.urls import path\nfrom . import views\n\nurlpatterns = [\n    path('', views.index),\n    path('<int:pk>/', views.PostView.as_view()),\n    path('gone/', views.gone),\n]\n",
            ),
            write(
                root,
                "blog/views.py",
                "def index(request):\n    page = request.GET.get('page')\n    return render(request)\n\n\nclass PostView(View):\n    def get(self, request, pk):\n        return render(request)\n\n    def post(self, request, pk):\n        title = request.POST['title']\n        return redirect('/')\n",
            ),
            write(
                root,
                "blog/admin.py",
                "from django.contrib import admin\nfrom .models import Post\n\nadmin.site.register(Post)\n",
            ),
        ];
        Project { dir, files }
    }

    fn extract_all(
        extractor: &DjangoExtractor,
        files: &[SourceFile],
        ctx: &ExtractionContext<'_>,
    ) -> Vec<Endpoint> {
        files
            .iter()
            .filter(|f| extractor.matches(f))
            .flat_map(|f| extractor.extract(f, &fs::read_to_string(&f.path).unwrap(), ctx))
            .collect()
    }

    #[test]
    fn test_prepare_resolves_include_chain() {
        let project = project();
        let ctx = ExtractionContext::new(project.root());
        let (extractor, errors) = DjangoExtractor::prepare(&project.files, &ctx);
        assert!(errors.is_empty());
        let targets = extractor.targets_for("blog/views.py");
        let paths: Vec<(&str, &str)> = targets.iter().map(|t| (t.path.as_str(), t.view.as_str())).collect();
        assert_eq!(
            paths,
            vec![("/blog", "index"), ("/blog/{pk}", "PostView"), ("/blog/gone", "gone")]
        );
        assert_eq!(targets[1].param_types, vec![("pk".to_string(), Some("int".to_string()))]);
        assert_eq!(extractor.admin_prefixes(), ["/admin".to_string()]);
    }

    #[test]
    fn test_extract_views_and_admin() {
        let project = project();
        let handler = RecordingHandler::default();
        let ctx = ExtractionContext::new(project.root()).with_events(&handler);
        let (extractor, _) = DjangoExtractor::prepare(&project.files, &ctx);
        let endpoints = extract_all(&extractor, &project.files, &ctx);

        let index = endpoints.iter().find(|e| e.path_template == "/blog").unwrap();
        assert_eq!(index.http_method, HttpMethod::Get);
        assert_eq!(index.parameters["page"].source, ParameterSource::Query);

        let post = endpoints.iter().find(|e| e.path_template == "/blog/{pk}").unwrap();
        assert_eq!(post.http_methods(), vec![HttpMethod::Get, HttpMethod::Post]);
        assert_eq!(post.parameters["pk"].data_type.as_deref(), Some("int"));
        assert_eq!(post.parameters["title"].source, ParameterSource::Body);

        assert!(endpoints
            .iter()
            .any(|e| e.path_template == "/admin/blog/post/{object_id}/change"));

        let constructs = handler.constructs();
        assert!(constructs.iter().any(|c| c == "unresolved include `missing.urls`"));
        assert!(constructs.iter().any(|c| c == "view `gone` for `/blog/gone` not found"));
    }

    #[test]
    fn test_unreadable_urlconf_is_reported() {
        let root = Path::new("/nonexistent-routemap-root");
        let file = SourceFile::new(root, &root.join("app/urls.py"), 0).unwrap();
        let (extractor, errors) = DjangoExtractor::prepare(&[file], &ExtractionContext::new(root));
        assert_eq!(errors.len(), 1);
        assert!(extractor.targets.is_empty());
    }

    #[test]
    fn test_module_resolver() {
        let root = Path::new("/app");
        let files: Vec<SourceFile> = ["src/shop/urls.py", "src/shop/views/__init__.py", "src/core/api.py"]
            .iter()
            .map(|rel| SourceFile::new(root, &root.join(rel), 0).unwrap())
            .collect();
        let resolver = ModuleResolver::new(&files);
        let from = "src/shop/urls.py";
        assert_eq!(resolver.resolve(".views", from).unwrap().relative_path, "src/shop/views/__init__.py");
        assert_eq!(resolver.resolve("..core.api", from).unwrap().relative_path, "src/core/api.py");
        assert_eq!(resolver.resolve("core.api", from).unwrap().relative_path, "src/core/api.py");
        assert!(resolver.resolve("nowhere", from).is_none());
        let (file, view) = resolver.resolve_view("shop.views.detail", from).unwrap();
        assert_eq!((file.relative_path.as_str(), view.as_str()), ("src/shop/views/__init__.py", "detail"));
    }
}
