//! Routes DSL state machine.
//!
//! Tokens are assembled into statements (a line change at top level ends one
//! unless the line ends in `,` or `\`; `do`, `end` and `;` end one too). Each
//! statement either adds a node to the [`RouteTree`], opens a block whose
//! children nest under it, or closes the innermost block on `end`.

use routemap_core::types::Framework;

use super::routes::{all_methods, default_actions, pluralize, Methods, NodeKind, RouteNode, RouteTree, ROOT};
use super::ruby::{parse_args, CallArgs, RubyValue};
use crate::aggregate::EndpointCandidate;
use crate::frameworks::ExtractionContext;
use crate::model::HttpMethod;
use crate::scanner::types::SourceFile;
use crate::scope::ScopeTracker;
use crate::tokenizer::runner::TokenConsumer;
use crate::tokenizer::{Token, TokenizerOptions};

/// Statements that open a block without `do`.
const CONTROL_KEYWORDS: &[&str] = &["if", "unless", "while", "until", "case", "begin", "for"];
/// Trailing statement modifiers: `get :x if feature?`.
const MODIFIERS: &[&str] = &["if", "unless", "while", "until"];
/// Constructs that route to code this parser cannot see.
const OPAQUE_CALLS: &[&str] = &["mount", "devise_for", "draw", "direct", "resolve", "use_doorkeeper"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Collecting statement tokens.
    Statement,
    /// After `do`: skipping the `|args|` of a block, if any.
    BlockParams { line: u32, open: bool },
}

/// One open `do`/control block.
#[derive(Debug, Clone)]
struct Frame {
    node: usize,
    /// Extra resources declared by the same statement (`resources :a, :b do`);
    /// the block body is copied to each of them when the block closes.
    siblings: Vec<usize>,
}

pub struct RoutesParser<'f, 'c> {
    file: &'f SourceFile,
    ctx: ExtractionContext<'c>,
    tree: RouteTree,
    frames: Vec<Frame>,
    state: State,
    scope: ScopeTracker,
    statement: Vec<Token>,
    last_line: u32,
    done: bool,
}

impl<'f, 'c> RoutesParser<'f, 'c> {
    pub fn new(file: &'f SourceFile, ctx: ExtractionContext<'c>) -> Self {
        Self {
            file,
            ctx,
            tree: RouteTree::new(),
            frames: Vec::new(),
            state: State::Statement,
            scope: ScopeTracker::new(),
            statement: Vec::new(),
            last_line: 0,
            done: false,
        }
    }

    pub fn into_tree(self) -> RouteTree {
        self.tree
    }

    fn parent(&self) -> usize {
        self.frames.last().map_or(ROOT, |f| f.node)
    }

    fn ends_statement_at(&self, token: &Token) -> bool {
        if self.statement.is_empty() || !self.scope.is_top_level() || token.line <= self.last_line {
            return false;
        }
        !self
            .statement
            .last()
            .is_some_and(|t| t.is_punct(',') || t.is_punct('\\') || t.is_punct('.'))
    }

    /// `do` / `end` as keywords, not `:end` or `x.end`.
    fn is_keyword(&self, token: &Token, keyword: &str) -> bool {
        token.is_word(keyword)
            && self.scope.is_top_level()
            && !self
                .statement
                .last()
                .is_some_and(|t| t.is_punct(':') || t.is_punct('.'))
    }

    fn finish_statement(&mut self, opens_block: bool) {
        let tokens = std::mem::take(&mut self.statement);
        self.scope.reset();
        if tokens.is_empty() {
            if opens_block {
                self.open(RouteNode::new(NodeKind::Block, "", self.last_line), Vec::new());
            }
            return;
        }
        self.handle_statement(&tokens, opens_block);
    }

    fn open(&mut self, node: RouteNode, siblings: Vec<usize>) -> usize {
        let parent = self.parent();
        let idx = self.tree.add(parent, node);
        self.frames.push(Frame { node: idx, siblings });
        idx
    }

    fn close(&mut self) {
        if let Some(frame) = self.frames.pop() {
            for sibling in frame.siblings {
                self.tree.clone_children(frame.node, sibling);
            }
        }
    }

    fn handle_statement(&mut self, tokens: &[Token], opens_block: bool) {
        let line = tokens[0].line;
        let Some(keyword) = tokens[0].word() else {
            if opens_block {
                self.open(RouteNode::new(NodeKind::Block, "", line), Vec::new());
            }
            return;
        };

        if CONTROL_KEYWORDS.contains(&keyword) {
            self.open(RouteNode::new(NodeKind::Block, keyword, line), Vec::new());
            return;
        }

        let body = strip_modifier(&tokens[1..]);
        let args = parse_args(body);
        match keyword {
            "resources" | "resource" => {
                let kind = if keyword == "resources" { NodeKind::Resources } else { NodeKind::Resource };
                self.resources(kind, &args, line, opens_block);
            }
            "namespace" => {
                let name = args.first_name().unwrap_or_default().to_string();
                let mut node = RouteNode::new(NodeKind::Namespace, name.clone(), line);
                node.path = args.option_name("path").map(str::to_string);
                node.module = Some(args.option_name("module").unwrap_or(&name).to_string());
                self.node_or_block(node, opens_block);
            }
            "scope" => {
                let mut node = RouteNode::new(NodeKind::Scope, "", line);
                node.path = args
                    .positional
                    .first()
                    .and_then(RubyValue::as_name)
                    .or_else(|| args.option_name("path"))
                    .map(str::to_string);
                node.module = args.option_name("module").map(str::to_string);
                node.controller = args.option_name("controller").map(str::to_string);
                self.node_or_block(node, opens_block);
            }
            "controller" => {
                let mut node = RouteNode::new(NodeKind::Controller, "", line);
                node.controller = args.first_name().map(str::to_string);
                self.node_or_block(node, opens_block);
            }
            "member" | "collection" => {
                let kind = if keyword == "member" { NodeKind::Member } else { NodeKind::Collection };
                self.node_or_block(RouteNode::new(kind, "", line), opens_block);
            }
            "concern" => {
                let name = args.first_name().unwrap_or_default();
                self.node_or_block(RouteNode::new(NodeKind::Concern, name, line), opens_block);
            }
            "concerns" => {
                let names: Vec<String> = args
                    .positional
                    .iter()
                    .flat_map(|v| v.names())
                    .map(str::to_string)
                    .collect();
                let target = self.parent();
                self.apply_concerns(&names, target, line);
                self.open_plain_block(opens_block, line);
            }
            "root" => {
                let mut node = RouteNode::new(NodeKind::RootRoute, "root", line);
                let to = args.option_name("to").or_else(|| args.first_name());
                self.bind_target(&mut node, to, &args);
                let parent = self.parent();
                self.tree.add(parent, node);
                self.open_plain_block(opens_block, line);
            }
            "get" | "post" | "put" | "patch" | "delete" | "options" | "head" | "match" => {
                self.verb(keyword, &args, line);
                self.open_plain_block(opens_block, line);
            }
            _ if OPAQUE_CALLS.contains(&keyword) => {
                let target: String = body.iter().map(Token::source_text).collect();
                let construct = if target.is_empty() { keyword.to_string() } else { format!("{keyword} {target}") };
                self.ctx.report_partial(self.file, line, Framework::Rails, construct);
                self.open_plain_block(opens_block, line);
            }
            _ => self.open_plain_block(opens_block, line),
        }
    }

    fn open_plain_block(&mut self, opens_block: bool, line: u32) {
        if opens_block {
            self.open(RouteNode::new(NodeKind::Block, "", line), Vec::new());
        }
    }

    fn node_or_block(&mut self, node: RouteNode, opens_block: bool) {
        if opens_block {
            self.open(node, Vec::new());
        } else {
            let parent = self.parent();
            self.tree.add(parent, node);
        }
    }

    fn resources(&mut self, kind: NodeKind, args: &CallArgs, line: u32, opens_block: bool) {
        let names: Vec<String> = args
            .positional
            .iter()
            .flat_map(|v| v.names())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            if let Some(RubyValue::Other(text)) = args.positional.first() {
                self.ctx
                    .report_partial(self.file, line, Framework::Rails, format!("dynamic resource `{text}`"));
            }
            self.open_plain_block(opens_block, line);
            return;
        }

        let only = args.option("only").map(|v| v.names());
        let except = args.option("except").map(|v| v.names()).unwrap_or_default();
        let concerns: Vec<String> = args
            .option("concerns")
            .map(|v| v.names().into_iter().map(str::to_string).collect())
            .unwrap_or_default();

        let parent = self.parent();
        let mut created = Vec::with_capacity(names.len());
        for name in &names {
            let mut node = RouteNode::new(kind, name.as_str(), line);
            node.path = args.option_name("path").map(str::to_string);
            node.module = args.option_name("module").map(str::to_string);
            node.param = args.option_name("param").map(str::to_string);
            node.controller = Some(match args.option_name("controller") {
                Some(controller) => controller.to_string(),
                None if kind == NodeKind::Resource => pluralize(name),
                None => name.clone(),
            });
            node.actions = default_actions(kind)
                .iter()
                .map(|(action, _, _)| *action)
                .filter(|action| only.as_ref().map_or(true, |o| o.contains(action)))
                .filter(|action| !except.contains(action))
                .collect();
            let idx = self.tree.add(parent, node);
            self.apply_concerns(&concerns, idx, line);
            created.push(idx);
        }

        if opens_block {
            let node = created.pop().unwrap_or(parent);
            self.frames.push(Frame { node, siblings: created });
        }
    }

    fn apply_concerns(&mut self, names: &[String], target: usize, line: u32) {
        for name in names {
            match self.tree.concern(name) {
                Some(concern) if self.tree.ancestors(target).any(|i| i == concern) => self
                    .ctx
                    .report_partial(self.file, line, Framework::Rails, format!("recursive concern `{name}`")),
                Some(concern) => self.tree.clone_children(concern, target),
                None => self
                    .ctx
                    .report_partial(self.file, line, Framework::Rails, format!("undefined concern `{name}`")),
            }
        }
    }

    fn verb(&mut self, keyword: &str, args: &CallArgs, line: u32) {
        let methods: Methods = if keyword == "match" {
            match args.option("via") {
                Some(via) if via.names().contains(&"all") => all_methods(),
                Some(via) => via.names().iter().filter_map(|m| HttpMethod::from_source(m)).collect(),
                None => all_methods(),
            }
        } else {
            keyword.parse::<HttpMethod>().into_iter().collect()
        };

        let scope = self.parent();
        let parent = match args.option_name("on") {
            Some("member") => self.tree.add(scope, RouteNode::new(NodeKind::Member, "", line)),
            Some("collection") => self.tree.add(scope, RouteNode::new(NodeKind::Collection, "", line)),
            _ => scope,
        };

        let paths: Vec<&RubyValue> = match args.positional.as_slice() {
            [] => vec![],
            [RubyValue::Array(items)] => items.iter().collect(),
            values => values.iter().collect(),
        };
        if paths.is_empty() {
            self.add_verb(parent, None, methods, args, line);
            return;
        }
        for value in paths {
            match value {
                RubyValue::Symbol(name) | RubyValue::Str(name) => {
                    let is_symbol = matches!(value, RubyValue::Symbol(_));
                    self.add_verb(parent, Some((name.as_str(), is_symbol)), methods.clone(), args, line);
                }
                RubyValue::Other(text) => self.ctx.report_partial(
                    self.file,
                    line,
                    Framework::Rails,
                    format!("dynamic route path `{text}`"),
                ),
                RubyValue::Array(_) => {}
            }
        }
    }

    fn add_verb(&mut self, parent: usize, path: Option<(&str, bool)>, methods: Methods, args: &CallArgs, line: u32) {
        let mut node = RouteNode::new(NodeKind::Verb, path.map(|(p, _)| p).unwrap_or_default(), line);
        node.methods = methods;
        node.path = path.map(|(p, _)| p.to_string());
        if let Some(custom) = args.option_name("path") {
            node.path = Some(custom.to_string());
        }

        let to = args.option_name("to");
        if to.is_none() && args.option("to").is_some() {
            self.ctx
                .report_partial(self.file, line, Framework::Rails, "route to a rack application");
        }
        self.bind_target(&mut node, to, args);

        if node.action.is_none() {
            if let Some((path, is_symbol)) = path {
                let has_scope_controller = self.tree.scope_controller(parent).is_some() || node.controller.is_some();
                match path.trim_matches('/').rsplit_once('/') {
                    // `get 'photos/search'` routes to photos#search
                    Some((controller, action)) if !is_symbol && !has_scope_controller && !action.starts_with([':', '*']) => {
                        node.controller = Some(controller.to_string());
                        node.action = Some(action.to_string());
                    }
                    _ => node.action = last_literal_segment(path),
                }
            }
        }
        self.tree.add(parent, node);
    }

    /// Apply `to: 'controller#action'` plus explicit `controller:` / `action:`.
    fn bind_target(&self, node: &mut RouteNode, to: Option<&str>, args: &CallArgs) {
        if let Some(to) = to {
            match to.split_once('#') {
                Some((controller, action)) => {
                    if !controller.is_empty() {
                        node.controller = Some(controller.to_string());
                    }
                    node.action = Some(action.to_string());
                }
                None => node.action = Some(to.to_string()),
            }
        }
        if let Some(controller) = args.option_name("controller") {
            node.controller = Some(controller.to_string());
        }
        if let Some(action) = args.option_name("action") {
            node.action = Some(action.to_string());
        }
    }
}

impl TokenConsumer for RoutesParser<'_, '_> {
    fn process_token(&mut self, token: &Token) {
        if token.is_eof() {
            self.finish_statement(false);
            while !self.frames.is_empty() {
                self.close();
            }
            self.done = true;
            return;
        }

        if let State::BlockParams { line, open } = self.state {
            if token.is_punct('|') && (open || token.line == line) {
                self.state = if open { State::Statement } else { State::BlockParams { line, open: true } };
                return;
            }
            if open {
                return;
            }
            self.state = State::Statement;
        }

        if self.ends_statement_at(token) {
            self.finish_statement(false);
        }

        if self.is_keyword(token, "do") {
            self.finish_statement(true);
            self.state = State::BlockParams { line: token.line, open: false };
            self.last_line = token.line;
            return;
        }
        if self.is_keyword(token, "end") && (self.statement.is_empty() || self.ends_statement_before_end()) {
            self.finish_statement(false);
            self.close();
            self.last_line = token.line;
            return;
        }
        if token.is_punct(';') && self.scope.is_top_level() {
            self.finish_statement(false);
            self.last_line = token.line;
            return;
        }

        self.scope.interpret_token(token);
        self.statement.push(token.clone());
        self.last_line = token.line;
    }

    fn should_continue(&self) -> bool {
        !self.done
    }
}

impl RoutesParser<'_, '_> {
    /// `get :x end` on one line: `end` cannot continue an argument list.
    fn ends_statement_before_end(&self) -> bool {
        !self.statement.last().is_some_and(|t| t.is_punct(',') || t.is_punct('('))
    }
}

/// Drop a trailing `if cond` / `unless cond` modifier.
fn strip_modifier(tokens: &[Token]) -> &[Token] {
    let mut scope = ScopeTracker::new();
    for (i, token) in tokens.iter().enumerate() {
        if scope.is_top_level() && token.word().is_some_and(|w| MODIFIERS.contains(&w)) {
            return &tokens[..i];
        }
        scope.interpret_token(token);
    }
    tokens
}

fn last_literal_segment(path: &str) -> Option<String> {
    path.split('/')
        .rev()
        .find(|s| !s.is_empty() && !s.starts_with([':', '*', '(']))
        .map(|s| s.trim_end_matches(|c| c == ')' || c == '(').to_string())
}

/// Parse a routes file into candidates.
pub fn parse_routes(file: &SourceFile, source: &str, ctx: &ExtractionContext<'_>) -> Vec<EndpointCandidate> {
    let mut parser = RoutesParser::new(file, *ctx);
    ctx.run(source, TokenizerOptions::RUBY, &mut parser);
    parser.into_tree().candidates(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frameworks::test_support::{ctx, source_file, RecordingHandler};

    fn routes(source: &str) -> Vec<EndpointCandidate> {
        parse_routes(&source_file("config/routes.rb"), source, &ctx())
    }

    fn summary(candidates: &[EndpointCandidate]) -> Vec<(String, Vec<HttpMethod>, String)> {
        candidates
            .iter()
            .map(|c| {
                (
                    c.effective_paths()[0].clone(),
                    c.effective_methods(),
                    format!("{}#{}", c.controller.as_deref().unwrap_or("?"), c.action.as_deref().unwrap_or("?")),
                )
            })
            .collect()
    }

    fn find<'a>(candidates: &'a [EndpointCandidate], path: &str, method: HttpMethod) -> &'a EndpointCandidate {
        candidates
            .iter()
            .find(|c| c.effective_paths()[0] == path && c.effective_methods().contains(&method))
            .unwrap_or_else(|| panic!("no {method} {path} in {:?}", summary(candidates)))
    }

    #[test]
    fn test_member_route_under_resources() {
        let c = routes("Rails.application.routes.draw do\n  resources :items do\n    member do\n      get :preview\n    end\n  end\nend\n");
        let preview = find(&c, "/items/:id/preview", HttpMethod::Get);
        assert_eq!(preview.controller.as_deref(), Some("items"));
        assert_eq!(preview.action.as_deref(), Some("preview"));
        assert_eq!(preview.start_line, 4);
        assert_eq!(c.len(), 8);
    }

    #[test]
    fn test_one_line_blocks() {
        let c = routes("resources :items do member do get :preview end end\nget 'about', to: 'pages#about'\n");
        find(&c, "/items/:id/preview", HttpMethod::Get);
        let about = find(&c, "/about", HttpMethod::Get);
        assert_eq!(about.controller.as_deref(), Some("pages"));
        assert_eq!(about.start_line, 2);
    }

    #[test]
    fn test_resources_defaults_and_filters() {
        let c = routes("resources :photos, only: [:index, :show]\nresource :profile, except: :destroy\n");
        assert_eq!(
            summary(&c),
            vec![
                ("/photos".to_string(), vec![HttpMethod::Get], "photos#index".to_string()),
                ("/photos/:id".to_string(), vec![HttpMethod::Get], "photos#show".to_string()),
                ("/profile".to_string(), vec![HttpMethod::Post], "profiles#create".to_string()),
                ("/profile/new".to_string(), vec![HttpMethod::Get], "profiles#new".to_string()),
                ("/profile/edit".to_string(), vec![HttpMethod::Get], "profiles#edit".to_string()),
                ("/profile".to_string(), vec![HttpMethod::Get], "profiles#show".to_string()),
                ("/profile".to_string(), vec![HttpMethod::Patch, HttpMethod::Put], "profiles#update".to_string()),
            ]
        );
    }

    #[test]
    fn test_namespace_scope_and_nested_resources() {
        let src = r#"
Rails.application.routes.draw do
  namespace :admin do
    resources :users, param: :slug do
      resources :posts, only: :index
      get :stats, on: :collection
    end
  end
  scope '/api', module: 'api' do
    resources :tokens, only: [:create], controller: 'auth_tokens'
  end
end
"#;
        let c = routes(src);
        let posts = find(&c, "/admin/users/:user_slug/posts", HttpMethod::Get);
        assert_eq!(posts.controller.as_deref(), Some("admin/posts"));
        let show = find(&c, "/admin/users/:slug", HttpMethod::Get);
        assert_eq!(show.action.as_deref(), Some("show"));
        let stats = find(&c, "/admin/users/stats", HttpMethod::Get);
        assert_eq!(stats.controller.as_deref(), Some("admin/users"));
        let tokens = find(&c, "/api/tokens", HttpMethod::Post);
        assert_eq!(tokens.controller.as_deref(), Some("api/auth_tokens"));
    }

    #[test]
    fn test_verb_forms() {
        let src = r#"
root 'home#index'
get 'photos/search'
match 'legacy' => 'legacy#show', via: [:get, :post]
post '/login', controller: 'sessions', action: 'create'
controller :reports do
  get 'reports/daily', action: :daily
end
"#;
        let c = routes(src);
        assert_eq!(find(&c, "/", HttpMethod::Get).controller.as_deref(), Some("home"));
        let search = find(&c, "/photos/search", HttpMethod::Get);
        assert_eq!(search.controller.as_deref(), Some("photos"));
        assert_eq!(search.action.as_deref(), Some("search"));
        let legacy = find(&c, "/legacy", HttpMethod::Post);
        assert_eq!(legacy.effective_methods(), vec![HttpMethod::Get, HttpMethod::Post]);
        assert_eq!(find(&c, "/login", HttpMethod::Post).controller.as_deref(), Some("sessions"));
        let daily = find(&c, "/reports/daily", HttpMethod::Get);
        assert_eq!(daily.controller.as_deref(), Some("reports"));
        assert_eq!(daily.action.as_deref(), Some("daily"));
    }

    #[test]
    fn test_concerns_are_cloned_per_use() {
        let src = r#"
concern :commentable do
  resources :comments, only: [:index]
end
resources :posts, concerns: :commentable
resources :videos do
  concerns :commentable
end
"#;
        let c = routes(src);
        find(&c, "/posts/:post_id/comments", HttpMethod::Get);
        find(&c, "/videos/:video_id/comments", HttpMethod::Get);
        assert!(!c.iter().any(|e| e.effective_paths()[0] == "/comments"));
    }

    #[test]
    fn test_verb_without_path_routes_to_its_scope() {
        let src = "resources :photos, only: [] do\n  member do\n    match to: 'photos#touch', via: [:patch, :put]\n  end\nend\n";
        let c = routes(src);
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].effective_paths(), vec!["/photos/:id".to_string()]);
        assert_eq!(c[0].methods, vec![HttpMethod::Patch, HttpMethod::Put]);
        assert_eq!(c[0].action.as_deref(), Some("touch"));
    }

    #[test]
    fn test_self_referencing_concern_is_reported() {
        let handler = RecordingHandler::default();
        let ctx = ctx().with_events(&handler);
        let src = "concern :c do\n  resources :x, concerns: :c\n  concerns :c\nend\nresources :posts, concerns: :c\n";
        let c = parse_routes(&source_file("config/routes.rb"), src, &ctx);
        assert_eq!(handler.constructs(), vec!["recursive concern `c`", "recursive concern `c`"]);
        find(&c, "/posts/:post_id/x", HttpMethod::Get);
    }

    #[test]
    fn test_control_flow_and_multi_resource_blocks() {
        let src = r#"
if Rails.env.development?
  get 'debug', to: 'debug#show'
end
resources :books, :magazines do
  get :preview, on: :member
end
get 'beta', to: 'beta#index' if ENV['BETA']
"#;
        let c = routes(src);
        find(&c, "/debug", HttpMethod::Get);
        find(&c, "/books/:id/preview", HttpMethod::Get);
        let mag = find(&c, "/magazines/:id/preview", HttpMethod::Get);
        assert_eq!(mag.controller.as_deref(), Some("magazines"));
        find(&c, "/beta", HttpMethod::Get);
    }

    #[test]
    fn test_opaque_constructs_reported() {
        let handler = RecordingHandler::default();
        let ctx = ctx().with_events(&handler);
        let src = "mount Sidekiq::Web => '/sidekiq'\ndevise_for :users\nresources :posts, concerns: :missing, only: []\n";
        let c = parse_routes(&source_file("config/routes.rb"), src, &ctx);
        assert!(c.is_empty());
        let constructs = handler.constructs();
        assert_eq!(constructs.len(), 3);
        assert!(constructs[0].starts_with("mount"));
        assert_eq!(constructs[1], "devise_for :users");
        assert_eq!(constructs[2], "undefined concern `missing`");
    }

    #[test]
    fn test_unbalanced_input_terminates() {
        let c = routes("resources :a do\n  resources :b, only: [:index\n");
        assert!(c.iter().all(|e| e.controller.is_some()));
    }
}
