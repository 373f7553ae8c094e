//! Property tests: path normalization invariants and parse determinism.

use std::path::Path;

use proptest::prelude::*;
use routemap_analysis::frameworks::rails::parse_routes;
use routemap_analysis::frameworks::ExtractionContext;
use routemap_analysis::model::path::{join_paths, normalize_path, path_parameters, template_matches};
use routemap_analysis::scanner::types::SourceFile;
use routemap_analysis::tokenizer::{Tokenizer, TokenizerOptions};

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9_]{0,8}",
        "[a-z]{1,6}".prop_map(|s| format!("{{{s}}}")),
        "[a-z]{1,6}".prop_map(|s| format!(":{s}")),
    ]
}

fn raw_path() -> impl Strategy<Value = String> {
    prop::collection::vec((segment(), "/{1,3}"), 0..6).prop_map(|parts| {
        parts
            .into_iter()
            .map(|(segment, slashes)| format!("{slashes}{segment}"))
            .collect::<String>()
    })
}

const RUBY_KEYWORDS: &[&str] = &[
    "do", "end", "if", "unless", "while", "until", "and", "or", "not", "in", "then", "def", "class",
    "module", "begin", "rescue", "ensure", "case", "when", "else", "elsif", "yield", "return", "nil",
    "true", "false", "self", "for", "redo", "retry", "super", "next", "break", "undef", "alias",
];

fn resource_name() -> impl Strategy<Value = String> {
    "[a-z]{2,8}".prop_filter("ruby keyword", |name| !RUBY_KEYWORDS.contains(&name.as_str()))
}

proptest! {
    #[test]
    fn test_normalized_paths_are_canonical(raw in raw_path(), trailing in "/{0,2}") {
        let path = normalize_path(&format!("{raw}{trailing}"));
        prop_assert!(path.starts_with('/'));
        prop_assert!(!path.contains("//"));
        prop_assert!(path == "/" || !path.ends_with('/'));
        prop_assert_eq!(normalize_path(&path), path.clone());
    }

    #[test]
    fn test_join_equals_normalized_concatenation(base in raw_path(), sub in raw_path()) {
        prop_assert_eq!(join_paths(&base, &sub), normalize_path(&format!("{base}/{sub}")));
    }

    #[test]
    fn test_template_matches_its_own_instantiation(raw in raw_path()) {
        let template = normalize_path(&raw);
        let concrete: Vec<String> = template
            .split('/')
            .map(|s| if s.starts_with('{') || s.starts_with(':') { "42".to_string() } else { s.to_string() })
            .collect();
        prop_assert!(template_matches(&template, &concrete.join("/")));
    }

    #[test]
    fn test_placeholder_names_survive_normalization(names in prop::collection::vec("[a-z]{1,6}", 0..4)) {
        let raw: String = names.iter().map(|n| format!("//x/{{{n}}}")).collect();
        prop_assert_eq!(path_parameters(&normalize_path(&raw)), names);
    }

    #[test]
    fn test_tokenizer_is_deterministic(source in "[ -~\n]{0,200}") {
        for options in [TokenizerOptions::JAVA, TokenizerOptions::CSHARP, TokenizerOptions::PYTHON, TokenizerOptions::RUBY] {
            let first = Tokenizer::tokenize(&source, options);
            let second = Tokenizer::tokenize(&source, options);
            prop_assert_eq!(first.last().map(|t| t.is_eof()), Some(true));
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn test_rails_parse_is_deterministic(
        resources in prop::collection::vec(resource_name(), 1..5),
        nested in any::<bool>(),
    ) {
        let mut source = String::from("Rails.application.routes.draw do\n");
        for name in &resources {
            source.push_str(&format!("  resources :{name}"));
            if nested {
                source.push_str(" do\n    get :search, on: :collection\n  end\n");
            } else {
                source.push('\n');
            }
        }
        source.push_str("end\n");

        let root = Path::new("/app");
        let file = SourceFile::new(root, &root.join("config/routes.rb"), 0).unwrap();
        let ctx = ExtractionContext::new(root);
        let first = parse_routes(&file, &source, &ctx);
        let second = parse_routes(&file, &source, &ctx);
        prop_assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            prop_assert_eq!(&a.base_paths, &b.base_paths);
            prop_assert_eq!(&a.methods, &b.methods);
            prop_assert_eq!(&a.action, &b.action);
        }
        // seven default actions per resource, plus the collection route
        let per_resource = if nested { 8 } else { 7 };
        prop_assert_eq!(first.len(), resources.len() * per_resource);
    }
}
