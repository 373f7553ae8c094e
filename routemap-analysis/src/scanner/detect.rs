//! Framework auto-detection from a file list.
//!
//! Rails and Django are recognised by file names alone. Spring and ASP.NET
//! need a look at Java / C# sources; those reads stop at the first hit.

use std::sync::OnceLock;

use rayon::prelude::*;
use regex::Regex;
use routemap_core::types::Framework;

use super::language_detect::Language;
use super::types::SourceFile;
use crate::tokenizer::runner::read_source;

fn dotnet_controller_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[ApiController\]|\bclass\s+\w+Controller\b").expect("valid controller regex")
    })
}

pub fn is_rails_routes_file(file: &SourceFile) -> bool {
    file.relative_path == "config/routes.rb" || file.relative_path.ends_with("/config/routes.rb")
}

pub fn is_django_marker(file: &SourceFile) -> bool {
    file.language == Language::Python && matches!(file.file_name(), "urls.py" | "manage.py")
}

pub fn mentions_spring_controller(source: &str) -> bool {
    source.contains("@Controller") || source.contains("@RestController")
}

pub fn declares_dotnet_controller(source: &str) -> bool {
    dotnet_controller_regex().is_match(source)
}

/// Any `language` file in `files` whose content satisfies `test`.
/// Unreadable files are skipped here; extraction reports them.
fn any_source(files: &[SourceFile], language: Language, test: fn(&str) -> bool) -> bool {
    files
        .par_iter()
        .filter(|f| f.language == language)
        .any(|f| read_source(&f.path).is_ok_and(|source| test(&source)))
}

/// Frameworks present in `files`, in [`Framework::ALL`] order.
pub fn detect_frameworks(files: &[SourceFile]) -> Vec<Framework> {
    let detected: Vec<Framework> = Framework::ALL
        .into_iter()
        .filter(|framework| match framework {
            Framework::Rails => files.iter().any(is_rails_routes_file),
            Framework::Django => files.iter().any(is_django_marker),
            Framework::Spring => any_source(files, Language::Java, mentions_spring_controller),
            Framework::DotNet => any_source(files, Language::CSharp, declares_dotnet_controller),
        })
        .collect();
    tracing::debug!(?detected, files = files.len(), "framework detection");
    detected
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn write(root: &Path, rel: &str, content: &str) -> SourceFile {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        SourceFile::new(root, &path, content.len() as u64).unwrap()
    }

    #[test]
    fn test_source_markers() {
        assert!(mentions_spring_controller("@RestController\npublic class A {}"));
        assert!(!mentions_spring_controller("@Service class A {}"));
        assert!(declares_dotnet_controller("public class HomeController : Controller {}"));
        assert!(declares_dotnet_controller("[ApiController] public class Things : ControllerBase {}"));
        assert!(!declares_dotnet_controller("public class ControllerFactory {}"));
    }

    #[test]
    fn test_detects_each_framework() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let files = vec![
            write(root, "config/routes.rb", "Rails.application.routes.draw do\nend\n"),
            write(root, "app/models/user.rb", "class User; end\n"),
            write(root, "shop/urls.py", "urlpatterns = []\n"),
            write(root, "src/Api.java", "@RestController\nclass Api {}\n"),
            write(root, "Models/Order.cs", "public class Order {}\n"),
        ];
        assert_eq!(
            detect_frameworks(&files),
            vec![Framework::Spring, Framework::Django, Framework::Rails]
        );
    }

    #[test]
    fn test_nothing_detected() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![write(dir.path(), "lib/util.rb", "module Util; end\n")];
        assert!(detect_frameworks(&files).is_empty());
    }
}
