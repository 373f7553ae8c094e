//! Parallel file walker using the `ignore` crate's `WalkParallel`.
//!
//! Supports `.routemapignore` (gitignore syntax, hierarchical) plus the default
//! ignore patterns below. Only files in a supported language are returned.

use std::path::Path;

use crossbeam_channel as channel;
use routemap_core::config::ScanConfig;
use routemap_core::errors::ScanError;
use routemap_core::traits::CancellationToken;

use super::types::SourceFile;

/// Custom ignore file honoured at every directory level.
pub const IGNORE_FILE_NAME: &str = ".routemapignore";

/// Directories never worth scanning for route declarations.
pub const DEFAULT_IGNORES: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "target",
    "__pycache__",
    ".pytest_cache",
    ".venv",
    "venv",
    ".tox",
    ".mypy_cache",
    "site-packages",
    "bin",
    "obj",
    ".gradle",
    ".idea",
    "tmp",
    "log",
];

/// Walk a directory tree in parallel, collecting supported source files.
///
/// Respects `.gitignore`, `.routemapignore`, and the default ignore patterns.
/// Returns files sorted by path for deterministic output.
pub fn walk_directory(
    root: &Path,
    config: &ScanConfig,
    cancel: &CancellationToken,
) -> Result<Vec<SourceFile>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::RootNotFound(root.to_path_buf()));
    }
    let (tx, rx) = channel::unbounded();

    let max_file_size = config.effective_max_file_size();
    let follow_links = config.follow_symlinks.unwrap_or(false);
    let threads = config.effective_threads();

    let mut builder = ignore::WalkBuilder::new(root);
    builder
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .require_git(false)
        .add_custom_ignore_filename(IGNORE_FILE_NAME)
        .max_filesize(Some(max_file_size))
        .follow_links(follow_links);

    if threads > 0 {
        builder.threads(threads);
    }

    // `!pattern` in an override means "ignore".
    let mut overrides = ignore::overrides::OverrideBuilder::new(root);
    for pattern in DEFAULT_IGNORES {
        let _ = overrides.add(&format!("!{pattern}/"));
    }
    for pattern in &config.extra_ignore {
        let _ = overrides.add(&format!("!{pattern}"));
    }
    match overrides.build() {
        Ok(built) => {
            builder.overrides(built);
        }
        Err(error) => tracing::warn!(%error, "ignoring invalid extra_ignore patterns"),
    }

    let walker = builder.build_parallel();

    walker.run(|| {
        let tx = tx.clone();
        let cancel = cancel.clone();
        Box::new(move |entry| {
            if cancel.is_cancelled() {
                return ignore::WalkState::Quit;
            }

            let entry = match entry {
                Ok(e) => e,
                Err(error) => {
                    tracing::debug!(%error, "walk entry skipped");
                    return ignore::WalkState::Continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                return ignore::WalkState::Continue;
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            if let Some(file) = SourceFile::new(root, entry.path(), size) {
                let _ = tx.send(file);
            }
            ignore::WalkState::Continue
        })
    });

    drop(tx);
    if cancel.is_cancelled() {
        return Err(ScanError::Cancelled);
    }
    let mut files: Vec<SourceFile> = rx.into_iter().collect();
    // Sort for deterministic output
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}
