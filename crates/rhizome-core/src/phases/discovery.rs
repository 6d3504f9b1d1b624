//! Phase 1: Walk the project tree and collect the source files to analyse.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use log::{debug, warn};
use walkdir::WalkDir;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};

/// Directories that are never descended, whatever the ignore rules say.
const ALWAYS_EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".ruff_cache",
    ".tox",
];

/// Decides whether a project-relative path is excluded from analysis.
///
/// Directory paths are passed with a trailing `/`.
pub trait IgnoreMatcher: Send + Sync {
    fn matches(&self, relative_path: &str) -> bool;
}

/// Matcher that ignores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIgnore;

impl IgnoreMatcher for NoIgnore {
    fn matches(&self, _relative_path: &str) -> bool {
        false
    }
}

/// Gitignore-style matcher built from the root `.gitignore` plus extra patterns.
pub struct GitignoreMatcher {
    inner: Gitignore,
}

impl GitignoreMatcher {
    /// Load `<root>/.gitignore` (when `use_gitignore` is set) and the configured
    /// exclude patterns.
    pub fn from_config(root: &Path, config: &AnalysisConfig) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(root);

        let gitignore_path = root.join(".gitignore");
        if config.use_gitignore && gitignore_path.is_file() {
            if let Some(err) = builder.add(&gitignore_path) {
                // Partial failures still leave the valid lines loaded
                warn!("some .gitignore patterns were skipped: {err}");
            } else {
                debug!("loaded ignore rules from {}", gitignore_path.display());
            }
        }

        for pattern in &config.exclude_patterns {
            builder
                .add_line(None, pattern)
                .map_err(|e| AnalysisError::Ignore {
                    path: PathBuf::from(pattern),
                    message: e.to_string(),
                })?;
        }

        let inner = builder.build().map_err(|e| AnalysisError::Ignore {
            path: gitignore_path,
            message: e.to_string(),
        })?;
        Ok(Self { inner })
    }

    /// Matcher over an explicit list of gitignore lines, rooted at `root`.
    pub fn from_patterns(root: &Path, patterns: &[&str]) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in patterns {
            builder
                .add_line(None, pattern)
                .map_err(|e| AnalysisError::Ignore {
                    path: PathBuf::from(*pattern),
                    message: e.to_string(),
                })?;
        }
        let inner = builder.build().map_err(|e| AnalysisError::Ignore {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self { inner })
    }
}

impl IgnoreMatcher for GitignoreMatcher {
    fn matches(&self, relative_path: &str) -> bool {
        let is_dir = relative_path.ends_with('/');
        let trimmed = relative_path.trim_end_matches('/');
        if trimmed.is_empty() {
            return false;
        }
        self.inner
            .matched_path_or_any_parents(trimmed, is_dir)
            .is_ignore()
    }
}

/// A discovered source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Project-relative path with `/` separators.
    pub rel_path: String,
}

/// Run the discovery phase: walk `root` and return the source files in traversal order.
///
/// Entries of each directory are visited in file-name order and a directory is
/// yielded before its contents, so the order is fixed for a fixed tree.
pub fn discover_source_files(
    config: &AnalysisConfig,
    root: &Path,
    matcher: &dyn IgnoreMatcher,
) -> Vec<SourceFile> {
    let canonical_root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            if ALWAYS_EXCLUDED_DIRS.iter().any(|d| name == *d) {
                return false;
            }
            let rel = relative_path(root, e.path());
            !matcher.matches(&format!("{rel}/"))
        });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                let path = err
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                warn!("skipping unreadable path {path}: {err}");
                continue;
            }
        };

        if entry.file_type().is_dir() || !has_source_extension(entry.path(), config) {
            continue;
        }

        let rel_path = relative_path(root, entry.path());
        if matcher.matches(&rel_path) {
            debug!("ignored {rel_path}");
            continue;
        }

        if entry.path_is_symlink() {
            if !symlink_stays_inside(entry.path(), &canonical_root) {
                debug!("skipping symlink leaving the project root: {rel_path}");
                continue;
            }
        } else if !entry.file_type().is_file() {
            continue;
        }

        files.push(SourceFile { rel_path });
    }

    files
}

/// Walk up from `start` to the first directory containing one of the configured
/// root markers. Falls back to `start` itself.
pub fn find_project_root(start: &Path, config: &AnalysisConfig) -> PathBuf {
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    for dir in start.ancestors() {
        if config
            .root_markers
            .iter()
            .any(|marker| dir.join(marker).exists())
        {
            return dir.to_path_buf();
        }
    }
    start
}

/// Project-relative path of `path` with `/` separators.
pub fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn has_source_extension(path: &Path, config: &AnalysisConfig) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy())
        .is_some_and(|ext| config.source_extensions.iter().any(|s| *s == ext))
}

fn symlink_stays_inside(path: &Path, canonical_root: &Path) -> bool {
    match path.canonicalize() {
        Ok(target) => target.is_file() && target.starts_with(canonical_root),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn rel_paths(files: &[SourceFile]) -> Vec<&str> {
        files.iter().map(|f| f.rel_path.as_str()).collect()
    }

    #[test]
    fn walks_in_name_order_with_directories_before_contents() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.py");
        touch(dir.path(), "a/z.py");
        touch(dir.path(), "a/b/c.py");
        touch(dir.path(), "c.py");

        let files = discover_source_files(&AnalysisConfig::default(), dir.path(), &NoIgnore);
        assert_eq!(rel_paths(&files), vec!["a/b/c.py", "a/z.py", "b.py", "c.py"]);
    }

    #[test]
    fn skips_vcs_and_cache_directories() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), ".git/hooks/pre_commit.py");
        touch(dir.path(), "__pycache__/mod.py");
        touch(dir.path(), "pkg/.pytest_cache/x.py");
        touch(dir.path(), "pkg/mod.py");

        let files = discover_source_files(&AnalysisConfig::default(), dir.path(), &NoIgnore);
        assert_eq!(rel_paths(&files), vec!["pkg/mod.py"]);
    }

    #[test]
    fn only_configured_extensions_are_collected() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.py");
        touch(dir.path(), "b.pyi");
        touch(dir.path(), "notes.txt");

        let files = discover_source_files(&AnalysisConfig::default(), dir.path(), &NoIgnore);
        assert_eq!(rel_paths(&files), vec!["a.py"]);

        let config = AnalysisConfig {
            source_extensions: vec!["py".into(), "pyi".into()],
            ..Default::default()
        };
        let files = discover_source_files(&config, dir.path(), &NoIgnore);
        assert_eq!(rel_paths(&files), vec!["a.py", "b.pyi"]);
    }

    #[test]
    fn gitignore_rules_exclude_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "build/\n*_generated.py\n").unwrap();
        touch(dir.path(), "build/lib/mod.py");
        touch(dir.path(), "src/schema_generated.py");
        touch(dir.path(), "src/app.py");

        let config = AnalysisConfig::default();
        let matcher = GitignoreMatcher::from_config(dir.path(), &config).unwrap();
        let files = discover_source_files(&config, dir.path(), &matcher);
        assert_eq!(rel_paths(&files), vec!["src/app.py"]);
    }

    #[test]
    fn exclude_patterns_extend_gitignore() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "scripts/tool.py");
        touch(dir.path(), "app.py");

        let config = AnalysisConfig {
            exclude_patterns: vec!["scripts/".into()],
            ..Default::default()
        };
        let matcher = GitignoreMatcher::from_config(dir.path(), &config).unwrap();
        let files = discover_source_files(&config, dir.path(), &matcher);
        assert_eq!(rel_paths(&files), vec!["app.py"]);
    }

    #[test]
    fn gitignore_matcher_treats_trailing_slash_as_directory() {
        let dir = tempfile::tempdir().unwrap();
        let matcher = GitignoreMatcher::from_patterns(dir.path(), &["out/"]).unwrap();
        assert!(matcher.matches("out/"));
        assert!(matcher.matches("out/x.py"));
        assert!(!matcher.matches("out"));
        assert!(!matcher.matches(""));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_leaving_the_root_are_not_followed() {
        let outside = tempfile::tempdir().unwrap();
        touch(outside.path(), "lib/external.py");
        touch(outside.path(), "single.py");

        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "inner.py");
        std::os::unix::fs::symlink(outside.path().join("lib"), dir.path().join("linked_dir"))
            .unwrap();
        std::os::unix::fs::symlink(outside.path().join("single.py"), dir.path().join("out.py"))
            .unwrap();
        std::os::unix::fs::symlink(dir.path().join("inner.py"), dir.path().join("alias.py"))
            .unwrap();

        let files = discover_source_files(&AnalysisConfig::default(), dir.path(), &NoIgnore);
        assert_eq!(rel_paths(&files), vec!["alias.py", "inner.py"]);
    }

    #[test]
    fn project_root_is_found_by_marker() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "pyproject.toml");
        fs::create_dir_all(dir.path().join("src/pkg")).unwrap();

        let root = find_project_root(&dir.path().join("src/pkg"), &AnalysisConfig::default());
        assert_eq!(root, dir.path().canonicalize().unwrap());
    }
}
