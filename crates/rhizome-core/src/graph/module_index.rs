//! Bidirectional index between source files and dotted module ids.

use std::collections::HashMap;

use crate::config::ModuleIdentity;
use crate::error::{AnalysisError, Result};

/// Module id of a package initializer sitting at the project root.
pub const ROOT_PACKAGE_ID: &str = "__init__";

const INIT_STEM: &str = "__init__";

/// Map a project-relative path to `(module_id, is_package)`.
///
/// `pkg/sub/mod.py` becomes `pkg.sub.mod`, `pkg/__init__.py` becomes `pkg`
/// (a package), and a root-level `__init__.py` becomes [`ROOT_PACKAGE_ID`].
pub fn module_name_from_path(rel_path: &str) -> (String, bool) {
    let rel_path = rel_path.replace('\\', "/");
    let (dir, file) = match rel_path.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, rel_path.as_str()),
    };
    let stem = match file.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => file,
    };

    if stem == INIT_STEM {
        return match dir {
            Some(dir) => (dir.replace('/', "."), true),
            None => (ROOT_PACKAGE_ID.to_string(), true),
        };
    }

    match dir {
        Some(dir) => (format!("{}.{}", dir.replace('/', "."), stem), false),
        None => (stem.to_string(), false),
    }
}

/// The package a module's relative imports are anchored to.
///
/// A package initializer is its own package; any other module belongs to its
/// parent. Top-level modules and the root initializer anchor to the empty package.
pub fn package_of(module: &str, is_package: bool) -> &str {
    if module == ROOT_PACKAGE_ID {
        return "";
    }
    if is_package {
        return module;
    }
    module.rsplit_once('.').map(|(parent, _)| parent).unwrap_or("")
}

/// Maps module ids to files and back for every discovered source file.
#[derive(Debug, Default, Clone)]
pub struct ModuleIndex {
    module_to_file: HashMap<String, String>,
    file_to_module: HashMap<String, String>,
    module_is_package: HashMap<String, bool>,
    /// Identities in discovery order.
    identities: Vec<ModuleIdentity>,
}

impl ModuleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from project-relative paths in discovery order.
    ///
    /// Fails when two files claim the same module id, since every later stage
    /// relies on the two maps being mutual inverses.
    pub fn build<'a, I>(rel_paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut index = Self::new();
        for rel_path in rel_paths {
            index.register(rel_path)?;
        }
        Ok(index)
    }

    /// Register a single file. Errors on a module or file collision.
    pub fn register(&mut self, rel_path: &str) -> Result<&ModuleIdentity> {
        let (module, is_package) = module_name_from_path(rel_path);

        if let Some(existing) = self.module_to_file.get(&module) {
            return Err(AnalysisError::InconsistentModuleIndex(format!(
                "module '{module}' is provided by both '{existing}' and '{rel_path}'"
            )));
        }
        if self.file_to_module.contains_key(rel_path) {
            return Err(AnalysisError::InconsistentModuleIndex(format!(
                "file '{rel_path}' registered twice"
            )));
        }

        self.module_to_file
            .insert(module.clone(), rel_path.to_string());
        self.file_to_module
            .insert(rel_path.to_string(), module.clone());
        self.module_is_package.insert(module.clone(), is_package);
        self.identities.push(ModuleIdentity {
            module,
            rel_path: rel_path.to_string(),
            is_package,
        });

        let last = self.identities.len() - 1;
        Ok(&self.identities[last])
    }

    pub fn contains(&self, module: &str) -> bool {
        self.module_to_file.contains_key(module)
    }

    pub fn file_for_module(&self, module: &str) -> Option<&str> {
        self.module_to_file.get(module).map(|s| s.as_str())
    }

    pub fn module_for_file(&self, rel_path: &str) -> Option<&str> {
        self.file_to_module.get(rel_path).map(|s| s.as_str())
    }

    pub fn is_package(&self, module: &str) -> bool {
        self.module_is_package.get(module).copied().unwrap_or(false)
    }

    /// All identities in discovery order.
    pub fn identities(&self) -> &[ModuleIdentity] {
        &self.identities
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Longest-prefix internal match for a dotted candidate.
    ///
    /// The exact string wins; otherwise trailing segments are stripped one at a
    /// time, so `pkg.sub.symbol` resolves to `pkg.sub` when `symbol` is not a module.
    pub fn resolve_internal(&self, candidate: &str) -> Option<&str> {
        self.resolve_internal_bounded(candidate, 1)
    }

    /// Like [`resolve_internal`](Self::resolve_internal) but never strips below
    /// `min_segments` segments.
    pub fn resolve_internal_bounded(&self, candidate: &str, min_segments: usize) -> Option<&str> {
        let candidate = candidate.trim_matches('.');
        if candidate.is_empty() {
            return None;
        }
        let parts: Vec<&str> = candidate.split('.').collect();
        let floor = min_segments.max(1);
        for len in (floor..=parts.len()).rev() {
            let prefix = parts[..len].join(".");
            if let Some((module, _)) = self.module_to_file.get_key_value(&prefix) {
                return Some(module.as_str());
            }
        }
        None
    }
}
