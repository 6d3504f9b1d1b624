//! Language analyser trait and registry.

use std::collections::HashMap;

use tree_sitter::{Language, Node, Tree};

use crate::config::{AnalysisConfig, ConfigReference, ImportDescriptor, Issue, ModuleIdentity};

pub mod python;

/// Trait that all language analysers implement.
pub trait LanguageAnalyser: Send + Sync {
    /// File extensions this analyser handles (e.g. &["py"]).
    fn extensions(&self) -> &[&str];

    /// Human-readable language name (e.g. "Python").
    fn language_name(&self) -> &str;

    /// Get the tree-sitter Language for parsing.
    fn get_language(&self) -> Language;

    /// Extract import descriptors from a parsed AST.
    ///
    /// Relative imports are resolved against `identity` here; statements that
    /// cannot be resolved are reported as issues instead of descriptors.
    fn extract_imports(
        &self,
        tree: &Tree,
        source: &[u8],
        identity: &ModuleIdentity,
    ) -> (Vec<ImportDescriptor>, Vec<Issue>);

    /// Extract literals that look like configuration file paths.
    fn extract_config_refs(
        &self,
        tree: &Tree,
        source: &[u8],
        config: &AnalysisConfig,
    ) -> Vec<ConfigReference>;
}

/// Registry mapping file extensions to analysers.
pub struct AnalyserRegistry {
    analysers: Vec<Box<dyn LanguageAnalyser>>,
    extension_map: HashMap<String, usize>,
}

impl AnalyserRegistry {
    /// Build the registry with all available language analysers.
    pub fn new() -> Self {
        let analysers: Vec<Box<dyn LanguageAnalyser>> =
            vec![Box::new(python::PythonAnalyser::new())];

        let mut extension_map = HashMap::new();
        for (i, analyser) in analysers.iter().enumerate() {
            for ext in analyser.extensions() {
                extension_map.insert(ext.to_string(), i);
            }
        }

        Self {
            analysers,
            extension_map,
        }
    }

    /// Get the analyser for a given file extension, if one exists.
    pub fn get_by_extension(&self, ext: &str) -> Option<&dyn LanguageAnalyser> {
        self.extension_map
            .get(ext)
            .map(|&i| self.analysers[i].as_ref())
    }
}

impl Default for AnalyserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-order traversal driven by an explicit stack.
pub(crate) struct Preorder<'t> {
    stack: Vec<Node<'t>>,
}

impl<'t> Iterator for Preorder<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Node<'t>> {
        let node = self.stack.pop()?;
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                self.stack.push(child);
            }
        }
        Some(node)
    }
}

pub(crate) fn preorder(root: Node<'_>) -> Preorder<'_> {
    Preorder { stack: vec![root] }
}
