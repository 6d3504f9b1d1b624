//! Phase 3: Tree-sitter parsing, extract import descriptors and config references per file.

use std::path::Path;

use log::{debug, info, warn};
use rayon::prelude::*;
use tree_sitter::Tree;

use crate::config::{AnalysisConfig, FileExtraction, Issue, IssueType, ModuleIdentity};
use crate::error::{AnalysisError, Result};
use crate::graph::module_index::ModuleIndex;
use crate::languages::{preorder, AnalyserRegistry};

/// Run the extraction phase over every indexed file.
///
/// Files are processed in parallel but the result keeps the index's discovery
/// order. Per-file failures become issues on the returned extraction.
pub fn run_extraction_phase(
    config: &AnalysisConfig,
    root: &Path,
    index: &ModuleIndex,
) -> Result<Vec<FileExtraction>> {
    let registry = AnalyserRegistry::new();

    let extractions = index
        .identities()
        .par_iter()
        .map(|identity| extract_file(config, &registry, root, identity))
        .collect::<Result<Vec<_>>>()?;

    let issue_count: usize = extractions.iter().map(|e| e.issues.len()).sum();
    info!(
        "extracted {} files ({} per-file issues)",
        extractions.len(),
        issue_count
    );
    Ok(extractions)
}

/// Parse one file and extract its imports and config references.
pub fn extract_file(
    config: &AnalysisConfig,
    registry: &AnalyserRegistry,
    root: &Path,
    identity: &ModuleIdentity,
) -> Result<FileExtraction> {
    let mut extraction = FileExtraction {
        identity: identity.clone(),
        imports: Vec::new(),
        config_refs: Vec::new(),
        issues: Vec::new(),
    };

    let ext = Path::new(&identity.rel_path)
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default();

    let analyser = match registry.get_by_extension(&ext) {
        Some(a) => a,
        None => {
            warn!("no analyser for '{}', skipping", identity.rel_path);
            return Ok(extraction);
        }
    };

    debug!("parsing {} as {}", identity.rel_path, analyser.language_name());
    let abs_path = root.join(&identity.rel_path);
    let source = match std::fs::read_to_string(&abs_path) {
        Ok(s) => s,
        Err(e) => {
            extraction.issues.push(Issue::new(
                IssueType::ReadError,
                &identity.rel_path,
                e.to_string(),
            ));
            return Ok(extraction);
        }
    };
    let source = source.strip_prefix('\u{feff}').unwrap_or(&source);

    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&analyser.get_language())
        .map_err(|e| AnalysisError::Parser(e.to_string()))?;

    let tree = match parser.parse(source, None) {
        Some(t) => t,
        None => {
            extraction.issues.push(Issue::new(
                IssueType::ParseError,
                &identity.rel_path,
                "parser produced no syntax tree",
            ));
            return Ok(extraction);
        }
    };

    if let Some((lineno, col, message)) = first_syntax_error(&tree) {
        extraction.issues.push(
            Issue::new(
                IssueType::ParseError,
                &identity.rel_path,
                format!("{message} (line {lineno}, column {col})"),
            )
            .at_line(lineno),
        );
        return Ok(extraction);
    }

    let (imports, issues) = analyser.extract_imports(&tree, source.as_bytes(), identity);
    extraction.imports = imports;
    extraction.issues.extend(issues);
    extraction.config_refs = analyser.extract_config_refs(&tree, source.as_bytes(), config);

    debug!(
        "{}: {} imports, {} config references",
        identity.rel_path,
        extraction.imports.len(),
        extraction.config_refs.len()
    );
    Ok(extraction)
}

/// Position and description of the first syntax error in a tree, if any.
pub fn first_syntax_error(tree: &Tree) -> Option<(usize, usize, String)> {
    let root = tree.root_node();
    if !root.has_error() {
        return None;
    }
    preorder(root)
        .find(|n| n.is_error() || n.is_missing())
        .map(|n| {
            let point = n.start_position();
            let message = if n.is_missing() {
                format!("invalid syntax: missing '{}'", n.kind())
            } else {
                "invalid syntax".to_string()
            };
            (point.row + 1, point.column + 1, message)
        })
}
