//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use rhizome_core::config::{AnalysisConfig, EdgeKind, FileExtraction, NodeKind};
use rhizome_core::graph::dependency_graph::DependencyGraph;
use rhizome_core::graph::module_index::ModuleIndex;
use rhizome_core::phases::discovery::{discover_source_files, GitignoreMatcher};
use rhizome_core::pipeline::{run_pipeline, AnalysisResult};

/// Timestamp used wherever a test needs byte-identical artifacts.
pub const FIXED_TIMESTAMP: &str = "2024-01-01T00:00:00Z";

// ---------------------------------------------------------------------------
// Fixture path resolution
// ---------------------------------------------------------------------------

/// Resolve `tests/fixtures/{name}` relative to the workspace root.
pub fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir)
        .join("../../tests/fixtures")
        .join(name)
        .canonicalize()
        .unwrap_or_else(|_| {
            Path::new(manifest_dir)
                .join("../../tests/fixtures")
                .join(name)
        })
}

pub fn config_for(root: &Path) -> AnalysisConfig {
    AnalysisConfig {
        repo_path: root.to_string_lossy().to_string(),
        ..Default::default()
    }
}

/// Write `(relative path, content)` pairs under `root`, creating directories.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create fixture directory");
        }
        std::fs::write(&path, content).expect("Failed to write fixture file");
    }
}

// ---------------------------------------------------------------------------
// Phase runners
// ---------------------------------------------------------------------------

/// Run the full pipeline on a directory.
pub fn analyse_dir(root: &Path) -> AnalysisResult {
    run_pipeline(&config_for(root), None).expect("Pipeline failed")
}

/// Run the full pipeline on a fixture directory.
pub fn analyse_fixture(name: &str) -> AnalysisResult {
    analyse_dir(&fixture_path(name))
}

/// Run discovery and indexing on a directory.
pub fn index_dir(root: &Path) -> ModuleIndex {
    let config = config_for(root);
    let matcher = GitignoreMatcher::from_config(root, &config).expect("Failed to load ignores");
    let files = discover_source_files(&config, root, &matcher);
    ModuleIndex::build(files.iter().map(|f| f.rel_path.as_str())).expect("Inconsistent index")
}

/// Run discovery, indexing and extraction on a directory.
pub fn extract_dir(root: &Path) -> (ModuleIndex, Vec<FileExtraction>) {
    let index = index_dir(root);
    let extractions =
        rhizome_core::phases::extraction::run_extraction_phase(&config_for(root), root, &index)
            .expect("Extraction failed");
    (index, extractions)
}

// ---------------------------------------------------------------------------
// Extractors from DependencyGraph
// ---------------------------------------------------------------------------

/// Labels of every node of `kind`, sorted.
pub fn labels(graph: &DependencyGraph, kind: NodeKind) -> Vec<String> {
    let mut out: Vec<String> = graph.nodes_of_kind(kind).map(|n| n.label.clone()).collect();
    out.sort();
    out
}

/// Edge pairs `(source label, target label)` of `kind`, in build order.
pub fn edge_pairs(graph: &DependencyGraph, kind: EdgeKind) -> Vec<(String, String)> {
    let label = |id: &str| {
        graph
            .get_node(id)
            .map(|n| n.label.clone())
            .unwrap_or_else(|| id.to_string())
    };
    graph
        .edge_outputs()
        .into_iter()
        .filter(|e| e.kind == kind)
        .map(|e| (label(&e.source), label(&e.target)))
        .collect()
}

pub fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}
