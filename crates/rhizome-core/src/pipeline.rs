//! Sequential phase orchestrator with timing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::info;

use crate::config::{AnalysisConfig, GraphDocument, Metrics};
use crate::error::{AnalysisError, Result};
use crate::graph::dependency_graph::DependencyGraph;
use crate::graph::module_index::ModuleIndex;
use crate::output::{build_document, REPORT_FILE_NAME};
use crate::phases;
use crate::phases::discovery::{GitignoreMatcher, IgnoreMatcher};

/// Phase labels for progress reporting.
const PHASE_LABELS: &[(&str, &str)] = &[
    ("discovery", "Discovering source files"),
    ("identity", "Indexing modules"),
    ("extraction", "Parsing source files"),
    ("graph", "Resolving imports"),
    ("analytics", "Computing metrics"),
];

/// Progress callback type: (phase_name, label).
pub type ProgressCallback = Box<dyn FnMut(&str, &str)>;

/// Everything a run produced, ready to be emitted.
#[derive(Debug)]
pub struct AnalysisResult {
    pub project_root: PathBuf,
    pub index: ModuleIndex,
    pub graph: DependencyGraph,
    pub metrics: Metrics,
    /// Seconds spent per phase.
    pub timings: BTreeMap<String, f64>,
    pub total_ms: f64,
}

impl AnalysisResult {
    /// Canonical document stamped with `generated_at`.
    pub fn document(&self, generated_at: &str) -> GraphDocument {
        build_document(
            &self.graph,
            self.metrics.clone(),
            &self.project_root.to_string_lossy(),
            generated_at,
        )
    }
}

struct PhaseClock {
    callback: Option<ProgressCallback>,
    timings: BTreeMap<String, f64>,
}

impl PhaseClock {
    fn run<T>(&mut self, name: &str, phase: impl FnOnce() -> Result<T>) -> Result<T> {
        if let Some(ref mut cb) = self.callback {
            let label = PHASE_LABELS
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, l)| *l)
                .unwrap_or(name);
            cb(name, label);
        }
        let start = Instant::now();
        let out = phase()?;
        self.timings
            .insert(name.to_string(), start.elapsed().as_secs_f64());
        Ok(out)
    }
}

/// Project root for a run: `repo_path` when set, otherwise the nearest
/// ancestor of the working directory carrying a root marker.
pub fn resolve_project_root(config: &AnalysisConfig) -> Result<PathBuf> {
    let root = if config.repo_path.is_empty() {
        let cwd = std::env::current_dir()
            .map_err(|_| AnalysisError::InvalidRoot(PathBuf::from(".")))?;
        phases::discovery::find_project_root(&cwd, config)
    } else {
        PathBuf::from(&config.repo_path)
    };
    if !root.is_dir() {
        return Err(AnalysisError::InvalidRoot(root));
    }
    Ok(root.canonicalize().unwrap_or(root))
}

/// Default report location: `<root>/analysis/dependencies_report.md`.
pub fn default_report_path(project_root: &Path) -> PathBuf {
    project_root.join("analysis").join(REPORT_FILE_NAME)
}

/// Execute the analysis pipeline with the ignore rules from `config`.
pub fn run_pipeline(
    config: &AnalysisConfig,
    progress_callback: Option<ProgressCallback>,
) -> Result<AnalysisResult> {
    let root = resolve_project_root(config)?;
    let matcher = GitignoreMatcher::from_config(&root, config)?;
    run_pipeline_with_matcher(config, &root, &matcher, progress_callback)
}

/// Execute the analysis pipeline over `root` with an explicit ignore matcher.
pub fn run_pipeline_with_matcher(
    config: &AnalysisConfig,
    root: &Path,
    matcher: &dyn IgnoreMatcher,
    progress_callback: Option<ProgressCallback>,
) -> Result<AnalysisResult> {
    let total_start = Instant::now();
    let mut clock = PhaseClock {
        callback: progress_callback,
        timings: BTreeMap::new(),
    };

    let files = clock.run("discovery", || {
        let files = phases::discovery::discover_source_files(config, root, matcher);
        if files.is_empty() {
            return Err(AnalysisError::NoSourceFiles(root.to_path_buf()));
        }
        Ok(files)
    })?;
    info!("discovered {} source files under {}", files.len(), root.display());

    let index = clock.run("identity", || {
        ModuleIndex::build(files.iter().map(|f| f.rel_path.as_str()))
    })?;

    let extractions = clock.run("extraction", || {
        phases::extraction::run_extraction_phase(config, root, &index)
    })?;

    let graph = clock.run("graph", || {
        Ok(phases::graph_build::build_dependency_graph(&index, extractions))
    })?;

    let metrics = clock.run("analytics", || {
        Ok(phases::analytics::compute_metrics(&graph, config.top_k))
    })?;

    Ok(AnalysisResult {
        project_root: root.to_path_buf(),
        index,
        graph,
        metrics,
        timings: clock.timings,
        total_ms: total_start.elapsed().as_secs_f64() * 1000.0,
    })
}
