//! Pipeline orchestration and E2E integration tests.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::*;
use pretty_assertions::assert_eq;
use rhizome_core::config::AnalysisConfig;
use rhizome_core::error::AnalysisError;
use rhizome_core::output::write_artifacts;
use rhizome_core::phases::discovery::{GitignoreMatcher, NoIgnore};
use rhizome_core::pipeline::{
    default_report_path, run_pipeline, run_pipeline_with_matcher, ProgressCallback,
};

#[test]
fn pipeline_reports_every_phase_in_order() {
    let root = fixture_path("python_pkg");
    let seen = Rc::new(RefCell::new(Vec::new()));
    let callback: ProgressCallback = {
        let seen = Rc::clone(&seen);
        Box::new(move |phase, _label| seen.borrow_mut().push(phase.to_string()))
    };
    let result = run_pipeline(&config_for(&root), Some(callback)).unwrap();

    assert_eq!(
        *seen.borrow(),
        vec!["discovery", "identity", "extraction", "graph", "analytics"]
    );
    let timed: Vec<_> = result.timings.keys().cloned().collect();
    assert_eq!(timed.len(), 5);
    assert!(result.total_ms >= 0.0);
}

#[test]
fn pipeline_records_canonical_root() {
    let root = fixture_path("python_pkg");
    let result = analyse_dir(&root);
    assert_eq!(result.project_root, root.canonicalize().unwrap());
    assert_eq!(result.index.len(), 3);
}

#[test]
fn empty_tree_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[("README.md", "# nothing to see")]);
    let err = run_pipeline(&config_for(dir.path()), None).unwrap_err();
    assert!(matches!(err, AnalysisError::NoSourceFiles(_)));
}

#[test]
fn missing_root_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&dir.path().join("does-not-exist"));
    let err = run_pipeline(&config, None).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidRoot(_)));
}

#[test]
fn colliding_modules_abort_the_run() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[("util.py", ""), ("util/__init__.py", "")]);
    let err = run_pipeline(&config_for(dir.path()), None).unwrap_err();
    assert!(matches!(err, AnalysisError::InconsistentModuleIndex(_)));
}

#[test]
fn exclude_patterns_reach_discovery() {
    let root = fixture_path("python_project");
    let config = AnalysisConfig {
        exclude_patterns: vec!["broken.py".into(), "app/services/".into()],
        ..config_for(&root)
    };
    let result = run_pipeline(&config, None).unwrap();
    let modules: Vec<_> = result
        .index
        .identities()
        .iter()
        .map(|i| i.module.as_str())
        .collect();
    assert_eq!(modules, vec!["app", "app.config", "app.main", "app.models"]);
    // app.services.api is gone, so the import falls back to its package
    assert!(result.graph.internal_adjacency()["app.main"].contains("app"));
    assert!(!result.graph.has_node("module:app.services.api"));
}

#[test]
fn explicit_matcher_overrides_gitignore() {
    let root = fixture_path("python_project");
    let config = config_for(&root);
    let ignoring = GitignoreMatcher::from_config(&root, &config).unwrap();
    let with_ignores = run_pipeline_with_matcher(&config, &root, &ignoring, None).unwrap();
    let without = run_pipeline_with_matcher(&config, &root, &NoIgnore, None).unwrap();
    assert_eq!(with_ignores.index.len(), 7);
    assert_eq!(without.index.len(), 9);
}

#[test]
fn bare_literal_scan_can_be_disabled() {
    let root = fixture_path("python_project");
    let config = AnalysisConfig {
        scan_bare_literals: false,
        ..config_for(&root)
    };
    let result = run_pipeline(&config, None).unwrap();
    assert!(!result.graph.has_node("config:defaults.yaml"));
    assert!(result.graph.has_node("config:conf/app.yaml"));
    assert_eq!(result.metrics.summary.config_files, 3);
}

#[test]
fn end_to_end_writes_three_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(
        dir.path(),
        &[
            ("pyproject.toml", "[project]\nname = \"demo\"\n"),
            ("demo/__init__.py", ""),
            ("demo/cli.py", "from demo import core\nimport click\n"),
            ("demo/core.py", "from . import cli\n"),
        ],
    );
    let result = analyse_dir(dir.path());
    let report = default_report_path(&result.project_root);
    let paths = write_artifacts(&result.document(FIXED_TIMESTAMP), &report).unwrap();

    assert!(paths.graph_json.ends_with("analysis/dependencies_graph.json"));
    assert!(paths.metrics_yaml.is_file());
    assert!(paths.report_md.is_file());
    assert_eq!(
        result.metrics.cycles.sccs,
        vec![vec!["demo.cli".to_string(), "demo.core".to_string()]]
    );

    // A second run over the same tree does not pick up the artifacts
    let again = analyse_dir(dir.path());
    assert_eq!(again.index.len(), 3);
}
