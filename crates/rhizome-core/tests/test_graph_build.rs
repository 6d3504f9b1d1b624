//! Phase 4: graph construction integration tests.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use rhizome_core::config::{EdgeKind, ImportType, IssueType, NodeKind};
use rhizome_core::phases::graph_build::build_dependency_graph;

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}

#[test]
fn package_without_initializer_scenario() {
    let r = analyse_fixture("python_pkg");
    assert_eq!(
        labels(&r.graph, NodeKind::InternalModule),
        vec!["pkg.a", "pkg.b", "pkg.c"]
    );
    assert_eq!(
        edge_pairs(&r.graph, EdgeKind::Imports),
        pairs(&[("pkg.a", "pkg.b"), ("pkg.b", "pkg.c")])
    );
    assert_eq!(r.metrics.entrypoints.roots, vec!["pkg.a"]);
    assert_eq!(r.metrics.entrypoints.sinks, vec!["pkg.c"]);
    assert_eq!(r.metrics.cycles.scc_count, 0);
    assert_eq!(r.metrics.cycles.self_cycle_count, 0);
    assert!(r.graph.issues().is_empty());
}

#[test]
fn external_imports_collapse_onto_first_segment() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(
        dir.path(),
        &[(
            "main.py",
            "import os\nimport os.path\nimport requests\nfrom requests.sessions import Session\nimport company.internal.missing\n",
        )],
    );
    let r = analyse_dir(dir.path());
    assert_eq!(
        labels(&r.graph, NodeKind::ExternalPackage),
        vec!["company", "os", "requests"]
    );
    assert!(r.graph.issues().is_empty());
    // One edge per statement, not per distinct target
    assert_eq!(r.graph.edge_count_of_kind(EdgeKind::Imports), 5);
}

#[test]
fn project_graph_has_expected_shape() {
    let r = analyse_fixture("python_project");
    let summary = &r.metrics.summary;
    assert_eq!(summary.internal_modules, 7);
    assert_eq!(summary.external_packages, 7);
    assert_eq!(summary.config_files, 4);
    assert_eq!(summary.import_edges, 12);
    assert_eq!(summary.config_access_edges, 4);
    assert_eq!(summary.total_nodes, 18);
    assert_eq!(summary.total_edges, 16);
    assert_eq!(summary.issues, 2);

    assert_eq!(
        labels(&r.graph, NodeKind::ExternalPackage),
        vec!["dataclasses", "json", "os", "pandas", "pathlib", "requests", "yaml"]
    );
    assert_eq!(
        labels(&r.graph, NodeKind::ConfigFile),
        vec!["conf/app.yaml", "data/input.csv", "defaults.yaml", "settings.json"]
    );
}

#[test]
fn internal_edges_resolve_absolute_relative_and_wildcard_imports() {
    let r = analyse_fixture("python_project");
    let internal: Vec<(String, String)> = edge_pairs(&r.graph, EdgeKind::Imports)
        .into_iter()
        .filter(|(_, target)| target.starts_with("app"))
        .collect();
    assert_eq!(
        internal,
        pairs(&[
            ("app.main", "app.services.api"),
            ("app.main", "app.config"),
            ("app.services", "app.services.api"),
            ("app.services.api", "app.models"),
        ])
    );

    let relative = r
        .graph
        .edge_outputs()
        .into_iter()
        .filter(|e| e.import_type == Some(ImportType::RelativeImport))
        .count();
    assert_eq!(relative, 3);
}

#[test]
fn issues_keep_extraction_order() {
    let r = analyse_fixture("python_project");
    let kinds: Vec<_> = r.graph.issues().iter().map(|i| i.issue_type).collect();
    assert_eq!(kinds, vec![IssueType::RelativeImportError, IssueType::ParseError]);
}

#[test]
fn config_access_is_deduplicated_per_module() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(
        dir.path(),
        &[
            (
                "loader.py",
                "import json\n\ndef a():\n    return open('cfg/app.json')\n\ndef b():\n    return json.load(open('cfg/app.json'))\n",
            ),
            ("other.py", "PATH = 'cfg/app.json'\n"),
        ],
    );
    let r = analyse_dir(dir.path());
    assert_eq!(
        edge_pairs(&r.graph, EdgeKind::ConfigAccess),
        pairs(&[("loader", "cfg/app.json"), ("other", "cfg/app.json")])
    );
    assert_eq!(labels(&r.graph, NodeKind::ConfigFile), vec!["cfg/app.json"]);
}

#[test]
fn unresolved_relative_target_stays_visible() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[("main.py", "from . import helpers\n")]);
    let r = analyse_dir(dir.path());
    assert!(r.graph.has_node("external:helpers"));
    assert_eq!(r.graph.issues().len(), 1);
    assert_eq!(r.graph.issues()[0].issue_type, IssueType::UnresolvedRelativeTarget);
}

#[test]
fn graph_build_is_idempotent() {
    let (index, extractions) = extract_dir(&fixture_path("python_project"));
    let first = build_dependency_graph(&index, extractions.clone());
    let second = build_dependency_graph(&index, extractions);
    assert_eq!(first.edge_outputs(), second.edge_outputs());
    assert_eq!(first.adjacency_output(), second.adjacency_output());
    assert_eq!(first.issues(), second.issues());
}
