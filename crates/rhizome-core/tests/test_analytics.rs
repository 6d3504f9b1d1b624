//! Phase 5: metrics integration tests.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use rhizome_core::config::RankedModule;
use rhizome_core::phases::analytics::compute_metrics;

fn ranked(items: &[(&str, usize)]) -> Vec<RankedModule> {
    items
        .iter()
        .map(|(module, value)| RankedModule {
            module: module.to_string(),
            value: *value,
        })
        .collect()
}

#[test]
fn cycles_fixture_reports_component_and_self_cycle() {
    let r = analyse_fixture("python_cycles");
    let cycles = &r.metrics.cycles;
    assert_eq!(cycles.scc_count, 1);
    assert_eq!(cycles.largest_scc_size, 2);
    assert_eq!(cycles.sccs, vec![vec!["alpha".to_string(), "beta".to_string()]]);
    assert_eq!(cycles.self_cycle_count, 1);
    assert_eq!(cycles.self_cycles, vec![vec!["selfish".to_string()]]);
}

#[test]
fn isolated_module_is_a_root() {
    let r = analyse_fixture("python_cycles");
    let entry = &r.metrics.entrypoints;
    assert_eq!(entry.roots, vec!["lonely"]);
    assert_eq!(entry.sinks, vec!["lonely"]);
    assert_eq!(entry.isolated, vec!["lonely"]);
}

#[test]
fn degree_rankings_for_project() {
    let r = analyse_fixture("python_project");
    let degrees = &r.metrics.degree_metrics;
    assert_eq!(degrees.fan_in["app.services.api"], 2);
    assert_eq!(degrees.fan_out["app.main"], 2);
    assert_eq!(
        degrees.top_fan_in[..3].to_vec(),
        ranked(&[("app.services.api", 2), ("app.config", 1), ("app.models", 1)])
    );
    assert_eq!(
        degrees.top_fan_out[..3].to_vec(),
        ranked(&[("app.main", 2), ("app.services", 1), ("app.services.api", 1)])
    );

    let entry = &r.metrics.entrypoints;
    assert_eq!(entry.roots, vec!["app", "app.main", "app.services", "broken"]);
    assert_eq!(entry.sinks, vec!["app", "app.config", "app.models", "broken"]);
    assert_eq!(entry.isolated, vec!["app", "broken"]);
}

#[test]
fn external_and_config_nodes_stay_out_of_degrees() {
    let r = analyse_fixture("python_project");
    let degrees = &r.metrics.degree_metrics;
    assert_eq!(degrees.fan_in.len(), 7);
    assert!(!degrees.fan_in.contains_key("requests"));
    assert!(!degrees.fan_out.contains_key("settings.json"));
}

#[test]
fn top_k_truncates_rankings() {
    let r = analyse_fixture("python_project");
    let metrics = compute_metrics(&r.graph, 2);
    assert_eq!(metrics.degree_metrics.top_fan_in.len(), 2);
    assert_eq!(metrics.degree_metrics.top_fan_out.len(), 2);
    assert_eq!(metrics.degree_metrics.fan_in.len(), 7);
}

#[test]
fn metrics_are_repeatable() {
    let r = analyse_fixture("python_cycles");
    assert_eq!(compute_metrics(&r.graph, 20), compute_metrics(&r.graph, 20));
    assert_eq!(compute_metrics(&r.graph, 20), r.metrics);
}
