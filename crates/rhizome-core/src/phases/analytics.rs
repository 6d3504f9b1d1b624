//! Phase 5: Degree, entry-point and cycle metrics over the internal-module subgraph.

use std::collections::{BTreeMap, BTreeSet};

use log::info;

use crate::config::{
    CycleMetrics, DegreeMetrics, EdgeKind, EntryPoints, Metrics, NodeKind, RankedModule,
    SummaryMetrics,
};
use crate::graph::cycles::{self_cycles, tarjan_scc};
use crate::graph::dependency_graph::DependencyGraph;

/// Compute every metric of the run. External packages and config files only
/// contribute to the summary counts.
pub fn compute_metrics(graph: &DependencyGraph, top_k: usize) -> Metrics {
    let adjacency = graph.internal_adjacency();

    let summary = summary_metrics(graph);
    let degree_metrics = degree_metrics(&adjacency, top_k);
    let entrypoints = entry_points(&degree_metrics);
    let cycles = cycle_metrics(&adjacency);

    info!(
        "analytics: {} roots, {} sinks, {} cycles",
        entrypoints.roots.len(),
        entrypoints.sinks.len(),
        cycles.scc_count + cycles.self_cycle_count
    );

    Metrics {
        summary,
        degree_metrics,
        entrypoints,
        cycles,
    }
}

pub fn summary_metrics(graph: &DependencyGraph) -> SummaryMetrics {
    SummaryMetrics {
        total_nodes: graph.node_count(),
        total_edges: graph.edge_count(),
        internal_modules: graph.nodes_of_kind(NodeKind::InternalModule).count(),
        external_packages: graph.nodes_of_kind(NodeKind::ExternalPackage).count(),
        config_files: graph.nodes_of_kind(NodeKind::ConfigFile).count(),
        import_edges: graph.edge_count_of_kind(EdgeKind::Imports),
        config_access_edges: graph.edge_count_of_kind(EdgeKind::ConfigAccess),
        issues: graph.issues().len(),
    }
}

/// Fan-in and fan-out as distinct internal neighbours.
pub fn degree_metrics(
    adjacency: &BTreeMap<String, BTreeSet<String>>,
    top_k: usize,
) -> DegreeMetrics {
    let mut fan_in: BTreeMap<String, usize> = adjacency.keys().map(|m| (m.clone(), 0)).collect();
    let mut fan_out = BTreeMap::new();

    for (module, targets) in adjacency {
        fan_out.insert(module.clone(), targets.len());
        for target in targets {
            if let Some(count) = fan_in.get_mut(target) {
                *count += 1;
            }
        }
    }

    let top_fan_in = top_ranked(&fan_in, top_k);
    let top_fan_out = top_ranked(&fan_out, top_k);
    DegreeMetrics {
        fan_in,
        fan_out,
        top_fan_in,
        top_fan_out,
    }
}

/// Highest values first, ties broken by module name, truncated to `k`.
pub fn top_ranked(values: &BTreeMap<String, usize>, k: usize) -> Vec<RankedModule> {
    let mut ranked: Vec<RankedModule> = values
        .iter()
        .map(|(module, value)| RankedModule {
            module: module.clone(),
            value: *value,
        })
        .collect();
    ranked.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.module.cmp(&b.module)));
    ranked.truncate(k);
    ranked
}

pub fn entry_points(degrees: &DegreeMetrics) -> EntryPoints {
    let mut entry = EntryPoints::default();
    for (module, fan_in) in &degrees.fan_in {
        let fan_out = degrees.fan_out.get(module).copied().unwrap_or(0);
        if *fan_in == 0 {
            entry.roots.push(module.clone());
        }
        if fan_out == 0 {
            entry.sinks.push(module.clone());
        }
        if *fan_in == 0 && fan_out == 0 {
            entry.isolated.push(module.clone());
        }
    }
    entry
}

pub fn cycle_metrics(adjacency: &BTreeMap<String, BTreeSet<String>>) -> CycleMetrics {
    let mut sccs: Vec<Vec<String>> = tarjan_scc(adjacency)
        .into_iter()
        .filter(|c| c.len() > 1)
        .collect();
    sccs.sort();

    let self_cycles: Vec<Vec<String>> = self_cycles(adjacency)
        .into_iter()
        .map(|m| vec![m])
        .collect();

    CycleMetrics {
        scc_count: sccs.len(),
        self_cycle_count: self_cycles.len(),
        largest_scc_size: sccs.iter().map(|c| c.len()).max().unwrap_or(0),
        sccs,
        self_cycles,
    }
}
