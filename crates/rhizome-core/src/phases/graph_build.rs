//! Phase 4: Resolve import descriptors against the module index and assemble the graph.

use std::collections::HashSet;

use log::{debug, info};

use crate::config::{
    AliasMember, EdgeKind, FileExtraction, ImportDescriptor, Issue, IssueType, ModuleIdentity,
    Node,
};
use crate::graph::dependency_graph::{DependencyGraph, EdgeData};
use crate::graph::module_index::{package_of, ModuleIndex};

/// Where an alias member ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    /// An internal module id.
    Internal(String),
    /// An external package keyed by its first dotted segment.
    External(String),
}

/// Resolve one alias member of `descriptor`, imported from `importer`.
///
/// Tries, in order: the candidate itself (stripping trailing segments), the
/// statement's base, the candidate as a sibling inside the importer's package
/// (absolute statements only), and finally an external package.
pub fn resolve_target(
    index: &ModuleIndex,
    importer: &ModuleIdentity,
    descriptor: &ImportDescriptor,
    candidate: &str,
) -> ResolvedTarget {
    if let Some(module) = index.resolve_internal(candidate) {
        return ResolvedTarget::Internal(module.to_string());
    }

    if !descriptor.base.is_empty() {
        if let Some(module) = index.resolve_internal(&descriptor.base) {
            return ResolvedTarget::Internal(module.to_string());
        }
    }

    if descriptor.relative_level == 0 {
        let package = package_of(&importer.module, importer.is_package);
        if !package.is_empty() {
            let sibling = format!("{package}.{candidate}");
            let floor = package.split('.').count() + 1;
            if let Some(module) = index.resolve_internal_bounded(&sibling, floor) {
                return ResolvedTarget::Internal(module.to_string());
            }
        }
    }

    let first = candidate
        .trim_start_matches('.')
        .split('.')
        .next()
        .unwrap_or_default();
    ResolvedTarget::External(first.to_string())
}

fn unresolved_relative_message(
    index: &ModuleIndex,
    descriptor: &ImportDescriptor,
    member: &AliasMember,
) -> String {
    let mut message = format!(
        "relative import '{}' resolved to '{}' which is not a project module",
        member.written, member.candidate
    );
    if !descriptor.base.is_empty() && !index.contains(&descriptor.base) {
        message.push_str(&format!(
            "; '{}' has no __init__.py, so it is recorded as an external package",
            descriptor.base
        ));
    }
    message
}

/// Build the dependency graph from extractions given in discovery order.
pub fn build_dependency_graph(
    index: &ModuleIndex,
    extractions: Vec<FileExtraction>,
) -> DependencyGraph {
    let mut graph = DependencyGraph::new();

    // Internal modules first, in discovery order
    for identity in index.identities() {
        graph.ensure_node(Node::internal(
            &identity.module,
            &identity.rel_path,
            identity.is_package,
        ));
    }

    for extraction in extractions {
        let FileExtraction {
            identity,
            imports,
            config_refs,
            issues,
        } = extraction;

        for issue in issues {
            graph.add_issue(issue);
        }

        let source_idx = graph.ensure_node(Node::internal(
            &identity.module,
            &identity.rel_path,
            identity.is_package,
        ));

        for descriptor in &imports {
            let mut seen: HashSet<String> = HashSet::new();
            for member in &descriptor.alias_members {
                let resolved = resolve_target(index, &identity, descriptor, &member.candidate);
                let target_node = match resolved {
                    ResolvedTarget::Internal(module) => {
                        let rel_path = index.file_for_module(&module).unwrap_or_default();
                        Node::internal(&module, rel_path, index.is_package(&module))
                    }
                    ResolvedTarget::External(package) => {
                        if descriptor.relative_level > 0 {
                            graph.add_issue(
                                Issue::new(
                                    IssueType::UnresolvedRelativeTarget,
                                    &identity.rel_path,
                                    unresolved_relative_message(index, descriptor, member),
                                )
                                .at_line(descriptor.lineno),
                            );
                        }
                        Node::external(&package)
                    }
                };

                if !seen.insert(target_node.id.clone()) {
                    continue;
                }
                let target_idx = graph.ensure_node(target_node);
                graph.add_edge(
                    source_idx,
                    target_idx,
                    EdgeData::import(
                        descriptor.import_type,
                        &member.written,
                        descriptor.lineno,
                        descriptor.col,
                    ),
                );
            }
        }

        for reference in &config_refs {
            let target_idx = graph.ensure_node(Node::config_file(&reference.path));
            if graph.has_edge(source_idx, target_idx, EdgeKind::ConfigAccess) {
                continue;
            }
            graph.add_edge(
                source_idx,
                target_idx,
                EdgeData::config_access(&reference.path, reference.lineno, reference.col),
            );
        }

        debug!(
            "{}: {} import statements, {} config references",
            identity.module,
            imports.len(),
            config_refs.len()
        );
    }

    info!(
        "graph built: {} nodes, {} edges, {} issues",
        graph.node_count(),
        graph.edge_count(),
        graph.issues().len()
    );
    graph
}
