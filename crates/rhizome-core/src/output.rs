//! Artifact rendering: canonical graph JSON, metrics YAML and the Markdown report.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use log::{debug, info, warn};

use crate::config::{
    EdgeKind, GraphDocument, Metrics, MetricsDocument, Node, NodeKind, RankedModule,
    SCHEMA_VERSION,
};
use crate::error::{AnalysisError, Result};
use crate::graph::dependency_graph::DependencyGraph;

pub const GRAPH_FILE_NAME: &str = "dependencies_graph.json";
pub const METRICS_FILE_NAME: &str = "architecture_metrics.yaml";
pub const REPORT_FILE_NAME: &str = "dependencies_report.md";

/// External libraries listed per entry point before the rest are summarised.
const MAX_LISTED_EXTERNALS: usize = 5;

/// Where the three artifacts were published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub graph_json: PathBuf,
    pub metrics_yaml: PathBuf,
    pub report_md: PathBuf,
}

/// Current UTC time in RFC 3339, the format of `generated_at`.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Assemble the canonical document. Nodes are sorted by id; edges and issues
/// keep build order.
pub fn build_document(
    graph: &DependencyGraph,
    metrics: Metrics,
    project_root: &str,
    generated_at: &str,
) -> GraphDocument {
    let mut nodes: Vec<Node> = graph.nodes().cloned().collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));

    GraphDocument {
        version: SCHEMA_VERSION.to_string(),
        generated_at: generated_at.to_string(),
        project_root: project_root.to_string(),
        nodes,
        edges: graph.edge_outputs(),
        adjacency: graph.adjacency_output(),
        issues: graph.issues().to_vec(),
        metrics,
    }
}

pub fn metrics_document(doc: &GraphDocument) -> MetricsDocument {
    MetricsDocument {
        version: doc.version.clone(),
        generated_at: doc.generated_at.clone(),
        project_root: doc.project_root.clone(),
        metrics: doc.metrics.clone(),
    }
}

pub fn render_graph_json(doc: &GraphDocument) -> Result<String> {
    let mut json = serde_json::to_string_pretty(doc)?;
    json.push('\n');
    Ok(json)
}

pub fn render_metrics_yaml(doc: &GraphDocument) -> Result<String> {
    Ok(serde_yaml::to_string(&metrics_document(doc))?)
}

/// Per-module view of the document's edges, grouped by target kind.
#[derive(Default)]
struct ModuleDeps {
    internal: BTreeSet<String>,
    external: BTreeSet<String>,
    config: BTreeSet<String>,
}

fn module_dependencies(doc: &GraphDocument) -> BTreeMap<String, ModuleDeps> {
    let by_id: HashMap<&str, &Node> = doc.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let mut deps: BTreeMap<String, ModuleDeps> = doc
        .nodes
        .iter()
        .filter(|n| n.kind == NodeKind::InternalModule)
        .map(|n| (n.label.clone(), ModuleDeps::default()))
        .collect();

    for edge in &doc.edges {
        let (Some(source), Some(target)) =
            (by_id.get(edge.source.as_str()), by_id.get(edge.target.as_str()))
        else {
            continue;
        };
        let Some(entry) = deps.get_mut(&source.label) else {
            continue;
        };
        let bucket = match target.kind {
            NodeKind::InternalModule => &mut entry.internal,
            NodeKind::ExternalPackage => &mut entry.external,
            NodeKind::ConfigFile => &mut entry.config,
        };
        bucket.insert(target.label.clone());
    }
    deps
}

fn code_list<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(|i| format!("`{i}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Clone, Copy)]
enum TreeItem<'a> {
    Module(&'a str),
    Config(&'a str),
    External(&'a str),
}

fn tree_items(d: &ModuleDeps) -> Vec<TreeItem<'_>> {
    d.internal
        .iter()
        .map(|m| TreeItem::Module(m.as_str()))
        .chain(d.config.iter().map(|c| TreeItem::Config(c.as_str())))
        .chain(d.external.iter().map(|e| TreeItem::External(e.as_str())))
        .collect()
}

struct TreeFrame<'a> {
    prefix: String,
    items: Vec<TreeItem<'a>>,
    next: usize,
}

/// Transitive dependency tree of `root`, one line per entry, root line excluded.
///
/// Each internal module is expanded at most once per tree; later occurrences are
/// printed without children.
fn dependency_tree(root: &str, deps: &BTreeMap<String, ModuleDeps>) -> Vec<String> {
    let mut lines = Vec::new();
    let Some(root_deps) = deps.get(root) else {
        return lines;
    };
    let mut visited: BTreeSet<&str> = BTreeSet::new();
    visited.insert(root);

    let mut stack = vec![TreeFrame {
        prefix: String::new(),
        items: tree_items(root_deps),
        next: 0,
    }];
    while let Some(frame) = stack.last_mut() {
        let Some(item) = frame.items.get(frame.next).copied() else {
            stack.pop();
            continue;
        };
        frame.next += 1;
        let last = frame.next == frame.items.len();
        let connector = if last { "└── " } else { "├── " };
        let prefix = frame.prefix.clone();

        match item {
            TreeItem::Module(module) => {
                lines.push(format!("{prefix}{connector}📦 {module}"));
                if let Some(child) = deps.get(module) {
                    if visited.insert(module) {
                        let extension = if last { "    " } else { "│   " };
                        stack.push(TreeFrame {
                            prefix: format!("{prefix}{extension}"),
                            items: tree_items(child),
                            next: 0,
                        });
                    }
                }
            }
            TreeItem::Config(path) => lines.push(format!("{prefix}{connector}📄 {path}")),
            TreeItem::External(package) => {
                lines.push(format!("{prefix}{connector}🔗 {package}"))
            }
        }
    }
    lines
}

fn ranked_table(out: &mut String, title: &str, header: &str, ranked: &[RankedModule]) {
    let _ = writeln!(out, "### {title}\n");
    if ranked.is_empty() {
        out.push_str("_No modules._\n\n");
        return;
    }
    let _ = writeln!(out, "| Module | {header} |");
    out.push_str("|--------|-------|\n");
    for entry in ranked {
        let _ = writeln!(out, "| `{}` | {} |", entry.module, entry.value);
    }
    out.push('\n');
}

/// Render the narrative report from the canonical document alone.
pub fn render_markdown(doc: &GraphDocument) -> String {
    let metrics = &doc.metrics;
    let summary = &metrics.summary;
    let deps = module_dependencies(doc);
    let mut out = String::new();

    out.push_str("# Project Dependency Analysis\n\n");
    out.push_str(
        "> Dependencies between project modules, configuration files and external \
         packages, derived by static analysis.\n\n",
    );
    let _ = writeln!(out, "- **Project root**: `{}`", doc.project_root);
    let _ = writeln!(out, "- **Generated at**: {}", doc.generated_at);
    let _ = writeln!(out, "- **Schema version**: {}\n", doc.version);

    out.push_str("## Executive Summary\n\n");
    let _ = writeln!(out, "- **Internal modules**: {}", summary.internal_modules);
    let _ = writeln!(out, "- **External packages**: {}", summary.external_packages);
    let _ = writeln!(out, "- **Configuration files**: {}", summary.config_files);
    let _ = writeln!(out, "- **Import edges**: {}", summary.import_edges);
    let _ = writeln!(out, "- **Config access edges**: {}", summary.config_access_edges);
    let _ = writeln!(out, "- **Entry points**: {}", metrics.entrypoints.roots.len());
    let _ = writeln!(
        out,
        "- **Cycles**: {} strongly connected components, {} self-imports",
        metrics.cycles.scc_count, metrics.cycles.self_cycle_count
    );
    let _ = writeln!(out, "- **Analysis issues**: {}\n", summary.issues);
    out.push_str("---\n\n");

    out.push_str("## Entry Points\n\n");
    if metrics.entrypoints.roots.is_empty() {
        out.push_str("_Every module is imported by another module._\n\n");
    } else {
        out.push_str("Modules that no other project module imports:\n\n");
        for root in &metrics.entrypoints.roots {
            let _ = writeln!(out, "### `{root}`\n");
            let Some(d) = deps.get(root) else {
                continue;
            };
            let total = d.internal.len() + d.config.len() + d.external.len();
            let _ = writeln!(
                out,
                "**Direct dependencies**: {} ({} modules, {} configs, {} packages)\n",
                total,
                d.internal.len(),
                d.config.len(),
                d.external.len()
            );
            if !d.internal.is_empty() {
                let _ = writeln!(out, "- **Internal modules**: {}", code_list(&d.internal));
            }
            if !d.config.is_empty() {
                let _ = writeln!(out, "- **Config files**: {}", code_list(&d.config));
            }
            if !d.external.is_empty() {
                let mut listed = code_list(d.external.iter().take(MAX_LISTED_EXTERNALS));
                let rest = d.external.len().saturating_sub(MAX_LISTED_EXTERNALS);
                if rest > 0 {
                    let _ = write!(listed, " (+{rest} more)");
                }
                let _ = writeln!(out, "- **External packages**: {listed}");
            }
            out.push('\n');
        }
    }
    if !metrics.entrypoints.sinks.is_empty() {
        let _ = writeln!(
            out,
            "**Sinks** (import no project module): {}\n",
            code_list(&metrics.entrypoints.sinks)
        );
    }
    if !metrics.entrypoints.isolated.is_empty() {
        let _ = writeln!(
            out,
            "**Isolated** (no internal edges at all): {}\n",
            code_list(&metrics.entrypoints.isolated)
        );
    }
    out.push_str("---\n\n");

    out.push_str("## Full Dependency Map\n\n");
    out.push_str("Transitive dependencies of each entry point:\n\n");
    out.push_str("**Legend**:\n");
    out.push_str("- 📦 Project module\n");
    out.push_str("- 📄 Configuration file\n");
    out.push_str("- 🔗 External package\n\n");
    if metrics.entrypoints.roots.is_empty() {
        out.push_str("_No entry points to expand._\n\n");
    }
    for root in &metrics.entrypoints.roots {
        let _ = writeln!(out, "### {root}\n");
        out.push_str("```\n");
        let _ = writeln!(out, "{root}");
        for line in dependency_tree(root, &deps) {
            let _ = writeln!(out, "{line}");
        }
        out.push_str("```\n\n");
    }
    out.push_str("---\n\n");

    out.push_str("## All Modules Index\n\n");
    out.push_str("| Module | Type | Local deps | Config files | External packages |\n");
    out.push_str("|--------|------|------------|--------------|-------------------|\n");
    let roots: BTreeSet<&str> = metrics.entrypoints.roots.iter().map(String::as_str).collect();
    for (module, d) in &deps {
        let kind = if roots.contains(module.as_str()) {
            "Entry Point"
        } else {
            "Imported"
        };
        let _ = writeln!(
            out,
            "| `{module}` | {kind} | {} | {} | {} |",
            d.internal.len(),
            d.config.len(),
            d.external.len()
        );
    }
    out.push('\n');
    out.push_str("---\n\n");

    out.push_str("## Dependency Hotspots\n\n");
    ranked_table(&mut out, "Top Fan-Out", "Fan-out", &metrics.degree_metrics.top_fan_out);
    ranked_table(&mut out, "Top Fan-In", "Fan-in", &metrics.degree_metrics.top_fan_in);
    out.push_str("---\n\n");

    out.push_str("## Cycles (SCC)\n\n");
    let cycles = &metrics.cycles;
    if cycles.sccs.is_empty() && cycles.self_cycles.is_empty() {
        out.push_str("_No import cycles detected._\n\n");
    } else {
        let _ = writeln!(
            out,
            "{} components, largest has {} modules.\n",
            cycles.scc_count, cycles.largest_scc_size
        );
        for (i, component) in cycles.sccs.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. {} ({} modules)",
                i + 1,
                code_list(component),
                component.len()
            );
        }
        if !cycles.sccs.is_empty() {
            out.push('\n');
        }
        for module in cycles.self_cycles.iter().flatten() {
            let _ = writeln!(out, "- `{module}` imports itself");
        }
        if !cycles.self_cycles.is_empty() {
            out.push('\n');
        }
    }
    out.push_str("---\n\n");

    out.push_str("## Config File Access\n\n");
    let mut users: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (module, d) in &deps {
        for path in &d.config {
            users.entry(path.as_str()).or_default().insert(module.as_str());
        }
    }
    let config_edges = doc
        .edges
        .iter()
        .filter(|e| e.kind == EdgeKind::ConfigAccess)
        .count();
    if users.is_empty() {
        out.push_str("_No configuration file references detected._\n\n");
    } else {
        let _ = writeln!(out, "{config_edges} accesses across {} files:\n", users.len());
        for (path, modules) in &users {
            let used_by = modules
                .iter()
                .map(|m| format!("`{m}`"))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(out, "- **`{path}`** used by: {used_by}");
        }
        out.push('\n');
    }
    out.push_str("---\n\n");

    out.push_str("## Analysis Issues\n\n");
    if doc.issues.is_empty() {
        out.push_str("_No issues._\n\n");
    } else {
        out.push_str("| Type | File | Line | Message |\n");
        out.push_str("|------|------|------|---------|\n");
        for issue in &doc.issues {
            let line = issue.lineno.map(|l| l.to_string()).unwrap_or_default();
            let _ = writeln!(
                out,
                "| {} | `{}` | {} | {} |",
                issue.issue_type,
                issue.file,
                line,
                issue.message.replace('|', "\\|")
            );
        }
        out.push('\n');
    }
    out.push_str("---\n\n");

    out.push_str("## Notes\n\n");
    out.push_str("- Imports are read from the syntax tree; dynamic imports are not seen.\n");
    out.push_str(
        "- External packages are keyed by their top-level name; version and install \
         location are not checked.\n",
    );
    out.push_str(
        "- Configuration files are detected from string literals with known file \
         extensions and may include false positives.\n",
    );
    out.push_str("- Fan-in, fan-out and cycles consider project modules only.\n");
    out.push_str(
        "- A relative import from a directory without `__init__.py` can resolve to an \
         external package named after that directory; check `unresolved_relative_target` \
         issues before treating such a package as third-party.\n",
    );

    out
}

fn write_err(path: &Path, source: std::io::Error) -> AnalysisError {
    AnalysisError::Output {
        path: path.to_path_buf(),
        source,
    }
}

fn hidden_sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{suffix}"))
}

/// Whether an artifact already exists at `path`. Anything there that is not a
/// regular file blocks the write.
fn existing_artifact(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(true),
        Ok(_) => Err(write_err(
            path,
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                "destination exists and is not a regular file",
            ),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(write_err(path, e)),
    }
}

/// One artifact on its way into place.
struct Staged {
    target: PathBuf,
    temp: PathBuf,
    /// Set once the previous artifact has been moved aside.
    backup: Option<PathBuf>,
    published: bool,
}

/// Undo a partially applied publish: drop new files, restore the previous ones.
fn roll_back(staged: &[Staged]) {
    for s in staged {
        if s.published {
            let _ = fs::remove_file(&s.target);
        }
        if let Some(backup) = &s.backup {
            if let Err(e) = fs::rename(backup, &s.target) {
                warn!("could not restore {}: {e}", s.target.display());
            }
        }
        let _ = fs::remove_file(&s.temp);
    }
}

/// Write all three artifacts. The graph JSON and metrics YAML land beside `report_path`.
///
/// Either every artifact is replaced or none is: existing artifacts are moved to
/// backup siblings before the new ones are renamed into place, and restored if
/// any step fails.
pub fn write_artifacts(doc: &GraphDocument, report_path: &Path) -> Result<ArtifactPaths> {
    let dir = match report_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let paths = ArtifactPaths {
        graph_json: dir.join(GRAPH_FILE_NAME),
        metrics_yaml: dir.join(METRICS_FILE_NAME),
        report_md: report_path.to_path_buf(),
    };

    let rendered = [
        (paths.graph_json.clone(), render_graph_json(doc)?),
        (paths.metrics_yaml.clone(), render_metrics_yaml(doc)?),
        (paths.report_md.clone(), render_markdown(doc)),
    ];

    fs::create_dir_all(&dir).map_err(|e| write_err(&dir, e))?;

    let mut existing = Vec::with_capacity(rendered.len());
    for (path, _) in &rendered {
        existing.push(existing_artifact(path)?);
    }

    let mut staged: Vec<Staged> = Vec::with_capacity(rendered.len());
    for (path, content) in &rendered {
        let temp = hidden_sibling(path, "tmp");
        let written = fs::write(&temp, content);
        staged.push(Staged {
            target: path.clone(),
            temp,
            backup: None,
            published: false,
        });
        if let Err(e) = written {
            roll_back(&staged);
            return Err(write_err(path, e));
        }
    }

    for i in 0..staged.len() {
        if !existing[i] {
            continue;
        }
        let backup = hidden_sibling(&staged[i].target, "bak");
        if let Err(e) = fs::rename(&staged[i].target, &backup) {
            roll_back(&staged);
            return Err(write_err(&staged[i].target, e));
        }
        staged[i].backup = Some(backup);
    }

    for i in 0..staged.len() {
        if let Err(e) = fs::rename(&staged[i].temp, &staged[i].target) {
            roll_back(&staged);
            return Err(write_err(&staged[i].target, e));
        }
        staged[i].published = true;
        debug!("published {}", staged[i].target.display());
    }

    for s in &staged {
        if let Some(backup) = &s.backup {
            let _ = fs::remove_file(backup);
        }
    }

    info!("artifacts written to {}", dir.display());
    Ok(paths)
}
