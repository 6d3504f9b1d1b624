//! Core data types and configuration for Rhizome analysis.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema version written into every artifact.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Kind of vertex in the dependency graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    InternalModule,
    ExternalPackage,
    ConfigFile,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InternalModule => "internal_module",
            Self::ExternalPackage => "external_package",
            Self::ConfigFile => "config_file",
        }
    }

    /// Prefix used when building node ids (`<prefix>:<label>`).
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::InternalModule => "module",
            Self::ExternalPackage => "external",
            Self::ConfigFile => "config",
        }
    }

    /// Build the canonical node id for a label of this kind.
    pub fn node_id(&self, label: &str) -> String {
        format!("{}:{}", self.id_prefix(), label)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of relationship between two nodes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Imports,
    ConfigAccess,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Imports => "imports",
            Self::ConfigAccess => "config_access",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Syntactic form of an import statement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ImportType {
    /// `import a.b`
    Import,
    /// `from a import b`
    FromImport,
    /// `from .a import b`
    RelativeImport,
}

impl ImportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::FromImport => "from_import",
            Self::RelativeImport => "relative_import",
        }
    }
}

impl std::fmt::Display for ImportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a non-fatal analysis anomaly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    ParseError,
    ReadError,
    RelativeImportError,
    UnresolvedRelativeTarget,
    UnresolvedWildcardTarget,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseError => "parse_error",
            Self::ReadError => "read_error",
            Self::RelativeImportError => "relative_import_error",
            Self::UnresolvedRelativeTarget => "unresolved_relative_target",
            Self::UnresolvedWildcardTarget => "unresolved_wildcard_target",
        }
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A vertex of the dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    #[serde(default)]
    pub is_package: bool,
    pub source_file: Option<String>,
}

impl Node {
    pub fn internal(module: &str, rel_path: &str, is_package: bool) -> Self {
        Self {
            id: NodeKind::InternalModule.node_id(module),
            kind: NodeKind::InternalModule,
            label: module.to_string(),
            is_package,
            source_file: Some(rel_path.to_string()),
        }
    }

    pub fn external(package: &str) -> Self {
        Self {
            id: NodeKind::ExternalPackage.node_id(package),
            kind: NodeKind::ExternalPackage,
            label: package.to_string(),
            is_package: false,
            source_file: None,
        }
    }

    pub fn config_file(path: &str) -> Self {
        Self {
            id: NodeKind::ConfigFile.node_id(path),
            kind: NodeKind::ConfigFile,
            label: path.to_string(),
            is_package: false,
            source_file: Some(path.to_string()),
        }
    }
}

/// A non-fatal anomaly found while extracting or resolving a file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub file: String,
    pub message: String,
    pub lineno: Option<usize>,
}

impl Issue {
    pub fn new(issue_type: IssueType, file: &str, message: impl Into<String>) -> Self {
        Self {
            issue_type,
            file: file.to_string(),
            message: message.into(),
            lineno: None,
        }
    }

    pub fn at_line(mut self, lineno: usize) -> Self {
        self.lineno = Some(lineno);
        self
    }
}

/// Canonical identity of one discovered source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleIdentity {
    pub module: String,
    pub rel_path: String,
    pub is_package: bool,
}

/// One imported name of a statement, before target resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasMember {
    /// Absolute dotted candidate (`X.a`, or `X` for a wildcard).
    pub candidate: String,
    /// Target as written in source, used as the edge `raw` value.
    pub written: String,
}

/// Raw import statement extracted from source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDescriptor {
    /// Module text as written, including leading dots for relative imports.
    pub target: String,
    pub import_type: ImportType,
    /// 0 for absolute imports, otherwise the number of leading dots.
    pub relative_level: usize,
    /// Absolute module the members hang off (empty for `import x` and bare `from . import x`).
    pub base: String,
    pub alias_members: Vec<AliasMember>,
    pub lineno: usize,
    pub col: usize,
}

/// A literal that looks like a configuration file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigReference {
    pub path: String,
    pub lineno: usize,
    pub col: usize,
}

/// Everything the extractor produced for a single file.
#[derive(Debug, Clone)]
pub struct FileExtraction {
    pub identity: ModuleIdentity,
    pub imports: Vec<ImportDescriptor>,
    pub config_refs: Vec<ConfigReference>,
    pub issues: Vec<Issue>,
}

/// Configuration for an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub repo_path: String,
    /// Path of the narrative report; the other artifacts are written beside it.
    pub output_path: Option<String>,
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default = "default_true")]
    pub use_gitignore: bool,
    #[serde(default = "default_root_markers")]
    pub root_markers: Vec<String>,
    #[serde(default = "default_config_extensions")]
    pub config_extensions: Vec<String>,
    #[serde(default = "default_opener_functions")]
    pub opener_functions: Vec<String>,
    #[serde(default = "default_opener_methods")]
    pub opener_methods: Vec<String>,
    #[serde(default = "default_true")]
    pub scan_bare_literals: bool,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub quiet: bool,
}

fn default_true() -> bool {
    true
}
fn default_source_extensions() -> Vec<String> {
    vec!["py".to_string()]
}
fn default_root_markers() -> Vec<String> {
    [".git", "pyproject.toml", "setup.py", "setup.cfg"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_config_extensions() -> Vec<String> {
    [
        ".json", ".yaml", ".yml", ".sql", ".txt", ".csv", ".ini", ".toml", ".env",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_opener_functions() -> Vec<String> {
    ["open", "Path"].into_iter().map(String::from).collect()
}
fn default_opener_methods() -> Vec<String> {
    [
        "open",
        "load",
        "read_csv",
        "read_json",
        "read_sql",
        "read_excel",
        "read_parquet",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_top_k() -> usize {
    20
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            repo_path: String::new(),
            output_path: None,
            source_extensions: default_source_extensions(),
            exclude_patterns: Vec::new(),
            use_gitignore: true,
            root_markers: default_root_markers(),
            config_extensions: default_config_extensions(),
            opener_functions: default_opener_functions(),
            opener_methods: default_opener_methods(),
            scan_bare_literals: true,
            top_k: default_top_k(),
            verbose: false,
            quiet: false,
        }
    }
}

impl AnalysisConfig {
    /// True when `value` ends with one of the configured config extensions (case-insensitive).
    pub fn is_config_path(&self, value: &str) -> bool {
        let lower = value.to_lowercase();
        self.config_extensions
            .iter()
            .any(|ext| lower.ends_with(&ext.to_lowercase()))
    }
}

// ---------------------------------------------------------------------------
// Output schema
// ---------------------------------------------------------------------------

/// Serialized form of a graph edge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeOutput {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub import_type: Option<ImportType>,
    pub raw: String,
    pub lineno: usize,
    pub col: usize,
}

/// Forward and reverse adjacency, keys and targets sorted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdjacencyOutput {
    pub forward: BTreeMap<String, Vec<String>>,
    pub reverse: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryMetrics {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub internal_modules: usize,
    pub external_packages: usize,
    pub config_files: usize,
    pub import_edges: usize,
    pub config_access_edges: usize,
    pub issues: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankedModule {
    pub module: String,
    pub value: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DegreeMetrics {
    pub fan_in: BTreeMap<String, usize>,
    pub fan_out: BTreeMap<String, usize>,
    pub top_fan_in: Vec<RankedModule>,
    pub top_fan_out: Vec<RankedModule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryPoints {
    pub roots: Vec<String>,
    pub sinks: Vec<String>,
    pub isolated: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleMetrics {
    pub scc_count: usize,
    pub self_cycle_count: usize,
    pub largest_scc_size: usize,
    /// Strongly connected components with more than one module.
    pub sccs: Vec<Vec<String>>,
    /// Modules that import themselves directly.
    pub self_cycles: Vec<Vec<String>>,
}

/// The metrics block shared by the graph document and the metrics artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metrics {
    pub summary: SummaryMetrics,
    pub degree_metrics: DegreeMetrics,
    pub entrypoints: EntryPoints,
    pub cycles: CycleMetrics,
}

/// Canonical graph document (`dependencies_graph.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphDocument {
    pub version: String,
    pub generated_at: String,
    pub project_root: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<EdgeOutput>,
    pub adjacency: AdjacencyOutput,
    pub issues: Vec<Issue>,
    pub metrics: Metrics,
}

/// Metrics-only document (`architecture_metrics.yaml`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsDocument {
    pub version: String,
    pub generated_at: String,
    pub project_root: String,
    #[serde(flatten)]
    pub metrics: Metrics,
}
