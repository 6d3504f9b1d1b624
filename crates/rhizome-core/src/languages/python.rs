//! Python language analyser.

use std::collections::HashSet;

use tree_sitter::{Language, Node, Tree};

use super::{preorder, LanguageAnalyser};
use crate::config::{
    AliasMember, AnalysisConfig, ConfigReference, ImportDescriptor, ImportType, Issue, IssueType,
    ModuleIdentity,
};
use crate::graph::module_index::package_of;

pub struct PythonAnalyser;

impl Default for PythonAnalyser {
    fn default() -> Self {
        Self
    }
}

/// A `from X import ...` statement before relative resolution.
struct FromImport {
    /// Module text as written (`..util`, `os.path`, `.`).
    target: String,
    level: usize,
    /// Dotted module after the leading dots, possibly empty.
    module: String,
    names: Vec<String>,
    wildcard: bool,
    lineno: usize,
    col: usize,
}

impl PythonAnalyser {
    pub fn new() -> Self {
        Self
    }

    fn import_statement(node: &Node, source: &[u8], imports: &mut Vec<ImportDescriptor>) {
        let (lineno, col) = position(node);
        for i in 0..node.child_count() {
            let child = match node.child(i) {
                Some(c) => c,
                None => continue,
            };
            let name = match child.kind() {
                "dotted_name" => compact(node_text(&child, source)),
                "aliased_import" => child
                    .child_by_field_name("name")
                    .map(|n| compact(node_text(&n, source)))
                    .unwrap_or_default(),
                _ => continue,
            };
            if name.is_empty() {
                continue;
            }
            imports.push(ImportDescriptor {
                target: name.clone(),
                import_type: ImportType::Import,
                relative_level: 0,
                base: String::new(),
                alias_members: vec![AliasMember {
                    candidate: name.clone(),
                    written: name,
                }],
                lineno,
                col,
            });
        }
    }

    fn import_from_statement(node: &Node, source: &[u8]) -> Option<FromImport> {
        let (lineno, col) = position(node);
        let module_node = node.child_by_field_name("module_name")?;
        let target = compact(node_text(&module_node, source));

        let (level, module) = if module_node.kind() == "relative_import" {
            let mut level = 0;
            let mut module = String::new();
            for i in 0..module_node.child_count() {
                if let Some(c) = module_node.child(i) {
                    match c.kind() {
                        "import_prefix" => {
                            level = node_text(&c, source).chars().filter(|ch| *ch == '.').count()
                        }
                        "dotted_name" => module = compact(node_text(&c, source)),
                        _ => {}
                    }
                }
            }
            (level, module)
        } else {
            (0, target.clone())
        };

        let (names, wildcard) = imported_names(node, source);
        Some(FromImport {
            target,
            level,
            module,
            names,
            wildcard,
            lineno,
            col,
        })
    }

    fn future_import_statement(node: &Node, source: &[u8]) -> FromImport {
        let (lineno, col) = position(node);
        let (names, wildcard) = imported_names(node, source);
        FromImport {
            target: "__future__".to_string(),
            level: 0,
            module: "__future__".to_string(),
            names,
            wildcard,
            lineno,
            col,
        }
    }

    /// Resolve a from-import against the current module and explode its members.
    fn from_import_descriptor(
        stmt: FromImport,
        identity: &ModuleIdentity,
        issues: &mut Vec<Issue>,
    ) -> Option<ImportDescriptor> {
        let (base, import_type) = if stmt.level > 0 {
            let package = package_of(&identity.module, identity.is_package);
            let resolved = match resolve_relative_base(package, stmt.level) {
                Some(b) => b,
                None => {
                    issues.push(
                        Issue::new(
                            IssueType::RelativeImportError,
                            &identity.rel_path,
                            format!(
                                "unable to resolve relative import '{}' (level={}) from package '{}'",
                                stmt.target, stmt.level, package
                            ),
                        )
                        .at_line(stmt.lineno),
                    );
                    return None;
                }
            };
            let joined = [resolved.as_str(), stmt.module.as_str()]
                .iter()
                .filter(|p| !p.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join(".");
            (joined, ImportType::RelativeImport)
        } else {
            (stmt.module.clone(), ImportType::FromImport)
        };

        let mut members = Vec::new();
        if base.is_empty() {
            if stmt.wildcard {
                issues.push(
                    Issue::new(
                        IssueType::UnresolvedWildcardTarget,
                        &identity.rel_path,
                        format!("wildcard import from '{}' has no module to bind to", stmt.target),
                    )
                    .at_line(stmt.lineno),
                );
                return None;
            }
            for name in &stmt.names {
                members.push(AliasMember {
                    candidate: name.clone(),
                    written: join_written(&stmt.target, name),
                });
            }
        } else {
            if stmt.wildcard {
                members.push(AliasMember {
                    candidate: base.clone(),
                    written: stmt.target.clone(),
                });
            }
            for name in &stmt.names {
                members.push(AliasMember {
                    candidate: format!("{base}.{name}"),
                    written: join_written(&stmt.target, name),
                });
            }
        }

        if members.is_empty() {
            return None;
        }

        Some(ImportDescriptor {
            target: stmt.target,
            import_type,
            relative_level: stmt.level,
            base,
            alias_members: members,
            lineno: stmt.lineno,
            col: stmt.col,
        })
    }
}

impl LanguageAnalyser for PythonAnalyser {
    fn extensions(&self) -> &[&str] {
        &["py", "pyi"]
    }

    fn language_name(&self) -> &str {
        "Python"
    }

    fn get_language(&self) -> Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn extract_imports(
        &self,
        tree: &Tree,
        source: &[u8],
        identity: &ModuleIdentity,
    ) -> (Vec<ImportDescriptor>, Vec<Issue>) {
        let mut imports = Vec::new();
        let mut issues = Vec::new();

        for node in preorder(tree.root_node()) {
            let stmt = match node.kind() {
                "import_statement" => {
                    Self::import_statement(&node, source, &mut imports);
                    continue;
                }
                "import_from_statement" => match Self::import_from_statement(&node, source) {
                    Some(s) => s,
                    None => continue,
                },
                "future_import_statement" => Self::future_import_statement(&node, source),
                _ => continue,
            };
            if let Some(descriptor) = Self::from_import_descriptor(stmt, identity, &mut issues) {
                imports.push(descriptor);
            }
        }

        (imports, issues)
    }

    fn extract_config_refs(
        &self,
        tree: &Tree,
        source: &[u8],
        config: &AnalysisConfig,
    ) -> Vec<ConfigReference> {
        let mut refs = Vec::new();
        // Literals already reported through their call site
        let mut claimed: HashSet<usize> = HashSet::new();

        for node in preorder(tree.root_node()) {
            match node.kind() {
                "call" => {
                    let arg = match opener_argument(&node, source, config) {
                        Some(a) => a,
                        None => continue,
                    };
                    if let Some(value) = string_literal_value(&arg, source) {
                        if config.is_config_path(&value) {
                            claimed.insert(arg.start_byte());
                            let (lineno, col) = position(&node);
                            refs.push(ConfigReference {
                                path: normalize_config_path(&value),
                                lineno,
                                col,
                            });
                        }
                    }
                }
                "string" if config.scan_bare_literals && !claimed.contains(&node.start_byte()) => {
                    if let Some(value) = string_literal_value(&node, source) {
                        if config.is_config_path(&value) {
                            let (lineno, col) = position(&node);
                            refs.push(ConfigReference {
                                path: normalize_config_path(&value),
                                lineno,
                                col,
                            });
                        }
                    }
                }
                _ => {}
            }
        }

        refs
    }
}

/// Absolute base package of a relative import of `level` dots issued from `package`.
///
/// Level 1 is the package itself, level 2 its parent, and so on. Returns `None`
/// when the import climbs above the top-level package.
pub fn resolve_relative_base(package: &str, level: usize) -> Option<String> {
    let segments: Vec<&str> = if package.is_empty() {
        Vec::new()
    } else {
        package.split('.').collect()
    };
    let drop = level.saturating_sub(1);
    if drop > segments.len() {
        return None;
    }
    Some(segments[..segments.len() - drop].join("."))
}

/// Normalise path separators in a config literal.
pub fn normalize_config_path(raw: &str) -> String {
    raw.replace('\\', "/")
}

fn node_text<'a>(node: &Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// 1-based (line, column) of a node.
fn position(node: &Node) -> (usize, usize) {
    let point = node.start_position();
    (point.row + 1, point.column + 1)
}

fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn join_written(target: &str, name: &str) -> String {
    if target.ends_with('.') {
        format!("{target}{name}")
    } else {
        format!("{target}.{name}")
    }
}

/// Imported names (aliases dropped) and whether the statement is a wildcard.
fn imported_names(node: &Node, source: &[u8]) -> (Vec<String>, bool) {
    let mut cursor = node.walk();
    let names = node
        .children_by_field_name("name", &mut cursor)
        .filter_map(|c| match c.kind() {
            "dotted_name" => Some(compact(node_text(&c, source))),
            "aliased_import" => c
                .child_by_field_name("name")
                .map(|n| compact(node_text(&n, source))),
            _ => None,
        })
        .filter(|n| !n.is_empty())
        .collect();
    let wildcard = (0..node.child_count())
        .filter_map(|i| node.child(i))
        .any(|c| c.kind() == "wildcard_import");
    (names, wildcard)
}

/// First positional argument of a file-opening call, if it is a string literal.
fn opener_argument<'t>(
    call: &Node<'t>,
    source: &[u8],
    config: &AnalysisConfig,
) -> Option<Node<'t>> {
    let function = call.child_by_field_name("function")?;
    let is_opener = match function.kind() {
        "identifier" => {
            let name = node_text(&function, source);
            config.opener_functions.iter().any(|f| f == name)
        }
        "attribute" => function
            .child_by_field_name("attribute")
            .map(|a| node_text(&a, source))
            .is_some_and(|name| config.opener_methods.iter().any(|m| m == name)),
        _ => false,
    };
    if !is_opener {
        return None;
    }

    let args = call.child_by_field_name("arguments")?;
    if args.kind() != "argument_list" {
        return None;
    }
    let first = (0..args.named_child_count())
        .filter_map(|i| args.named_child(i))
        .find(|c| c.kind() != "comment")?;
    (first.kind() == "string").then_some(first)
}

/// Value of a plain string literal. f-strings and byte strings yield `None`.
fn string_literal_value(node: &Node, source: &[u8]) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let mut start = None;
    let mut end = None;
    for i in 0..node.child_count() {
        if let Some(c) = node.child(i) {
            match c.kind() {
                "string_start" => start = Some(c),
                "string_end" => end = Some(c),
                "interpolation" => return None,
                _ => {}
            }
        }
    }
    let (start, end) = (start?, end?);

    let prefix = node_text(&start, source)
        .trim_end_matches(|c| c == '"' || c == '\'')
        .to_ascii_lowercase();
    if prefix.contains('f') || prefix.contains('b') {
        return None;
    }

    let body = source.get(start.end_byte()..end.start_byte())?;
    let text = std::str::from_utf8(body).ok()?;
    if prefix.contains('r') {
        Some(text.to_string())
    } else {
        Some(unescape_quotes_and_backslashes(text))
    }
}

fn unescape_quotes_and_backslashes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(n @ ('\\' | '\'' | '"')) => out.push(n),
            Some(n) => {
                out.push('\\');
                out.push(n);
            }
            None => out.push('\\'),
        }
    }
    out
}
