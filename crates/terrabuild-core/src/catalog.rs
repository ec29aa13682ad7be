//! The version catalog: a hierarchical table of named versions.
//!
//! The catalog is loaded from a TOML file whose tables are namespaces:
//!
//! ```toml
//! [Libraries]
//! cloud = "1.6.0"
//!
//! [Libraries.Internal]
//! fastutil = "8.5.6"
//!
//! [Fabric]
//! minecraft = "1.18.2"
//! yarn = "$minecraft+build.3"
//! ```
//!
//! Values may reference other values (see [`crate::placeholder`]). All
//! references are resolved once, at construction, over a directed reference
//! graph; afterwards the catalog is immutable and only holds final strings.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};

use terrabuild_util::errors::TerraError;

use crate::key_path::{is_valid_segment, KeyPath};
use crate::placeholder::Template;

/// Default catalog file name, relative to the project root.
pub const DEFAULT_CATALOG_FILE: &str = "versions.toml";

/// Longest chain of references a value may go through before it is
/// rejected as cyclic.
pub const MAX_REFERENCE_DEPTH: usize = 8;

/// An immutable, fully resolved version catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<KeyPath, String>,
    namespaces: BTreeSet<KeyPath>,
}

impl Catalog {
    /// Load and resolve a catalog file.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TerraError::Manifest {
            message: format!("Failed to read version catalog {}: {e}", path.display()),
        })?;
        let catalog = Self::parse(&content)?;
        tracing::debug!(
            "loaded {} catalog entries from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parse and resolve a catalog from TOML text.
    pub fn parse(content: &str) -> miette::Result<Self> {
        let table: toml::Table = toml::from_str(content).map_err(|e| TerraError::Manifest {
            message: format!("Failed to parse version catalog: {e}"),
        })?;

        let mut raw = BTreeMap::new();
        let mut namespaces = BTreeSet::new();
        flatten(&table, None, &mut raw, &mut namespaces)?;

        let entries = resolve(&raw)?;
        Ok(Self {
            entries,
            namespaces,
        })
    }

    /// Build a catalog from unresolved `(path, value)` pairs.
    ///
    /// Namespaces are derived from the paths.
    pub fn from_raw(raw: BTreeMap<KeyPath, String>) -> miette::Result<Self> {
        let mut namespaces = BTreeSet::new();
        for path in raw.keys() {
            let mut ns = path.namespace();
            while let Some(n) = ns {
                ns = n.namespace();
                namespaces.insert(n);
            }
        }
        let entries = resolve(&raw)?;
        Ok(Self {
            entries,
            namespaces,
        })
    }

    /// Look up the resolved value at `path`.
    ///
    /// Fails with [`TerraError::UnresolvedKey`] if the path does not name a
    /// value (a missing segment, or a path that names a namespace).
    pub fn get(&self, path: &KeyPath) -> miette::Result<&str> {
        self.entries.get(path).map(String::as_str).ok_or_else(|| {
            TerraError::UnresolvedKey {
                path: path.to_string(),
                referenced_by: "catalog lookup".to_string(),
            }
            .into()
        })
    }

    /// Parse `path` and look it up.
    pub fn get_str(&self, path: &str) -> miette::Result<&str> {
        let key = KeyPath::parse(path).map_err(|_| TerraError::UnresolvedKey {
            path: path.to_string(),
            referenced_by: "catalog lookup".to_string(),
        })?;
        self.get(&key)
    }

    /// Whether `path` names a value.
    pub fn contains(&self, path: &KeyPath) -> bool {
        self.entries.contains_key(path)
    }

    /// Whether `path` names a namespace.
    pub fn has_namespace(&self, path: &KeyPath) -> bool {
        self.namespaces.contains(path)
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All namespaces, sorted.
    pub fn namespaces(&self) -> impl Iterator<Item = &KeyPath> {
        self.namespaces.iter()
    }

    /// All values, sorted by path.
    pub fn entries(&self) -> impl Iterator<Item = (&KeyPath, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Values inside `namespace`, including nested namespaces.
    pub fn entries_in<'a>(
        &'a self,
        namespace: &KeyPath,
    ) -> impl Iterator<Item = (&'a KeyPath, &'a str)> + 'a {
        let namespace = namespace.clone();
        self.entries()
            .filter(move |(k, _)| k.len() > namespace.len() && k.starts_with(&namespace))
    }

    /// Substitute catalog references in `template`.
    ///
    /// Relative references resolve inside `namespace`. `referenced_by`
    /// describes the consumer for error messages.
    pub fn render(
        &self,
        template: &Template,
        namespace: Option<&KeyPath>,
        referenced_by: &str,
    ) -> miette::Result<String> {
        template.render(|r| {
            let target = r.resolve_in(namespace);
            self.entries.get(&target).cloned().ok_or_else(|| {
                TerraError::UnresolvedKey {
                    path: target.to_string(),
                    referenced_by: referenced_by.to_string(),
                }
                .into()
            })
        })
    }

    /// Parse `input` as a template and render it.
    pub fn interpolate(
        &self,
        input: &str,
        namespace: Option<&KeyPath>,
        referenced_by: &str,
    ) -> miette::Result<String> {
        let template = Template::parse(input).map_err(|e| TerraError::Manifest {
            message: format!("{referenced_by}: {e}"),
        })?;
        self.render(&template, namespace, referenced_by)
    }
}

fn flatten(
    table: &toml::Table,
    prefix: Option<&KeyPath>,
    raw: &mut BTreeMap<KeyPath, String>,
    namespaces: &mut BTreeSet<KeyPath>,
) -> miette::Result<()> {
    for (key, value) in table {
        if !is_valid_segment(key) {
            return Err(TerraError::Manifest {
                message: format!("Invalid version catalog key `{key}`"),
            }
            .into());
        }
        let path = match prefix {
            Some(p) => p.child(key),
            None => KeyPath::single(key),
        };
        match value {
            toml::Value::String(s) => {
                raw.insert(path, s.clone());
            }
            toml::Value::Table(inner) => {
                namespaces.insert(path.clone());
                flatten(inner, Some(&path), raw, namespaces)?;
            }
            other => {
                return Err(TerraError::Manifest {
                    message: format!(
                        "Version catalog value `{path}` must be a string, found {}",
                        other.type_str()
                    ),
                }
                .into());
            }
        }
    }
    Ok(())
}

/// Resolve every value's references.
///
/// Builds a graph with an edge from each key to each key it references,
/// rejects missing targets, cycles and over-long chains, then substitutes
/// in dependency order.
fn resolve(raw: &BTreeMap<KeyPath, String>) -> miette::Result<BTreeMap<KeyPath, String>> {
    let mut graph: DiGraph<KeyPath, ()> = DiGraph::new();
    let mut index: HashMap<KeyPath, NodeIndex> = HashMap::new();
    for path in raw.keys() {
        index.insert(path.clone(), graph.add_node(path.clone()));
    }

    let mut templates: HashMap<NodeIndex, Template> = HashMap::new();
    for (path, value) in raw {
        let template = Template::parse(value).map_err(|e| TerraError::Manifest {
            message: format!("Version catalog value `{path}`: {e}"),
        })?;
        let from = index[path];
        let namespace = path.namespace();
        for reference in template.references() {
            let target = reference.resolve_in(namespace.as_ref());
            if &target == path {
                return Err(TerraError::CyclicReference {
                    chain: format!("{path} -> {path}"),
                }
                .into());
            }
            let Some(&to) = index.get(&target) else {
                return Err(TerraError::UnresolvedKey {
                    path: target.to_string(),
                    referenced_by: format!("catalog value `{path}`"),
                }
                .into());
            };
            graph.update_edge(from, to, ());
        }
        templates.insert(from, template);
    }

    let order = toposort(&graph, None).map_err(|cycle| TerraError::CyclicReference {
        chain: describe_cycle(&graph, cycle.node_id()),
    })?;

    // Referenced values come after their referrers in `order`.
    let mut depth: HashMap<NodeIndex, usize> = HashMap::new();
    let mut resolved: HashMap<NodeIndex, String> = HashMap::new();
    for &node in order.iter().rev() {
        let node_depth = graph
            .neighbors(node)
            .map(|n| depth[&n] + 1)
            .max()
            .unwrap_or(0);
        if node_depth > MAX_REFERENCE_DEPTH {
            return Err(TerraError::CyclicReference {
                chain: format!(
                    "{} (exceeds the maximum reference depth of {MAX_REFERENCE_DEPTH})",
                    describe_chain(&graph, &depth, node)
                ),
            }
            .into());
        }
        depth.insert(node, node_depth);

        let path = &graph[node];
        let namespace = path.namespace();
        let value = templates[&node].render(|r| {
            let target = r.resolve_in(namespace.as_ref());
            Ok(resolved[&index[&target]].clone())
        })?;
        resolved.insert(node, value);
    }

    Ok(resolved
        .into_iter()
        .map(|(node, value)| (graph[node].clone(), value))
        .collect())
}

/// Render one cycle through the strongly connected component that contains
/// `start` as `A -> B -> A`.
fn describe_cycle(graph: &DiGraph<KeyPath, ()>, start: NodeIndex) -> String {
    let sccs = tarjan_scc(graph);
    let Some(component) = sccs
        .iter()
        .find(|c| c.len() > 1 && c.contains(&start))
        .or_else(|| sccs.iter().find(|c| c.len() > 1))
    else {
        return graph[start].to_string();
    };

    let mut walk: Vec<NodeIndex> = vec![component[0]];
    let mut current = component[0];
    loop {
        let Some(next) = graph.neighbors(current).find(|n| component.contains(n)) else {
            break;
        };
        if let Some(pos) = walk.iter().position(|&n| n == next) {
            let mut cycle: Vec<String> = walk[pos..].iter().map(|&n| graph[n].to_string()).collect();
            cycle.push(graph[next].to_string());
            return cycle.join(" -> ");
        }
        walk.push(next);
        current = next;
    }
    walk.iter()
        .map(|&n| graph[n].to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Render the longest reference chain starting at `start`.
fn describe_chain(
    graph: &DiGraph<KeyPath, ()>,
    depth: &HashMap<NodeIndex, usize>,
    start: NodeIndex,
) -> String {
    let mut chain = vec![graph[start].to_string()];
    let mut current = start;
    while let Some(next) = graph
        .neighbors(current)
        .max_by_key(|n| depth.get(n).copied().unwrap_or(0))
    {
        chain.push(graph[next].to_string());
        current = next;
    }
    chain.join(" -> ")
}
