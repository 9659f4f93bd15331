use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use petgraph::graph::{DiGraph, NodeIndex};

use crate::tags::{Scope, Tag, TagKind};

/// A loaded file and everything extracted from it during one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path relative to the engine root, `/`-separated.
    pub rel_fname: String,
    /// Absolute path.
    pub fname: PathBuf,
    pub content: String,
    /// Name of the language provider that parsed the file.
    pub language: String,
    /// Tags in source order.
    pub tags: Vec<Tag>,
    pub scopes: Vec<Scope>,
}

/// Edge payload: how strongly one file depends on another.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceEdge {
    /// Sum of reference occurrences across all shared names.
    pub weight: f64,
    /// Shared symbol names, ascending.
    pub symbols: BTreeSet<String>,
}

/// Directed file graph linked by shared symbol names.
///
/// An edge `A -> B` exists when `A` references a name that `B` defines and
/// `A != B`. Matching is by name alone: two unrelated definitions of the
/// same name both receive inbound edges.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use ctxmap_engine::graph::{FileRecord, ReferenceGraph};
/// use ctxmap_engine::tags::{Tag, TagKind};
///
/// fn tag(file: &str, name: &str, kind: TagKind) -> Tag {
///     Tag {
///         rel_fname: file.into(),
///         fname: PathBuf::from(file),
///         line: 1,
///         name: name.into(),
///         kind,
///         subkind: "unknown".into(),
///     }
/// }
///
/// fn record(file: &str, tags: Vec<Tag>) -> FileRecord {
///     FileRecord {
///         rel_fname: file.into(),
///         fname: PathBuf::from(file),
///         content: String::new(),
///         language: "python".into(),
///         tags,
///         scopes: vec![],
///     }
/// }
///
/// let graph = ReferenceGraph::build(&[
///     record("a.py", vec![tag("a.py", "X", TagKind::Reference)]),
///     record("b.py", vec![tag("b.py", "X", TagKind::Definition)]),
/// ]);
/// assert_eq!(graph.edge("a.py", "b.py").unwrap().weight, 1.0);
/// assert!(graph.edge("b.py", "a.py").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    graph: DiGraph<String, ReferenceEdge>,
    index: HashMap<String, NodeIndex>,
    defines: BTreeMap<String, BTreeSet<String>>,
    references: BTreeMap<String, BTreeMap<String, usize>>,
}

impl ReferenceGraph {
    /// Build the defines/references indexes and the file graph.
    ///
    /// Nodes are files owning at least one tag, inserted in ascending path
    /// order so node indices are deterministic.
    pub fn build(records: &[FileRecord]) -> Self {
        let mut defines: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut references: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
        let mut files: BTreeSet<&str> = BTreeSet::new();

        for record in records {
            for tag in &record.tags {
                files.insert(record.rel_fname.as_str());
                match tag.kind {
                    TagKind::Definition => {
                        defines
                            .entry(tag.name.clone())
                            .or_default()
                            .insert(record.rel_fname.clone());
                    }
                    TagKind::Reference => {
                        *references
                            .entry(tag.name.clone())
                            .or_default()
                            .entry(record.rel_fname.clone())
                            .or_default() += 1;
                    }
                }
            }
        }

        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        for file in files {
            let idx = graph.add_node(file.to_string());
            index.insert(file.to_string(), idx);
        }

        for (name, referrers) in &references {
            let Some(definers) = defines.get(name) else {
                continue;
            };
            for (ref_file, &count) in referrers {
                for def_file in definers {
                    if ref_file == def_file {
                        continue;
                    }
                    let (from, to) = (index[ref_file.as_str()], index[def_file.as_str()]);
                    let edge = match graph.find_edge(from, to) {
                        Some(e) => e,
                        None => graph.add_edge(from, to, ReferenceEdge::default()),
                    };
                    let payload = &mut graph[edge];
                    payload.weight += count as f64;
                    payload.symbols.insert(name.clone());
                }
            }
        }

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built reference graph"
        );

        Self {
            graph,
            index,
            defines,
            references,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Node files in ascending order.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(String::as_str)
    }

    pub fn contains(&self, file: &str) -> bool {
        self.index.contains_key(file)
    }

    /// The edge `from -> to`, if any.
    pub fn edge(&self, from: &str, to: &str) -> Option<&ReferenceEdge> {
        let (from, to) = (*self.index.get(from)?, *self.index.get(to)?);
        self.graph
            .find_edge(from, to)
            .and_then(|e| self.graph.edge_weight(e))
    }

    /// Name to the files defining it.
    pub fn defines(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.defines
    }

    /// Name to the files referencing it, with occurrence counts.
    pub fn references(&self) -> &BTreeMap<String, BTreeMap<String, usize>> {
        &self.references
    }

    pub(crate) fn inner(&self) -> &DiGraph<String, ReferenceEdge> {
        &self.graph
    }
}
