use std::collections::{BTreeMap, BTreeSet};

use ctxmap_core::RankingConfig;
use petgraph::visit::EdgeRef;
use serde::Serialize;

use crate::graph::{FileRecord, ReferenceGraph};
use crate::tags::{Tag, TagKind};

/// A tag with its final, boosted importance score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTag {
    pub tag: Tag,
    /// Non-negative score; higher is more important.
    pub score: f64,
}

/// Seed weights for personalized ranking, normalized to sum to 1.
///
/// Files in `chat_fnames` get `seed` and every other node gets 1. Chat files
/// that are not graph nodes are ignored.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use ctxmap_engine::graph::ReferenceGraph;
/// use ctxmap_engine::rank::personalization;
///
/// let graph = ReferenceGraph::build(&[]);
/// assert!(personalization(&graph, &BTreeSet::new(), 100.0).is_empty());
/// ```
pub fn personalization(
    graph: &ReferenceGraph,
    chat_fnames: &BTreeSet<String>,
    seed: f64,
) -> BTreeMap<String, f64> {
    let mut weights: BTreeMap<String, f64> = graph
        .files()
        .map(|f| {
            let w = if chat_fnames.contains(f) { seed } else { 1.0 };
            (f.to_string(), w)
        })
        .collect();

    let total: f64 = weights.values().sum();
    if total > 0.0 {
        for w in weights.values_mut() {
            *w /= total;
        }
    } else if !weights.is_empty() {
        let uniform = 1.0 / weights.len() as f64;
        for w in weights.values_mut() {
            *w = uniform;
        }
    }
    weights
}

/// Personalized PageRank over the weighted file graph.
///
/// Each step sends `damping * x[j] * w(j,k) / out(j)` along every edge
/// `j -> k`. Mass on nodes without out-edges, plus the `1 - damping`
/// teleport share, is redistributed by `personalization`. Iteration stops
/// once the L1 change drops below `n * tolerance` or after
/// `max_iterations` steps. A graph with no edges skips iteration entirely
/// and returns the personalization vector itself.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use ctxmap_core::RankingConfig;
/// use ctxmap_engine::graph::ReferenceGraph;
/// use ctxmap_engine::rank::{personalization, rank_files};
///
/// let graph = ReferenceGraph::build(&[]);
/// let p = personalization(&graph, &BTreeSet::new(), 100.0);
/// assert!(rank_files(&graph, &p, &RankingConfig::default()).is_empty());
/// ```
pub fn rank_files(
    graph: &ReferenceGraph,
    personalization: &BTreeMap<String, f64>,
    params: &RankingConfig,
) -> BTreeMap<String, f64> {
    let inner = graph.inner();
    let n = inner.node_count();
    if n == 0 {
        return BTreeMap::new();
    }

    let mut p: Vec<f64> = inner
        .node_indices()
        .map(|i| personalization.get(&inner[i]).copied().unwrap_or(0.0))
        .collect();
    let p_total: f64 = p.iter().sum();
    if p_total > 0.0 {
        p.iter_mut().for_each(|v| *v /= p_total);
    } else {
        p.iter_mut().for_each(|v| *v = 1.0 / n as f64);
    }

    if inner.edge_count() == 0 {
        return inner
            .node_indices()
            .map(|i| (inner[i].clone(), p[i.index()]))
            .collect();
    }

    let mut out_weight = vec![0.0_f64; n];
    for edge in inner.edge_references() {
        out_weight[edge.source().index()] += edge.weight().weight;
    }

    let d = params.damping;
    let mut x = vec![1.0 / n as f64; n];
    let mut iterations = 0;

    for _ in 0..params.max_iterations {
        iterations += 1;
        let mut next = vec![0.0_f64; n];

        for edge in inner.edge_references() {
            let j = edge.source().index();
            next[edge.target().index()] += d * x[j] * edge.weight().weight / out_weight[j];
        }

        let dangling: f64 = (0..n).filter(|&j| out_weight[j] == 0.0).map(|j| x[j]).sum();
        let spread = d * dangling + (1.0 - d);
        for (v, share) in next.iter_mut().zip(&p) {
            *v += spread * share;
        }

        let delta: f64 = next.iter().zip(&x).map(|(a, b)| (a - b).abs()).sum();
        x = next;
        if delta < n as f64 * params.tolerance {
            break;
        }
    }

    tracing::debug!(nodes = n, iterations, "ranked files");

    inner
        .node_indices()
        .map(|i| (inner[i].clone(), x[i.index()]))
        .collect()
}

/// Turn file scores into per-tag scores and sort them.
///
/// Each tag starts from its file's score. The multiplier is
/// `mention_boost` when the tag's name is in `mentioned_idents` and
/// `chat_file_boost` when its file is in `chat_fnames`; the two compose
/// before being applied. Output is sorted by score descending, then file,
/// then line.
///
/// # Examples
///
/// ```
/// use std::collections::{BTreeMap, BTreeSet};
/// use std::path::PathBuf;
/// use ctxmap_core::RankingConfig;
/// use ctxmap_engine::rank::apply_boosts;
/// use ctxmap_engine::tags::{Tag, TagKind};
///
/// let tag = Tag {
///     rel_fname: "a.py".into(),
///     fname: PathBuf::from("/r/a.py"),
///     line: 3,
///     name: "run".into(),
///     kind: TagKind::Definition,
///     subkind: "function".into(),
/// };
/// let scores = BTreeMap::from([("a.py".to_string(), 0.25)]);
/// let mentioned = BTreeSet::from(["run".to_string()]);
/// let chat = BTreeSet::from(["a.py".to_string()]);
///
/// let ranked = apply_boosts(&scores, [&tag], &mentioned, &chat, &RankingConfig::default());
/// assert_eq!(ranked[0].score, 0.25 * 200.0);
/// ```
pub fn apply_boosts<'a>(
    file_scores: &BTreeMap<String, f64>,
    tags: impl IntoIterator<Item = &'a Tag>,
    mentioned_idents: &BTreeSet<String>,
    chat_fnames: &BTreeSet<String>,
    params: &RankingConfig,
) -> Vec<RankedTag> {
    let mut ranked: Vec<RankedTag> = tags
        .into_iter()
        .map(|tag| {
            let base = file_scores.get(&tag.rel_fname).copied().unwrap_or(0.0);
            let mut boost = 1.0;
            if mentioned_idents.contains(&tag.name) {
                boost *= params.mention_boost;
            }
            if chat_fnames.contains(&tag.rel_fname) {
                boost *= params.chat_file_boost;
            }
            RankedTag {
                tag: tag.clone(),
                score: base * boost,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.tag.rel_fname.cmp(&b.tag.rel_fname))
            .then_with(|| a.tag.line.cmp(&b.tag.line))
    });
    ranked
}

/// Build the graph, rank files, and boost the tags whose kind is in `kinds`.
pub fn rank_tags(
    records: &[FileRecord],
    chat_fnames: &BTreeSet<String>,
    mentioned_idents: &BTreeSet<String>,
    kinds: &[TagKind],
    params: &RankingConfig,
) -> Vec<RankedTag> {
    let graph = ReferenceGraph::build(records);
    let seeds = personalization(&graph, chat_fnames, params.chat_seed_weight);
    let file_scores = rank_files(&graph, &seeds, params);

    let tags = records
        .iter()
        .flat_map(|r| &r.tags)
        .filter(|t| kinds.contains(&t.kind));
    apply_boosts(&file_scores, tags, mentioned_idents, chat_fnames, params)
}
