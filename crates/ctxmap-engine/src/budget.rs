use crate::rank::RankedTag;
use crate::tokens::TokenCounter;

/// Outcome of fitting ranked tags to a token budget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Rendering of the top `tag_count` tags; empty when nothing fits.
    pub text: String,
    pub tag_count: usize,
    /// Token count of `text`.
    pub tokens: usize,
    /// Number of renders performed.
    pub probes: usize,
}

/// Find the longest prefix of `ranked` whose rendering fits in `max_tokens`.
///
/// Binary-searches the prefix length `k` in `1..=len`, keeping the largest
/// fitting probe seen. When even one tag does not fit, the selection is
/// empty. At most `ceil(log2(len + 1))` renders are performed.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use ctxmap_engine::budget::select;
/// use ctxmap_engine::rank::RankedTag;
/// use ctxmap_engine::tags::{Tag, TagKind};
/// use ctxmap_engine::tokens::CharEstimate;
///
/// let ranked: Vec<RankedTag> = (0..4)
///     .map(|i| RankedTag {
///         tag: Tag {
///             rel_fname: "a.py".into(),
///             fname: PathBuf::from("a.py"),
///             line: i + 1,
///             name: format!("f{i}"),
///             kind: TagKind::Definition,
///             subkind: "function".into(),
///         },
///         score: 1.0,
///     })
///     .collect();
/// let render = |tags: &[RankedTag]| "x".repeat(tags.len() * 8);
///
/// let selection = select(&ranked, render, &CharEstimate, 5);
/// assert_eq!(selection.tag_count, 2);
/// assert_eq!(selection.tokens, 4);
/// ```
pub fn select<F>(
    ranked: &[RankedTag],
    render: F,
    counter: &dyn TokenCounter,
    max_tokens: usize,
) -> Selection
where
    F: Fn(&[RankedTag]) -> String,
{
    let mut best = Selection::default();
    if max_tokens == 0 || ranked.is_empty() {
        return best;
    }

    let (mut left, mut right) = (1, ranked.len());
    let mut probes = 0;

    while left <= right {
        let mid = left + (right - left) / 2;
        let text = render(&ranked[..mid]);
        let tokens = counter.count_tokens(&text);
        probes += 1;

        tracing::debug!(probe = probes, tags = mid, tokens, max_tokens, "budget probe");

        if tokens <= max_tokens {
            if mid > best.tag_count {
                best = Selection {
                    text,
                    tag_count: mid,
                    tokens,
                    probes: 0,
                };
            }
            left = mid + 1;
        } else {
            right = mid - 1;
        }
    }

    best.probes = probes;
    best
}
