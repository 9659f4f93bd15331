use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write;

use crate::graph::FileRecord;
use crate::rank::RankedTag;
use crate::tags::Scope;

/// Marker for a shown line.
const SHOWN: char = '│';
/// Marker for a line of interest when `mark_lois` is set.
const MARKED: char = '█';
/// Replaces each run of hidden lines.
const OMITTED: &str = "⋮";

/// Controls which lines around each line of interest are shown.
///
/// # Examples
///
/// ```
/// use ctxmap_engine::render::RenderOptions;
///
/// let map = RenderOptions::default();
/// assert_eq!(map.loi_pad, 0);
/// assert!(map.parent_context);
/// assert!(!map.mark_lois);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Lines shown above and below each line of interest.
    pub loi_pad: usize,
    /// Show the header line of every scope enclosing a line of interest.
    pub parent_context: bool,
    /// Prefix lines of interest with `█` instead of `│`.
    pub mark_lois: bool,
    /// Prefix every shown line with its 1-based number.
    pub line_numbers: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            loi_pad: 0,
            parent_context: true,
            mark_lois: false,
            line_numbers: false,
        }
    }
}

impl RenderOptions {
    /// Options for rendering symbol definitions with surrounding context.
    pub fn definitions(pad: usize) -> Self {
        Self {
            loi_pad: pad,
            ..Self::default()
        }
    }

    /// Options for rendering symbol references.
    pub fn references(pad: usize) -> Self {
        Self {
            loi_pad: pad,
            parent_context: false,
            ..Self::default()
        }
    }
}

/// Render `content` showing only the lines of interest and their context.
///
/// `lois` are 1-based line numbers; out-of-range entries are ignored. Hidden
/// single lines between two shown lines are revealed, and every remaining
/// run of hidden lines collapses into one `⋮` line.
///
/// # Examples
///
/// ```
/// use ctxmap_engine::render::{render_file, RenderOptions};
/// use ctxmap_engine::tags::Scope;
///
/// let code = "class A:\n    x = 1\n    y = 2\n    z = 3\n    def f(self):\n        pass\n";
/// let scopes = [Scope { start_line: 0, end_line: 5 }, Scope { start_line: 4, end_line: 5 }];
/// let out = render_file(code, &scopes, &[5], &RenderOptions::default());
/// assert_eq!(out, "│class A:\n⋮\n│    def f(self):\n⋮\n");
/// ```
pub fn render_file(content: &str, scopes: &[Scope], lois: &[usize], opts: &RenderOptions) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let n = lines.len();

    let lois: BTreeSet<usize> = lois
        .iter()
        .filter(|&&l| l >= 1 && l <= n)
        .map(|l| l - 1)
        .collect();
    if lois.is_empty() {
        return String::new();
    }

    let mut show: BTreeSet<usize> = BTreeSet::new();
    for &i in &lois {
        let lo = i.saturating_sub(opts.loi_pad);
        let hi = (i + opts.loi_pad).min(n - 1);
        show.extend(lo..=hi);

        if opts.parent_context {
            show.extend(
                scopes
                    .iter()
                    .filter(|s| s.start_line < i && i <= s.end_line && s.start_line < n)
                    .map(|s| s.start_line),
            );
        }
    }

    let gaps: Vec<usize> = show
        .iter()
        .zip(show.iter().skip(1))
        .filter(|(a, b)| **b - **a == 2)
        .map(|(a, _)| a + 1)
        .collect();
    show.extend(gaps);

    let mut out = String::new();
    let mut in_gap = false;
    for (i, line) in lines.iter().enumerate() {
        if !show.contains(&i) {
            if !in_gap {
                out.push_str(OMITTED);
                out.push('\n');
                in_gap = true;
            }
            continue;
        }
        in_gap = false;

        if opts.line_numbers {
            let _ = write!(out, "{:>4}", i + 1);
        }
        let marker = if opts.mark_lois && lois.contains(&i) {
            MARKED
        } else {
            SHOWN
        };
        out.push(marker);
        out.push_str(line);
        out.push('\n');
    }

    out
}

/// Render selected tags grouped by file.
///
/// Files are ordered by their highest tag score, ties broken by first
/// appearance in `selected`. Each section is the file path, its rank value,
/// a blank line, and the rendered lines; sections are separated by a blank
/// line. Files missing from `files` are skipped.
pub fn render_map(
    selected: &[RankedTag],
    files: &BTreeMap<String, FileRecord>,
    opts: &RenderOptions,
) -> String {
    struct Group<'a> {
        file: &'a str,
        max_score: f64,
        lines: Vec<usize>,
    }

    let mut groups: Vec<Group<'_>> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();
    for ranked in selected {
        let file = ranked.tag.rel_fname.as_str();
        let idx = *position.entry(file).or_insert_with(|| {
            groups.push(Group {
                file,
                max_score: ranked.score,
                lines: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[idx];
        group.max_score = group.max_score.max(ranked.score);
        group.lines.push(ranked.tag.line);
    }

    // Stable sort keeps first-appearance order among equal scores.
    groups.sort_by(|a, b| b.max_score.total_cmp(&a.max_score));

    let sections: Vec<String> = groups
        .iter()
        .filter_map(|group| {
            let record = files.get(group.file)?;
            let rendered = render_file(&record.content, &record.scopes, &group.lines, opts);
            if rendered.is_empty() {
                return None;
            }
            Some(format!(
                "{}:\n(Rank value: {:.4})\n\n{}",
                group.file, group.max_score, rendered
            ))
        })
        .collect();

    sections.join("\n\n")
}
