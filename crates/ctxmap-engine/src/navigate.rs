//! Exact-name symbol lookup over ranked tags.

use std::collections::{BTreeMap, BTreeSet};

use ctxmap_core::NavigationConfig;
use serde::Serialize;

use crate::graph::FileRecord;
use crate::rank::RankedTag;
use crate::render::{render_file, RenderOptions};

const RULE_WIDTH: usize = 40;

/// Where a symbol occurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolLocation {
    pub file: String,
    /// 1-based line number.
    pub line: usize,
    /// The trimmed source line, or empty when snippets are disabled.
    pub snippet: String,
}

/// Definitions and references of one symbol, in rank order.
///
/// # Examples
///
/// ```
/// use ctxmap_engine::navigate::SymbolNavigation;
///
/// let nav = SymbolNavigation::not_found("Ghost", None);
/// assert!(!nav.found());
/// assert_eq!(nav.render(true), "Symbol 'Ghost' not found.");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolNavigation {
    pub symbol: String,
    /// Subkind of the first definition in file-then-line order, or `unknown`.
    pub kind: String,
    pub definitions: Vec<SymbolLocation>,
    pub references: Vec<SymbolLocation>,
    pub source_file: Option<String>,
    #[serde(skip)]
    files: BTreeMap<String, FileRecord>,
    #[serde(skip)]
    pads: (usize, usize),
}

impl SymbolNavigation {
    /// An empty result for a symbol with no matches.
    pub fn not_found(symbol: &str, source_file: Option<String>) -> Self {
        let nav = NavigationConfig::default();
        Self {
            symbol: symbol.to_string(),
            kind: "unknown".to_string(),
            definitions: Vec::new(),
            references: Vec::new(),
            source_file,
            files: BTreeMap::new(),
            pads: (nav.definition_pad, nav.reference_pad),
        }
    }

    /// True when at least one definition or reference matched.
    pub fn found(&self) -> bool {
        !self.definitions.is_empty() || !self.references.is_empty()
    }

    /// Render the matches with surrounding source context.
    ///
    /// Definitions are shown with their enclosing scopes; references, when
    /// requested, with a smaller window and no scope headers.
    pub fn render(&self, include_references: bool) -> String {
        if !self.found() {
            return format!("Symbol '{}' not found.", self.symbol);
        }

        let mut parts = vec![
            "Summary".to_string(),
            "=".repeat(RULE_WIDTH),
            String::new(),
            format!("Symbol      : {} ({})", self.symbol, self.kind),
        ];
        if let Some(source) = &self.source_file {
            parts.push(format!("Source file : {source}"));
        }
        parts.push(format!("Definitions : {}", self.definitions.len()));
        if include_references {
            parts.push(format!("References  : {}", self.references.len()));
        }
        parts.push(String::new());

        let (def_pad, ref_pad) = self.pads;
        push_section(
            &mut parts,
            "Definitions",
            group_by_file(&self.definitions),
            &self.files,
            &RenderOptions::definitions(def_pad),
        );
        if include_references && !self.references.is_empty() {
            parts.push(String::new());
            push_section(
                &mut parts,
                "References",
                group_by_file(&self.references),
                &self.files,
                &RenderOptions::references(ref_pad),
            );
        }

        parts.join("\n")
    }
}

/// Navigation results for several symbols from a single pass over the tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiSymbolNavigation {
    /// One entry per requested symbol, in request order.
    pub symbols: Vec<SymbolNavigation>,
    pub source_file: Option<String>,
    #[serde(skip)]
    files: BTreeMap<String, FileRecord>,
    #[serde(skip)]
    pads: (usize, usize),
}

impl MultiSymbolNavigation {
    pub fn found_symbols(&self) -> Vec<&str> {
        self.symbols
            .iter()
            .filter(|n| n.found())
            .map(|n| n.symbol.as_str())
            .collect()
    }

    pub fn not_found_symbols(&self) -> Vec<&str> {
        self.symbols
            .iter()
            .filter(|n| !n.found())
            .map(|n| n.symbol.as_str())
            .collect()
    }

    pub fn get(&self, symbol: &str) -> Option<&SymbolNavigation> {
        self.symbols.iter().find(|n| n.symbol == symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Render every found symbol at once, showing each file a single time.
    pub fn render(&self, include_references: bool) -> String {
        let found: Vec<&SymbolNavigation> = self.symbols.iter().filter(|n| n.found()).collect();
        if found.is_empty() {
            let names: Vec<&str> = self.symbols.iter().map(|n| n.symbol.as_str()).collect();
            return format!("No symbols found: {}", names.join(", "));
        }

        let total = self.symbols.len();
        let missing = self.not_found_symbols();
        let mut parts = vec!["Summary".to_string(), "=".repeat(RULE_WIDTH), String::new()];
        if let Some(source) = &self.source_file {
            parts.push(format!("Source file : {source}"));
        }
        parts.push(format!("Symbols found ({}/{total}):", found.len()));
        parts.extend(found.iter().map(|n| format!("  • {} ({})", n.symbol, n.kind)));
        if !missing.is_empty() {
            parts.push(format!("Symbols not found ({}/{total}):", missing.len()));
            parts.extend(missing.iter().map(|s| format!("  • {s}")));
        }
        parts.push(String::new());

        let (def_pad, ref_pad) = self.pads;
        let definitions: Vec<&SymbolLocation> =
            found.iter().copied().flat_map(|n| &n.definitions).collect();
        push_section(
            &mut parts,
            "Definitions",
            group_sorted(&definitions),
            &self.files,
            &RenderOptions::definitions(def_pad),
        );

        if include_references {
            let references: Vec<&SymbolLocation> =
                found.iter().copied().flat_map(|n| &n.references).collect();
            if !references.is_empty() {
                parts.push(String::new());
                push_section(
                    &mut parts,
                    "References",
                    group_sorted(&references),
                    &self.files,
                    &RenderOptions::references(ref_pad),
                );
            }
        }

        parts.join("\n")
    }
}

/// Group locations by file, keeping first-appearance order.
fn group_by_file(locations: &[SymbolLocation]) -> Vec<(String, Vec<usize>)> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    for loc in locations {
        match groups.iter_mut().find(|(f, _)| *f == loc.file) {
            Some((_, lines)) => lines.push(loc.line),
            None => groups.push((loc.file.clone(), vec![loc.line])),
        }
    }
    groups
}

/// Group locations by file in path order with unique lines.
fn group_sorted(locations: &[&SymbolLocation]) -> Vec<(String, Vec<usize>)> {
    let mut groups: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
    for loc in locations {
        groups.entry(loc.file.clone()).or_default().insert(loc.line);
    }
    groups
        .into_iter()
        .map(|(f, lines)| (f, lines.into_iter().collect()))
        .collect()
}

fn push_section(
    parts: &mut Vec<String>,
    title: &str,
    groups: Vec<(String, Vec<usize>)>,
    files: &BTreeMap<String, FileRecord>,
    opts: &RenderOptions,
) {
    let total: usize = groups.iter().map(|(_, lines)| lines.len()).sum();
    let noun = if groups.len() == 1 { "file" } else { "files" };
    parts.push(format!("{title} ({total} total, {} {noun})", groups.len()));
    parts.push("-".repeat(RULE_WIDTH));

    for (file, lines) in groups {
        let Some(record) = files.get(&file) else {
            continue;
        };
        let rendered = render_file(&record.content, &record.scopes, &lines, opts);
        if !rendered.is_empty() {
            parts.push(format!("{file}:"));
            parts.push(rendered.trim_end_matches('\n').to_string());
        }
    }
}

/// Build navigation results for `symbols` from tags ranked with both kinds.
///
/// Locations keep rank order. `records` supplies snippets and the content
/// kept for rendering.
pub fn navigate(
    symbols: &[String],
    ranked: &[RankedTag],
    records: &[FileRecord],
    source_file: Option<String>,
    config: &NavigationConfig,
) -> MultiSymbolNavigation {
    let by_file: BTreeMap<&str, &FileRecord> =
        records.iter().map(|r| (r.rel_fname.as_str(), r)).collect();
    let pads = (config.definition_pad, config.reference_pad);

    let location = |r: &RankedTag| {
        let tag = &r.tag;
        let snippet = if config.snippets {
            by_file
                .get(tag.rel_fname.as_str())
                .and_then(|r| r.content.lines().nth(tag.line.saturating_sub(1)))
                .map(|l| l.trim().to_string())
                .unwrap_or_default()
        } else {
            String::new()
        };
        SymbolLocation {
            file: tag.rel_fname.clone(),
            line: tag.line,
            snippet,
        }
    };

    let mut all_files: BTreeMap<String, FileRecord> = BTreeMap::new();
    let mut navs = Vec::with_capacity(symbols.len());

    for symbol in symbols {
        let matching: Vec<&RankedTag> = ranked.iter().filter(|r| r.tag.name == *symbol).collect();

        let kind = matching
            .iter()
            .filter(|r| r.tag.is_definition())
            .min_by(|a, b| {
                (&a.tag.rel_fname, a.tag.line).cmp(&(&b.tag.rel_fname, b.tag.line))
            })
            .map(|r| r.tag.subkind.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let (defs, refs): (Vec<&RankedTag>, Vec<&RankedTag>) =
            matching.iter().copied().partition(|r| r.tag.is_definition());

        let mut files = BTreeMap::new();
        for r in &matching {
            if let Some(record) = by_file.get(r.tag.rel_fname.as_str()) {
                files
                    .entry(record.rel_fname.clone())
                    .or_insert_with(|| without_tags(record));
            }
        }
        for (name, record) in &files {
            all_files
                .entry(name.clone())
                .or_insert_with(|| record.clone());
        }

        navs.push(SymbolNavigation {
            symbol: symbol.clone(),
            kind,
            definitions: defs.into_iter().map(&location).collect(),
            references: refs.into_iter().map(&location).collect(),
            source_file: source_file.clone(),
            files,
            pads,
        });
    }

    MultiSymbolNavigation {
        symbols: navs,
        source_file,
        files: all_files,
        pads,
    }
}

/// Copy of a record holding only what rendering needs.
fn without_tags(record: &FileRecord) -> FileRecord {
    FileRecord {
        tags: Vec::new(),
        ..record.clone()
    }
}
