use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Parser, QueryCursor};

use crate::language::{CaptureRole, LanguageRegistry};
use crate::walker::ExclusionReason;

/// Whether a tag introduces a symbol or uses one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Definition,
    Reference,
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKind::Definition => write!(f, "def"),
            TagKind::Reference => write!(f, "ref"),
        }
    }
}

/// A single definition or reference of a named symbol.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use ctxmap_engine::tags::{Tag, TagKind};
///
/// let tag = Tag {
///     rel_fname: "models.py".into(),
///     fname: PathBuf::from("/repo/models.py"),
///     line: 1,
///     name: "User".into(),
///     kind: TagKind::Definition,
///     subkind: "class".into(),
/// };
/// assert!(tag.is_definition());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Path relative to the engine root, `/`-separated.
    pub rel_fname: String,
    /// Absolute path on disk.
    pub fname: PathBuf,
    /// 1-based line number.
    pub line: usize,
    pub name: String,
    pub kind: TagKind,
    /// Finer classification such as `class`, `function`, or `call`.
    pub subkind: String,
}

impl Tag {
    pub fn is_definition(&self) -> bool {
        self.kind == TagKind::Definition
    }
}

/// Row span (0-based, inclusive) of a class, function, or other container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scope {
    pub start_line: usize,
    pub end_line: usize,
}

/// Everything extracted from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Name of the provider that parsed the file.
    pub language: String,
    /// Tags in source order.
    pub tags: Vec<Tag>,
    /// Sorted, de-duplicated container spans.
    pub scopes: Vec<Scope>,
}

/// Extract tags and scopes from `content` using the registered query for its extension.
///
/// Malformed source still yields the tags tree-sitter recovers.
///
/// # Errors
///
/// Returns [`ExclusionReason::UnsupportedLanguage`] when no provider handles
/// the file's extension, or [`ExclusionReason::ParseError`] when the parser
/// produces no tree.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use ctxmap_engine::language::LanguageRegistry;
/// use ctxmap_engine::tags::{extract, TagKind};
///
/// let registry = LanguageRegistry::with_defaults();
/// let code = "class User:\n    pass\n";
/// let out = extract(&registry, "models.py", Path::new("/repo/models.py"), code).unwrap();
/// assert_eq!(out.tags[0].name, "User");
/// assert_eq!(out.tags[0].kind, TagKind::Definition);
/// assert_eq!(out.tags[0].subkind, "class");
/// ```
pub fn extract(
    registry: &LanguageRegistry,
    rel_fname: &str,
    fname: &Path,
    content: &str,
) -> Result<Extraction, ExclusionReason> {
    let ext = Path::new(rel_fname)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let provider = registry
        .for_extension(ext)
        .ok_or(ExclusionReason::UnsupportedLanguage)?;

    let mut parser = Parser::new();
    parser
        .set_language(provider.language())
        .map_err(|_| ExclusionReason::ParseError)?;
    let tree = parser
        .parse(content, None)
        .ok_or(ExclusionReason::ParseError)?;

    let source = content.as_bytes();
    let mut positioned: Vec<(usize, Tag)> = Vec::new();
    let mut scopes: Vec<Scope> = Vec::new();

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(provider.query(), tree.root_node(), source);
    while let Some(m) = matches.next() {
        for cap in m.captures {
            match provider.role(cap.index) {
                Some(CaptureRole::Name { kind, subkind }) => {
                    let name = cap.node.utf8_text(source).unwrap_or("").trim();
                    if name.is_empty() {
                        continue;
                    }
                    positioned.push((
                        cap.node.start_byte(),
                        Tag {
                            rel_fname: rel_fname.to_string(),
                            fname: fname.to_path_buf(),
                            line: cap.node.start_position().row + 1,
                            name: name.to_string(),
                            kind: *kind,
                            subkind: subkind.clone(),
                        },
                    ));
                }
                Some(CaptureRole::Scope) => scopes.push(Scope {
                    start_line: cap.node.start_position().row,
                    end_line: cap.node.end_position().row,
                }),
                None => {}
            }
        }
    }

    positioned.sort_by_key(|(start, _)| *start);
    scopes.sort();
    scopes.dedup();

    let tags: Vec<Tag> = positioned.into_iter().map(|(_, tag)| tag).collect();
    tracing::debug!(
        file = rel_fname,
        language = provider.name(),
        tags = tags.len(),
        "extracted tags"
    );

    Ok(Extraction {
        language: provider.name().to_string(),
        tags,
        scopes,
    })
}
