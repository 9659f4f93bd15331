use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};

use ctxmap_core::{MapError, MapSection};
use serde::Serialize;

use crate::language::LanguageRegistry;

/// Number of bytes to check for binary detection.
const BINARY_CHECK_SIZE: usize = 8192;

/// Path components excluded from every walk.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    // version control
    ".git",
    ".svn",
    ".hg",
    // dependencies
    "node_modules",
    "vendor",
    "bower_components",
    ".bundle",
    // python
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".tox",
    ".nox",
    ".eggs",
    "*.egg-info",
    ".venv",
    ".venv*",
    "venv",
    "venv*",
    "env",
    ".env",
    // build output
    "build",
    "dist",
    "target",
    "out",
    "_build",
    // editors
    ".idea",
    ".vscode",
    ".eclipse",
    ".settings",
    // caches and coverage
    ".cache",
    ".tmp",
    "tmp",
    ".temp",
    "coverage",
    ".coverage",
    "htmlcov",
    ".nyc_output",
    ".gradle",
    ".cargo",
];

/// Why a discovered file did not contribute tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExclusionReason {
    #[serde(rename = "unsupported language")]
    UnsupportedLanguage,
    #[serde(rename = "decode error")]
    DecodeError,
    #[serde(rename = "parse error")]
    ParseError,
    #[serde(rename = "file too large")]
    TooLarge,
    #[serde(rename = "read error")]
    Unreadable,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            ExclusionReason::UnsupportedLanguage => "unsupported language",
            ExclusionReason::DecodeError => "decode error",
            ExclusionReason::ParseError => "parse error",
            ExclusionReason::TooLarge => "file too large",
            ExclusionReason::Unreadable => "read error",
        };
        f.write_str(reason)
    }
}

/// Per-call diagnostics. Observational only.
///
/// # Examples
///
/// ```
/// use ctxmap_engine::walker::{ExclusionReason, FileReport};
///
/// let mut report = FileReport::default();
/// report.exclude("notes.txt", ExclusionReason::UnsupportedLanguage);
/// assert_eq!(report.excluded["notes.txt"].to_string(), "unsupported language");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    /// Relative path to exclusion reason.
    pub excluded: BTreeMap<String, ExclusionReason>,
    pub definition_matches: usize,
    pub reference_matches: usize,
    pub total_files_considered: usize,
}

impl FileReport {
    pub fn exclude(&mut self, rel_fname: &str, reason: ExclusionReason) {
        tracing::debug!(file = rel_fname, %reason, "excluded file");
        self.excluded.insert(rel_fname.to_string(), reason);
    }
}

/// A source file read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the engine root, `/`-separated.
    pub rel_fname: String,
    /// Absolute path.
    pub fname: PathBuf,
    /// Decoded content.
    pub content: String,
}

/// Exclusion patterns matched against every component of a relative path.
///
/// Plain entries match a component exactly; entries containing `*`, `?` or
/// `[` are glob patterns.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use ctxmap_engine::walker::ExcludeSet;
///
/// let set = ExcludeSet::new(["tests"]);
/// assert!(set.is_excluded(Path::new("node_modules/lib/index.js")));
/// assert!(set.is_excluded(Path::new("pkg/foo.egg-info/setup.py")));
/// assert!(set.is_excluded(Path::new("tests/test_a.py")));
/// assert!(!set.is_excluded(Path::new("src/app.py")));
/// ```
#[derive(Debug, Clone)]
pub struct ExcludeSet {
    names: BTreeSet<String>,
    patterns: Vec<glob::Pattern>,
}

impl ExcludeSet {
    /// Built-in defaults plus `extra`.
    ///
    /// Invalid glob patterns are logged and ignored.
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names = BTreeSet::new();
        let mut patterns = Vec::new();

        let all = DEFAULT_EXCLUDES
            .iter()
            .map(|s| s.to_string())
            .chain(extra.into_iter().map(|s| s.as_ref().to_string()));

        for entry in all {
            if entry.contains(['*', '?', '[']) {
                match glob::Pattern::new(&entry) {
                    Ok(p) => patterns.push(p),
                    Err(e) => tracing::warn!(pattern = %entry, error = %e, "ignoring invalid exclude pattern"),
                }
            } else {
                names.insert(entry);
            }
        }

        Self { names, patterns }
    }

    /// Whether any component of `rel` matches an exclusion.
    pub fn is_excluded(&self, rel: &Path) -> bool {
        rel.components().any(|c| match c {
            Component::Normal(part) => {
                let part = part.to_string_lossy();
                self.names.contains(part.as_ref())
                    || self.patterns.iter().any(|p| p.matches(&part))
            }
            _ => false,
        })
    }
}

/// Resolve input paths into a sorted, de-duplicated list of candidate files.
///
/// Relative inputs are resolved against `root`; an empty input list means
/// `root` itself. Directories are walked recursively. Hidden files are
/// included; `.gitignore` is honored only when `config.respect_gitignore`
/// is set.
///
/// # Errors
///
/// Returns [`MapError::PathNotFound`] if an input does not exist.
///
/// # Examples
///
/// ```no_run
/// use std::path::{Path, PathBuf};
/// use ctxmap_core::MapSection;
/// use ctxmap_engine::walker::{discover, ExcludeSet};
///
/// let excludes = ExcludeSet::new(Vec::<String>::new());
/// let files = discover(Path::new("."), &[PathBuf::from("src")], &excludes, &MapSection::default()).unwrap();
/// for f in &files {
///     println!("{}", f.display());
/// }
/// ```
pub fn discover(
    root: &Path,
    paths: &[PathBuf],
    excludes: &ExcludeSet,
    config: &MapSection,
) -> Result<Vec<PathBuf>, MapError> {
    let inputs: Vec<PathBuf> = if paths.is_empty() {
        vec![root.to_path_buf()]
    } else {
        paths
            .iter()
            .map(|p| if p.is_absolute() { p.clone() } else { root.join(p) })
            .collect()
    };

    let mut found = BTreeSet::new();

    for input in inputs {
        if input.is_file() {
            let rel = input
                .strip_prefix(root)
                .ok()
                .or_else(|| input.file_name().map(Path::new))
                .unwrap_or(input.as_path());
            if !excludes.is_excluded(rel) {
                found.insert(input);
            }
            continue;
        }
        if !input.is_dir() {
            return Err(MapError::PathNotFound(input));
        }

        let filter_root = root.to_path_buf();
        let filter_input = input.clone();
        let filter_excludes = excludes.clone();
        let walker = ignore::WalkBuilder::new(&input)
            .hidden(false)
            .parents(config.respect_gitignore)
            .ignore(false)
            .git_ignore(config.respect_gitignore)
            .git_global(false)
            .git_exclude(config.respect_gitignore)
            .filter_entry(move |entry| {
                let rel = exclusion_path(&filter_root, &filter_input, entry.path());
                !filter_excludes.is_excluded(rel)
            })
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if entry.file_type().is_some_and(|t| t.is_file()) {
                found.insert(entry.into_path());
            }
        }
    }

    tracing::debug!(files = found.len(), "discovered files");
    Ok(found.into_iter().collect())
}

/// Read one discovered file, applying size, binary and encoding checks.
///
/// Extensions with no registered provider are rejected before the file is read.
///
/// # Errors
///
/// Returns the [`ExclusionReason`] to record when the file is skipped.
pub fn load(
    root: &Path,
    path: &Path,
    registry: &LanguageRegistry,
    config: &MapSection,
) -> Result<SourceFile, ExclusionReason> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    if registry.for_extension(ext).is_none() {
        return Err(ExclusionReason::UnsupportedLanguage);
    }

    let metadata = std::fs::metadata(path).map_err(|_| ExclusionReason::Unreadable)?;
    if metadata.len() > config.max_file_size {
        return Err(ExclusionReason::TooLarge);
    }

    let bytes = std::fs::read(path).map_err(|_| ExclusionReason::Unreadable)?;
    let content = decode(bytes)?;

    Ok(SourceFile {
        rel_fname: rel_path(root, path),
        fname: path.to_path_buf(),
        content,
    })
}

/// Decode file bytes as UTF-8, falling back to Latin-1.
///
/// # Errors
///
/// Returns [`ExclusionReason::DecodeError`] for binary content (a NUL byte
/// within the first 8 KiB).
pub fn decode(bytes: Vec<u8>) -> Result<String, ExclusionReason> {
    let check_len = bytes.len().min(BINARY_CHECK_SIZE);
    if bytes[..check_len].contains(&0) {
        return Err(ExclusionReason::DecodeError);
    }

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => Ok(e.into_bytes().iter().map(|&b| b as char).collect()),
    }
}

/// The part of `path` that exclusions are matched against: relative to
/// `root` when inside it, otherwise relative to the walked `input`.
fn exclusion_path<'a>(root: &Path, input: &Path, path: &'a Path) -> &'a Path {
    path.strip_prefix(root)
        .or_else(|_| path.strip_prefix(input))
        .unwrap_or(path)
}

/// Path of `path` relative to `root` with `/` separators.
///
/// Files outside `root` keep their full path, so two such files never share
/// a key. `.` and `..` components are resolved lexically.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use ctxmap_engine::walker::rel_path;
///
/// assert_eq!(rel_path(Path::new("/repo"), Path::new("/repo/src/a.py")), "src/a.py");
/// assert_eq!(rel_path(Path::new("/repo"), Path::new("/repo/src/../b.py")), "b.py");
/// assert_eq!(rel_path(Path::new("/repo"), Path::new("/elsewhere/x/m.py")), "/elsewhere/x/m.py");
/// ```
pub fn rel_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);

    let mut prefix = String::new();
    let mut parts: Vec<String> = Vec::new();
    for component in rel.components() {
        match component {
            Component::Prefix(p) => prefix.push_str(&p.as_os_str().to_string_lossy()),
            Component::RootDir => prefix.push('/'),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().is_some_and(|last| last != "..") {
                    parts.pop();
                } else if prefix.is_empty() {
                    parts.push("..".to_string());
                }
            }
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
        }
    }

    prefix + &parts.join("/")
}
