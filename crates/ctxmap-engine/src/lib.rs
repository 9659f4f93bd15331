//! Ranked repository maps and symbol navigation via tree-sitter and PageRank.
//!
//! [`RepoMapper`] walks a source tree, extracts definition and reference tags
//! with per-language tree-sitter queries, links files that share symbol names
//! into a reference graph, ranks them with personalized PageRank, and renders
//! the highest-ranked definitions into a token-budgeted map. The same
//! pipeline answers exact-name symbol lookups.

pub mod budget;
pub mod graph;
pub mod language;
pub mod navigate;
pub mod rank;
pub mod render;
pub mod tags;
pub mod tokens;
pub mod walker;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ctxmap_core::{MapConfig, MapError};

use crate::graph::FileRecord;
use crate::language::LanguageRegistry;
use crate::navigate::{MultiSymbolNavigation, SymbolNavigation};
use crate::render::RenderOptions;
use crate::tags::TagKind;
use crate::tokens::{CharEstimate, TokenCounter};
use crate::walker::{ExcludeSet, FileReport};

/// Map text when no discovered file has a supported language.
pub const NO_SUPPORTED_FILES: &str = "No supported files found.";
/// Map text when supported files exist but none define anything.
pub const NO_DEFINITIONS: &str = "No definitions found.";

/// Inputs for one [`RepoMapper::get_repo_map`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapRequest {
    /// Files or directories to scan; empty means the whole root.
    pub paths: Vec<PathBuf>,
    /// Files currently in focus, relative to the root.
    pub chat_fnames: BTreeSet<String>,
    /// Identifiers whose definitions should be boosted.
    pub mentioned_idents: BTreeSet<String>,
    /// Exclusion patterns added to the configured ones.
    pub excludes: Vec<String>,
    /// Token budget; falls back to `map.max_map_tokens`.
    pub max_tokens: Option<usize>,
}

/// Inputs for [`RepoMapper::find_symbol`] and [`RepoMapper::find_symbols`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindRequest {
    /// Files or directories to scan; empty means the whole root.
    pub paths: Vec<PathBuf>,
    /// File in focus, relative to the root; results near it rank first.
    pub source_file: Option<PathBuf>,
    /// Exclusion patterns added to the configured ones.
    pub excludes: Vec<String>,
}

/// Entry point for map generation and symbol lookup over one root.
///
/// Every call re-reads the tree; nothing is cached between calls.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use ctxmap_engine::{MapRequest, RepoMapper};
/// use ctxmap_engine::language::LanguageRegistry;
///
/// let registry = Arc::new(LanguageRegistry::with_defaults());
/// let mapper = RepoMapper::new(".", registry).unwrap();
/// let (map, report) = mapper.get_repo_map(&MapRequest::default()).unwrap();
/// println!("{map}");
/// eprintln!("{} files excluded", report.excluded.len());
/// ```
pub struct RepoMapper {
    root: PathBuf,
    registry: Arc<LanguageRegistry>,
    config: MapConfig,
    counter: Box<dyn TokenCounter + Send + Sync>,
    render_options: RenderOptions,
}

impl fmt::Debug for RepoMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoMapper")
            .field("root", &self.root)
            .field("languages", &self.registry.len())
            .field("config", &self.config)
            .field("render_options", &self.render_options)
            .finish_non_exhaustive()
    }
}

impl RepoMapper {
    /// Create a mapper rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::PathNotFound`] if `root` does not exist and
    /// [`MapError::NotADirectory`] if it is not a directory.
    pub fn new(root: impl AsRef<Path>, registry: Arc<LanguageRegistry>) -> Result<Self, MapError> {
        let root = std::path::absolute(root.as_ref())?;
        if !root.exists() {
            return Err(MapError::PathNotFound(root));
        }
        if !root.is_dir() {
            return Err(MapError::NotADirectory(root));
        }

        Ok(Self {
            root,
            registry,
            config: MapConfig::default(),
            counter: Box::new(CharEstimate),
            render_options: RenderOptions::default(),
        })
    }

    /// Replace the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Config`] if `config` fails [`MapConfig::validate`].
    pub fn with_config(mut self, config: MapConfig) -> Result<Self, MapError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Replace the default four-characters-per-token estimate.
    pub fn with_token_counter<C>(mut self, counter: C) -> Self
    where
        C: TokenCounter + Send + Sync + 'static,
    {
        self.counter = Box::new(counter);
        self
    }

    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render_options = options;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    /// Build a ranked map of the most important definitions.
    ///
    /// Returns the map text and a report of which files were skipped and why.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::PathNotFound`] if a requested path does not exist.
    pub fn get_repo_map(&self, request: &MapRequest) -> Result<(String, FileReport), MapError> {
        let mut report = FileReport::default();
        let records = self.collect(&request.paths, &request.excludes, &mut report)?;

        if records.is_empty() {
            tracing::info!(
                considered = report.total_files_considered,
                excluded = report.excluded.len(),
                "no supported files"
            );
            return Ok((NO_SUPPORTED_FILES.to_string(), report));
        }

        let chat = self.normalize_all(request.chat_fnames.iter().map(String::as_str));
        let ranked = rank::rank_tags(
            &records,
            &chat,
            &request.mentioned_idents,
            &[TagKind::Definition],
            &self.config.ranking,
        );
        if ranked.is_empty() {
            tracing::info!(files = records.len(), "no definitions");
            return Ok((NO_DEFINITIONS.to_string(), report));
        }

        let max_tokens = request.max_tokens.unwrap_or(self.config.map.max_map_tokens);
        let files: BTreeMap<String, FileRecord> = records
            .into_iter()
            .map(|r| (r.rel_fname.clone(), r))
            .collect();
        let selection = budget::select(
            &ranked,
            |tags| render::render_map(tags, &files, &self.render_options),
            self.counter.as_ref(),
            max_tokens,
        );

        tracing::info!(
            files = files.len(),
            definitions = ranked.len(),
            selected = selection.tag_count,
            tokens = selection.tokens,
            max_tokens,
            "repo map built"
        );

        Ok((selection.text, report))
    }

    /// Locate every definition and reference of `name`.
    ///
    /// `request.source_file` is treated as the file in focus, so results near
    /// it rank first.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::PathNotFound`] if a requested path does not exist.
    pub fn find_symbol(
        &self,
        name: &str,
        request: &FindRequest,
    ) -> Result<SymbolNavigation, MapError> {
        let result = self.find_symbols(&[name.to_string()], request)?;
        Ok(result.symbols.into_iter().next().unwrap_or_else(|| {
            let source = request.source_file.as_deref().map(|f| self.normalize(f));
            SymbolNavigation::not_found(name, source)
        }))
    }

    /// Locate several symbols with a single pass over the tree.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::PathNotFound`] if a requested path does not exist.
    pub fn find_symbols(
        &self,
        names: &[String],
        request: &FindRequest,
    ) -> Result<MultiSymbolNavigation, MapError> {
        let mut report = FileReport::default();
        let records = self.collect(&request.paths, &request.excludes, &mut report)?;

        let source = request.source_file.as_deref().map(|f| self.normalize(f));
        let chat: BTreeSet<String> = source.iter().cloned().collect();
        let mentioned: BTreeSet<String> = names.iter().cloned().collect();
        let ranked = rank::rank_tags(
            &records,
            &chat,
            &mentioned,
            &[TagKind::Definition, TagKind::Reference],
            &self.config.ranking,
        );

        let result = navigate::navigate(names, &ranked, &records, source, &self.config.navigation);
        tracing::info!(
            requested = names.len(),
            found = result.found_symbols().len(),
            files = records.len(),
            excluded = report.excluded.len(),
            "symbol lookup"
        );
        Ok(result)
    }

    /// Discover, read and tag every input file.
    fn collect(
        &self,
        paths: &[PathBuf],
        extra_excludes: &[String],
        report: &mut FileReport,
    ) -> Result<Vec<FileRecord>, MapError> {
        let excludes = ExcludeSet::new(
            self.config
                .map
                .excludes
                .iter()
                .chain(extra_excludes)
                .map(String::as_str),
        );
        let files = walker::discover(&self.root, paths, &excludes, &self.config.map)?;

        let mut records = Vec::with_capacity(files.len());
        for path in files {
            report.total_files_considered += 1;

            let source = match walker::load(&self.root, &path, &self.registry, &self.config.map) {
                Ok(source) => source,
                Err(reason) => {
                    report.exclude(&walker::rel_path(&self.root, &path), reason);
                    continue;
                }
            };

            let extraction =
                match tags::extract(&self.registry, &source.rel_fname, &source.fname, &source.content) {
                    Ok(extraction) => extraction,
                    Err(reason) => {
                        report.exclude(&source.rel_fname, reason);
                        continue;
                    }
                };

            for tag in &extraction.tags {
                match tag.kind {
                    TagKind::Definition => report.definition_matches += 1,
                    TagKind::Reference => report.reference_matches += 1,
                }
            }

            records.push(FileRecord {
                rel_fname: source.rel_fname,
                fname: source.fname,
                content: source.content,
                language: extraction.language,
                tags: extraction.tags,
                scopes: extraction.scopes,
            });
        }

        tracing::debug!(
            considered = report.total_files_considered,
            parsed = records.len(),
            excluded = report.excluded.len(),
            "collected files"
        );
        Ok(records)
    }

    fn normalize(&self, file: &Path) -> String {
        walker::rel_path(&self.root, &self.root.join(file))
    }

    fn normalize_all<'a>(&self, files: impl Iterator<Item = &'a str>) -> BTreeSet<String> {
        files.map(|f| self.normalize(Path::new(f))).collect()
    }
}
