use std::collections::{BTreeMap, HashMap};
use std::fmt;

use ctxmap_core::MapError;
use tree_sitter::{Parser, Query};

use crate::tags::TagKind;

/// Built-in language with a tree-sitter grammar and an embedded tag query.
///
/// # Examples
///
/// ```
/// use ctxmap_engine::language::Language;
///
/// assert_eq!(Language::from_extension("rs"), Some(Language::Rust));
/// assert_eq!(Language::from_extension("PY"), Some(Language::Python));
/// assert_eq!(Language::from_extension("tsx"), Some(Language::Tsx));
/// assert_eq!(Language::from_extension("hpp"), Some(Language::Cpp));
/// assert_eq!(Language::from_extension("txt"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Go,
    Java,
    C,
    Cpp,
    Ruby,
    Php,
}

impl Language {
    /// Every built-in language, in registration order.
    pub const ALL: [Language; 11] = [
        Language::Rust,
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Tsx,
        Language::Go,
        Language::Java,
        Language::C,
        Language::Cpp,
        Language::Ruby,
        Language::Php,
    ];

    /// Detect a language from a file extension (without the dot).
    ///
    /// Matching is case-insensitive. Returns `None` for anything without a
    /// built-in grammar.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
    }

    /// Registry name of this language.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Ruby => "ruby",
            Language::Php => "php",
        }
    }

    /// File extensions handled by this language.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Rust => &["rs"],
            Language::Python => &["py", "pyi"],
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::TypeScript => &["ts"],
            Language::Tsx => &["tsx"],
            Language::Go => &["go"],
            Language::Java => &["java"],
            Language::C => &["c", "h"],
            Language::Cpp => &["cpp", "cc", "cxx", "hpp", "hxx", "hh"],
            Language::Ruby => &["rb"],
            Language::Php => &["php"],
        }
    }

    /// The tree-sitter grammar for this language.
    pub fn tree_sitter_language(&self) -> tree_sitter::Language {
        match self {
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Language::Go => tree_sitter_go::LANGUAGE.into(),
            Language::Java => tree_sitter_java::LANGUAGE.into(),
            Language::C => tree_sitter_c::LANGUAGE.into(),
            Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            Language::Ruby => tree_sitter_ruby::LANGUAGE.into(),
            Language::Php => tree_sitter_php::LANGUAGE_PHP.into(),
        }
    }

    /// The embedded tag query source for this language.
    pub fn tag_query(&self) -> &'static str {
        match self {
            Language::Rust => include_str!("../queries/rust.scm"),
            Language::Python => include_str!("../queries/python.scm"),
            Language::JavaScript => include_str!("../queries/javascript.scm"),
            Language::TypeScript | Language::Tsx => include_str!("../queries/typescript.scm"),
            Language::Go => include_str!("../queries/go.scm"),
            Language::Java => include_str!("../queries/java.scm"),
            Language::C => include_str!("../queries/c.scm"),
            Language::Cpp => include_str!("../queries/cpp.scm"),
            Language::Ruby => include_str!("../queries/ruby.scm"),
            Language::Php => include_str!("../queries/php.scm"),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a query capture contributes, decided once when the query is registered.
///
/// Capture names follow the `name.<kind>.<subkind>` convention:
/// `name.definition.class`, `name.reference.call`, and so on. A capture named
/// `scope` marks a syntactic container used for parent-context rendering.
///
/// # Examples
///
/// ```
/// use ctxmap_engine::language::CaptureRole;
/// use ctxmap_engine::tags::TagKind;
///
/// assert_eq!(
///     CaptureRole::parse("name.definition.class"),
///     Some(CaptureRole::Name { kind: TagKind::Definition, subkind: "class".into() })
/// );
/// assert_eq!(
///     CaptureRole::parse("name.reference"),
///     Some(CaptureRole::Name { kind: TagKind::Reference, subkind: "unknown".into() })
/// );
/// assert_eq!(CaptureRole::parse("scope"), Some(CaptureRole::Scope));
/// assert_eq!(CaptureRole::parse("doc"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureRole {
    /// The captured node's text is a symbol name.
    Name { kind: TagKind, subkind: String },
    /// The captured node spans a class, function, or other container.
    Scope,
}

impl CaptureRole {
    /// Classify a capture name, returning `None` for captures the extractor ignores.
    pub fn parse(capture: &str) -> Option<Self> {
        if capture == "scope" {
            return Some(CaptureRole::Scope);
        }

        let mut parts = capture.split('.');
        if parts.next() != Some("name") {
            return None;
        }
        let kind = match parts.next()? {
            "definition" => TagKind::Definition,
            "reference" => TagKind::Reference,
            _ => return None,
        };
        let subkind = parts
            .last()
            .filter(|s| !s.is_empty())
            .unwrap_or("unknown")
            .to_string();

        Some(CaptureRole::Name { kind, subkind })
    }
}

/// A grammar plus its compiled tag query and classified captures.
pub struct LanguageProvider {
    name: String,
    extensions: Vec<String>,
    language: tree_sitter::Language,
    query: Query,
    roles: Vec<Option<CaptureRole>>,
}

impl LanguageProvider {
    /// Compile `query_source` against `language` and classify its captures.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Query`] if the query does not compile or declares
    /// no `name.definition.*` / `name.reference.*` capture.
    pub fn new(
        name: &str,
        extensions: &[&str],
        language: tree_sitter::Language,
        query_source: &str,
    ) -> Result<Self, MapError> {
        Parser::new()
            .set_language(&language)
            .map_err(|e| MapError::Language(format!("{name}: {e}")))?;

        let query = Query::new(&language, query_source).map_err(|e| MapError::Query {
            language: name.to_string(),
            message: e.to_string(),
        })?;

        let roles: Vec<Option<CaptureRole>> = query
            .capture_names()
            .iter()
            .map(|capture| CaptureRole::parse(capture))
            .collect();

        if !roles
            .iter()
            .any(|role| matches!(role, Some(CaptureRole::Name { .. })))
        {
            return Err(MapError::Query {
                language: name.to_string(),
                message: "query declares no name.definition or name.reference captures".into(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            extensions: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
            language,
            query,
            roles,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn language(&self) -> &tree_sitter::Language {
        &self.language
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Role of the capture at `index`, as assigned by the query.
    pub fn role(&self, index: u32) -> Option<&CaptureRole> {
        self.roles.get(index as usize).and_then(Option::as_ref)
    }
}

impl fmt::Debug for LanguageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageProvider")
            .field("name", &self.name)
            .field("extensions", &self.extensions)
            .field("captures", &self.roles.len())
            .finish()
    }
}

/// Compiled language providers keyed by name and by file extension.
///
/// Built once at startup and shared read-only (typically behind an `Arc`).
///
/// # Examples
///
/// ```
/// use ctxmap_engine::language::LanguageRegistry;
///
/// let registry = LanguageRegistry::with_defaults();
/// assert!(registry.for_extension("py").is_some());
/// assert!(registry.for_extension("md").is_none());
/// ```
#[derive(Debug, Default)]
pub struct LanguageRegistry {
    providers: BTreeMap<String, LanguageProvider>,
    by_extension: HashMap<String, String>,
}

impl LanguageRegistry {
    /// An empty registry with no languages.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in language whose query compiles.
    ///
    /// A built-in query that fails to compile is logged and left out, so its
    /// files are reported as unsupported rather than failing the whole engine.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for lang in Language::ALL {
            if let Err(e) = registry.register(
                lang.name(),
                lang.extensions(),
                lang.tree_sitter_language(),
                lang.tag_query(),
            ) {
                tracing::warn!(language = lang.name(), error = %e, "skipping built-in language");
            }
        }
        registry
    }

    /// Add a provider, replacing any existing provider with the same name.
    ///
    /// Extensions are claimed by the newest registration.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Query`] if the query is rejected; the registry is
    /// left unchanged in that case.
    pub fn register(
        &mut self,
        name: &str,
        extensions: &[&str],
        language: tree_sitter::Language,
        query_source: &str,
    ) -> Result<(), MapError> {
        let provider = LanguageProvider::new(name, extensions, language, query_source)?;

        self.by_extension.retain(|_, owner| owner != name);
        for ext in provider.extensions() {
            self.by_extension.insert(ext.clone(), name.to_string());
        }
        self.providers.insert(name.to_string(), provider);
        Ok(())
    }

    /// Look up the provider for a file extension (case-insensitive).
    pub fn for_extension(&self, ext: &str) -> Option<&LanguageProvider> {
        let owner = self.by_extension.get(&ext.to_ascii_lowercase())?;
        self.providers.get(owner)
    }

    /// Look up a provider by registry name.
    pub fn get(&self, name: &str) -> Option<&LanguageProvider> {
        self.providers.get(name)
    }

    /// Registered language names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
