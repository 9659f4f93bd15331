use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MapError;
use crate::Result;

/// Top-level configuration loaded from `.ctxmap.toml`.
///
/// Supports layered resolution: CLI flags > local config > defaults.
///
/// # Examples
///
/// ```
/// use ctxmap_core::MapConfig;
///
/// let config = MapConfig::default();
/// assert_eq!(config.map.max_map_tokens, 8192);
/// assert_eq!(config.ranking.damping, 0.85);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// File discovery and budget settings.
    #[serde(default)]
    pub map: MapSection,
    /// PageRank and boost settings.
    #[serde(default)]
    pub ranking: RankingConfig,
    /// Symbol navigation rendering settings.
    #[serde(default)]
    pub navigation: NavigationConfig,
}

impl MapConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Io`] if the file cannot be read,
    /// [`MapError::Toml`] if the content is not valid TOML, or
    /// [`MapError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ctxmap_core::MapConfig;
    /// use std::path::Path;
    ///
    /// let config = MapConfig::from_file(Path::new(".ctxmap.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Toml`] if parsing fails, or [`MapError::Config`]
    /// if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use ctxmap_core::MapConfig;
    ///
    /// let toml = r#"
    /// [map]
    /// max_map_tokens = 1024
    /// "#;
    /// let config = MapConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.map.max_map_tokens, 1024);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that numeric settings are in range.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        let r = &self.ranking;
        if !(r.damping > 0.0 && r.damping < 1.0) {
            return Err(MapError::Config(format!(
                "ranking.damping must be in (0, 1), got {}",
                r.damping
            )));
        }
        if r.tolerance.is_nan() || r.tolerance <= 0.0 {
            return Err(MapError::Config(format!(
                "ranking.tolerance must be positive, got {}",
                r.tolerance
            )));
        }
        if r.max_iterations == 0 {
            return Err(MapError::Config(
                "ranking.max_iterations must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("ranking.chat_seed_weight", r.chat_seed_weight),
            ("ranking.mention_boost", r.mention_boost),
            ("ranking.chat_file_boost", r.chat_file_boost),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(MapError::Config(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// File discovery and token budget settings.
///
/// # Examples
///
/// ```
/// use ctxmap_core::MapSection;
///
/// let map = MapSection::default();
/// assert_eq!(map.max_file_size, 1_048_576);
/// assert!(!map.respect_gitignore);
/// assert!(map.excludes.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSection {
    /// Default token budget for `get_repo_map` (default: 8192).
    #[serde(default = "default_max_map_tokens")]
    pub max_map_tokens: usize,
    /// Files larger than this many bytes are skipped (default: 1 MiB).
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Honor `.gitignore` files while walking directories (default: false).
    #[serde(default)]
    pub respect_gitignore: bool,
    /// Extra exclusion patterns, added to the built-in defaults.
    #[serde(default)]
    pub excludes: Vec<String>,
}

fn default_max_map_tokens() -> usize {
    8192
}

fn default_max_file_size() -> u64 {
    1_048_576
}

impl Default for MapSection {
    fn default() -> Self {
        Self {
            max_map_tokens: default_max_map_tokens(),
            max_file_size: default_max_file_size(),
            respect_gitignore: false,
            excludes: Vec::new(),
        }
    }
}

/// PageRank and boost parameters.
///
/// # Examples
///
/// ```
/// use ctxmap_core::RankingConfig;
///
/// let ranking = RankingConfig::default();
/// assert_eq!(ranking.chat_seed_weight, 100.0);
/// assert_eq!(ranking.mention_boost * ranking.chat_file_boost, 200.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Probability of following an out-edge (default: 0.85).
    #[serde(default = "default_damping")]
    pub damping: f64,
    /// Personalization weight of a chat file relative to any other file (default: 100).
    #[serde(default = "default_chat_seed_weight")]
    pub chat_seed_weight: f64,
    /// Multiplier for tags whose name was mentioned (default: 10).
    #[serde(default = "default_mention_boost")]
    pub mention_boost: f64,
    /// Multiplier for tags defined in a chat file (default: 20).
    #[serde(default = "default_chat_file_boost")]
    pub chat_file_boost: f64,
    /// Upper bound on PageRank iterations (default: 100).
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Per-node convergence tolerance (default: 1e-6).
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_damping() -> f64 {
    0.85
}

fn default_chat_seed_weight() -> f64 {
    100.0
}

fn default_mention_boost() -> f64 {
    10.0
}

fn default_chat_file_boost() -> f64 {
    20.0
}

fn default_max_iterations() -> usize {
    100
}

fn default_tolerance() -> f64 {
    1e-6
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            damping: default_damping(),
            chat_seed_weight: default_chat_seed_weight(),
            mention_boost: default_mention_boost(),
            chat_file_boost: default_chat_file_boost(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
        }
    }
}

/// Symbol navigation rendering settings.
///
/// # Examples
///
/// ```
/// use ctxmap_core::NavigationConfig;
///
/// let nav = NavigationConfig::default();
/// assert_eq!(nav.definition_pad, 8);
/// assert_eq!(nav.reference_pad, 4);
/// assert!(nav.snippets);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Context lines shown around each definition (default: 8).
    #[serde(default = "default_definition_pad")]
    pub definition_pad: usize,
    /// Context lines shown around each reference (default: 4).
    #[serde(default = "default_reference_pad")]
    pub reference_pad: usize,
    /// Attach the source line to every location (default: true).
    #[serde(default = "default_snippets")]
    pub snippets: bool,
}

fn default_definition_pad() -> usize {
    8
}

fn default_reference_pad() -> usize {
    4
}

fn default_snippets() -> bool {
    true
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            definition_pad: default_definition_pad(),
            reference_pad: default_reference_pad(),
            snippets: default_snippets(),
        }
    }
}
