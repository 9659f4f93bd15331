use std::path::PathBuf;

/// Errors that can occur while building repository maps.
///
/// Only caller contract violations and misconfiguration surface here.
/// Per-file problems (unsupported language, undecodable content) are
/// recorded as soft exclusions instead.
///
/// # Examples
///
/// ```
/// use ctxmap_core::MapError;
///
/// let err = MapError::Config("max_map_tokens must be set".into());
/// assert!(err.to_string().contains("max_map_tokens"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum MapError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(ctxmap::config), help("run `ctxmap init` for a commented template"))]
    Config(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(ctxmap::config))]
    Toml(#[from] toml::de::Error),

    /// An input path does not exist.
    #[error("path not found: {}", .0.display())]
    #[diagnostic(code(ctxmap::path))]
    PathNotFound(PathBuf),

    /// The repository root is not a directory.
    #[error("not a directory: {}", .0.display())]
    #[diagnostic(code(ctxmap::path), help("the repository root must be a directory"))]
    NotADirectory(PathBuf),

    /// A tag query failed to compile for a language.
    #[error("invalid tag query for {language}: {message}")]
    Query { language: String, message: String },

    /// A grammar could not be loaded into the parser.
    #[error("language error: {0}")]
    Language(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: MapError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = MapError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn path_not_found_shows_path() {
        let err = MapError::PathNotFound(PathBuf::from("/tmp/missing"));
        assert!(err.to_string().contains("/tmp/missing"));
    }

    #[test]
    fn query_error_names_language() {
        let err = MapError::Query {
            language: "python".into(),
            message: "invalid node type".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid tag query for python: invalid node type"
        );
    }
}
