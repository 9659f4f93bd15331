use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Result;

/// How `ctxmap map` and `ctxmap find` print their results.
///
/// `Text` prints the rendered map, or the navigation summary with its
/// `│` snippet lines. `Json` prints the same result as a camelCase object:
/// `{ "map": ..., "report": ... }` for `map`, and the symbol navigation
/// structure for `find`. Parsing is case-insensitive so the value can come
/// straight from a `--format` flag.
///
/// # Examples
///
/// ```
/// use ctxmap_core::OutputFormat;
///
/// let format: OutputFormat = "Json".parse().unwrap();
/// assert_eq!(format, OutputFormat::Json);
/// assert_eq!(format.to_string(), "json");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub const VARIANTS: [&'static str; 2] = ["text", "json"];
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => f.write_str("text"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "unknown output format `{other}` (expected one of: {})",
                Self::VARIANTS.join(", ")
            )),
        }
    }
}

/// Pretty-printed JSON for `--format json` output.
///
/// # Errors
///
/// Returns [`MapError::Serialization`](crate::MapError::Serialization) if
/// `value` cannot be represented as JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::MapError;

    #[test]
    fn format_flag_parses_any_case() {
        for (flag, expected) in [
            ("text", OutputFormat::Text),
            ("TEXT", OutputFormat::Text),
            ("json", OutputFormat::Json),
            ("Json", OutputFormat::Json),
        ] {
            assert_eq!(flag.parse::<OutputFormat>().unwrap(), expected);
        }
    }

    #[test]
    fn unknown_format_lists_choices() {
        let err = "xml".parse::<OutputFormat>().unwrap_err();
        assert!(err.contains("xml"));
        assert!(err.contains("text, json"));
    }

    #[test]
    fn display_matches_variants() {
        assert_eq!(OutputFormat::Text.to_string(), OutputFormat::VARIANTS[0]);
        assert_eq!(OutputFormat::Json.to_string(), OutputFormat::VARIANTS[1]);
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
    }

    #[test]
    fn to_json_pretty_prints() {
        let value = BTreeMap::from([("map", "a.py:\n│def a():")]);
        let json = to_json(&value).unwrap();
        assert!(json.starts_with("{\n  \"map\""), "{json}");
    }

    #[test]
    fn to_json_reports_serialization_errors() {
        // JSON object keys must be strings.
        let value = BTreeMap::from([((1, 2), "pair key")]);
        let err = to_json(&value).unwrap_err();
        assert!(matches!(err, MapError::Serialization(_)));
        assert!(err.to_string().starts_with("serialization error:"));
    }
}
