//! Front matter extraction from markdown files.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Front matter must be a key/value mapping")]
    NotAMapping,
}

static FRONTMATTER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\A---[ \t]*\r?\n(?:(.*?)\r?\n)?---[ \t]*(?:\r?\n|\z)(.*)\z")
        .expect("valid front matter regex")
});

/// Split a document into its raw front matter mapping and markdown body.
///
/// A document without a leading `---` block yields an empty mapping and the
/// full text as body.
///
/// # Example
///
/// ```
/// use quire_core::frontmatter::parse_frontmatter;
///
/// let content = "---\ntitle: My Post\ndate: 2025-01-01\n---\n# Hello World\n";
///
/// let (raw, body) = parse_frontmatter(content).unwrap();
/// assert_eq!(raw.get("title").and_then(|v| v.as_str()), Some("My Post"));
/// assert!(body.starts_with("# Hello World"));
/// ```
pub fn parse_frontmatter(content: &str) -> Result<(Mapping, String), FrontmatterError> {
    let Some(captures) = FRONTMATTER_REGEX.captures(content) else {
        return Ok((Mapping::new(), content.to_string()));
    };

    let yaml = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
    let body = captures.get(2).map(|m| m.as_str()).unwrap_or_default();

    let raw = match serde_yaml::from_str::<Value>(yaml)? {
        Value::Mapping(map) => map,
        Value::Null => Mapping::new(),
        _ => return Err(FrontmatterError::NotAMapping),
    };

    Ok((raw, body.to_string()))
}
