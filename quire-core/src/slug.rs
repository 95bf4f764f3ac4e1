//! Slug generation and per-document slug uniqueness.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

static HYPHEN_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s").expect("valid regex"));

/// Convert a string to a URL-safe slug
///
/// Rules:
/// - Lowercase
/// - Replace whitespace with hyphens
/// - Remove punctuation (keeps hyphens and unicode letters)
/// - Collapse multiple hyphens
/// - Trim leading/trailing hyphens
///
/// # Examples
///
/// ```
/// use quire_core::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("Rust & Safety"), "rust-safety");
/// assert_eq!(slugify("C++ Programming"), "c-programming");
/// ```
pub fn slugify(input: &str) -> String {
    let lowercased = input.to_lowercase();

    let cleaned = lowercased
        .graphemes(true)
        .filter_map(|g| {
            let c = g.chars().next()?;
            if c.is_whitespace() || c == '_' {
                Some("-")
            } else if c.is_alphanumeric() || c == '-' {
                Some(g)
            } else {
                None
            }
        })
        .collect::<String>();

    let collapsed = HYPHEN_RUNS.replace_all(&cleaned, "-");
    collapsed.trim_matches('-').to_string()
}

/// Lower-case a page name and turn each whitespace character into a hyphen.
///
/// Unlike [`slugify`] this keeps punctuation, so `[[Rust 1.0]]` maps to
/// `rust-1.0`.
pub fn hyphenate(input: &str) -> String {
    WHITESPACE.replace_all(input, "-").to_lowercase()
}

/// Hands out slugs that are unique within one document.
///
/// The first occurrence of a slug is returned as is; later occurrences get
/// `-2`, `-3`, ... in the order they are requested.
#[derive(Debug, Default, Clone)]
pub struct SlugTracker {
    used: HashSet<String>,
}

impl SlugTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a slug as taken without generating anything (explicit heading ids).
    pub fn reserve(&mut self, slug: &str) {
        self.used.insert(slug.to_string());
    }

    /// Slugify `text` and disambiguate it against every slug seen so far.
    pub fn slug_for(&mut self, text: &str) -> String {
        let mut base = slugify(text);
        if base.is_empty() {
            base = String::from("section");
        }
        self.unique(&base)
    }

    /// Disambiguate an already computed slug.
    pub fn unique(&mut self, base: &str) -> String {
        if self.used.insert(base.to_string()) {
            return base.to_string();
        }

        let mut n = 2usize;
        loop {
            let candidate = format!("{base}-{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Rust Programming"), "rust-programming");
    }

    #[test]
    fn test_special_characters() {
        assert_eq!(slugify("Rust & Safety"), "rust-safety");
        assert_eq!(slugify("C++ Programming"), "c-programming");
        assert_eq!(slugify("Node.js Tips"), "nodejs-tips");
        assert_eq!(slugify("What's new?"), "whats-new");
    }

    #[test]
    fn test_unicode() {
        assert_eq!(slugify("Café"), "café");
        assert_eq!(slugify("naïve"), "naïve");
    }

    #[test]
    fn test_multiple_spaces_and_underscores() {
        assert_eq!(slugify("Hello    World"), "hello-world");
        assert_eq!(slugify("rust_lang_basics"), "rust-lang-basics");
        assert_eq!(slugify("  Hello World  "), "hello-world");
    }

    #[test]
    fn test_empty_and_special_only() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_hyphenate_keeps_punctuation() {
        assert_eq!(hyphenate("Page One"), "page-one");
        assert_eq!(hyphenate("Rust 1.0"), "rust-1.0");
        assert_eq!(hyphenate("Data  Stack"), "data--stack");
    }

    #[test]
    fn test_tracker_suffixes_start_at_two() {
        let mut tracker = SlugTracker::new();
        assert_eq!(tracker.slug_for("Intro"), "intro");
        assert_eq!(tracker.slug_for("Intro"), "intro-2");
        assert_eq!(tracker.slug_for("intro"), "intro-3");
    }

    #[test]
    fn test_tracker_skips_taken_suffixes() {
        let mut tracker = SlugTracker::new();
        assert_eq!(tracker.slug_for("Setup"), "setup");
        assert_eq!(tracker.slug_for("Setup 2"), "setup-2");
        assert_eq!(tracker.slug_for("Setup"), "setup-3");
    }

    #[test]
    fn test_tracker_respects_reserved() {
        let mut tracker = SlugTracker::new();
        tracker.reserve("notes");
        assert_eq!(tracker.slug_for("Notes"), "notes-2");
    }

    #[test]
    fn test_tracker_empty_text() {
        let mut tracker = SlugTracker::new();
        assert_eq!(tracker.slug_for("???"), "section");
        assert_eq!(tracker.slug_for("!!!"), "section-2");
    }
}
