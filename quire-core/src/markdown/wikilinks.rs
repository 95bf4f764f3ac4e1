//! Wikilink resolution for `[[target]]` and `[[target|alias]]` syntax.
//!
//! Page names go through a [`PageResolver`] to produce permalink candidates,
//! and the chosen candidate through an [`HrefTemplate`]. Both are values on
//! [`WikilinkConfig`], so several configurations can coexist in one build.
//!
//! Resolution is optimistic unless an entry-id index is supplied: a link is
//! "resolved" when it produces a well-formed href. In strict mode a link is
//! resolved only when one of its candidates is a known entry id.

use crate::slug::{hyphenate, slugify};
use pulldown_cmark::{CowStr, Event, Tag, TagEnd};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Maps a page name to permalink candidates, most preferred first.
pub trait PageResolver: Send + Sync {
    fn candidates(&self, name: &str) -> Vec<String>;
}

impl<F> PageResolver for F
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    fn candidates(&self, name: &str) -> Vec<String> {
        self(name)
    }
}

/// Maps a chosen permalink to the final href.
pub trait HrefTemplate: Send + Sync {
    fn href(&self, permalink: &str) -> String;
}

impl<F> HrefTemplate for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn href(&self, permalink: &str) -> String {
        self(permalink)
    }
}

/// Built-in page name normalization policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlugPolicy {
    /// Lower-case and turn whitespace into hyphens; punctuation is kept
    #[default]
    Hyphenate,
    /// Full slug rules: punctuation stripped, hyphen runs collapsed
    Slugify,
}

impl PageResolver for SlugPolicy {
    fn candidates(&self, name: &str) -> Vec<String> {
        let slug = match self {
            SlugPolicy::Hyphenate => hyphenate(name),
            SlugPolicy::Slugify => slugify(name),
        };
        vec![slug]
    }
}

/// Href template with a `{permalink}` placeholder, e.g. `/handbook/{permalink}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate(String);

impl PathTemplate {
    pub const PLACEHOLDER: &'static str = "{permalink}";

    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }
}

impl HrefTemplate for PathTemplate {
    fn href(&self, permalink: &str) -> String {
        if self.0.contains(Self::PLACEHOLDER) {
            self.0.replace(Self::PLACEHOLDER, permalink)
        } else {
            format!("{}{}", self.0, permalink)
        }
    }
}

/// How a link is classified as found or missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMode {
    /// Any well-formed href counts as resolved
    Optimistic,
    /// Only candidates present in the entry-id index count as resolved
    Strict,
    /// Strict when an index is supplied, optimistic otherwise
    #[default]
    Auto,
}

/// Everything the resolver needs, passed explicitly
#[derive(Clone)]
pub struct WikilinkConfig {
    pub page_resolver: Arc<dyn PageResolver>,
    pub href_template: Arc<dyn HrefTemplate>,
    pub alias_divider: String,
    pub resolved_class: String,
    pub unresolved_class: String,
    pub mode: ResolutionMode,
}

impl Default for WikilinkConfig {
    fn default() -> Self {
        Self {
            page_resolver: Arc::new(SlugPolicy::Hyphenate),
            href_template: Arc::new(PathTemplate::new("/handbook/{permalink}")),
            alias_divider: String::from("|"),
            resolved_class: String::from("internal"),
            unresolved_class: String::from("new"),
            mode: ResolutionMode::Auto,
        }
    }
}

impl fmt::Debug for WikilinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WikilinkConfig")
            .field("alias_divider", &self.alias_divider)
            .field("resolved_class", &self.resolved_class)
            .field("unresolved_class", &self.unresolved_class)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// A parsed `[[...]]` occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WikiLinkToken {
    /// Text left of the alias divider, trimmed
    pub raw_target: String,
    /// Alias if present, otherwise `raw_target`; never empty
    pub display_text: String,
    /// Permalink chosen for the target (empty for same-page fragment links)
    pub permalink: String,
    pub resolved_href: String,
    pub resolved: bool,
}

impl WikiLinkToken {
    pub fn to_link(&self, config: &WikilinkConfig) -> ResolvedLink {
        ResolvedLink {
            href: self.resolved_href.clone(),
            text: self.display_text.clone(),
            class_name: if self.resolved {
                config.resolved_class.clone()
            } else {
                config.unresolved_class.clone()
            },
        }
    }
}

/// Anchor produced for one token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLink {
    pub href: String,
    pub text: String,
    pub class_name: String,
}

impl ResolvedLink {
    fn open_tag(&self) -> String {
        format!(
            r#"<a href="{}" class="{}">"#,
            html_escape(&self.href),
            html_escape(&self.class_name)
        )
    }

    pub fn to_html(&self) -> String {
        format!("{}{}</a>", self.open_tag(), html_escape(&self.text))
    }
}

/// Why a `[[...]]` span was left as literal text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedReason {
    EmptyTarget,
    EmptyAlias,
    Unterminated,
    Nested,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            MalformedReason::EmptyTarget => "empty target",
            MalformedReason::EmptyAlias => "empty alias",
            MalformedReason::Unterminated => "missing closing ]]",
            MalformedReason::Nested => "nested [[",
        };
        f.write_str(msg)
    }
}

/// Recorded instead of failing the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedWikilink {
    /// Byte offset of the opening `[[` within the scanned text run
    pub offset: usize,
    /// The literal text that was left in place
    pub span: String,
    pub reason: MalformedReason,
}

impl fmt::Display for MalformedWikilink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed wikilink {:?}: {}", self.span, self.reason)
    }
}

/// Result of rewriting plain text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub text: String,
    pub links: Vec<WikiLinkToken>,
    pub warnings: Vec<MalformedWikilink>,
}

/// Rewrite every wikilink in `text` into an HTML anchor, optimistically.
///
/// ```
/// use quire_core::markdown::wikilinks::{resolve, WikilinkConfig};
///
/// let out = resolve("See [[Page One|the page]].", &WikilinkConfig::default());
/// assert_eq!(
///     out.text,
///     r#"See <a href="/handbook/page-one" class="internal">the page</a>."#
/// );
/// ```
pub fn resolve(text: &str, config: &WikilinkConfig) -> Resolution {
    WikilinkResolver::new(config).resolve_text(text)
}

enum Piece<'t> {
    Literal(&'t str),
    Link(WikiLinkToken),
}

/// Resolver bound to one configuration and an optional entry-id index
pub struct WikilinkResolver<'a> {
    config: &'a WikilinkConfig,
    index: Option<&'a HashSet<String>>,
}

impl<'a> WikilinkResolver<'a> {
    pub fn new(config: &'a WikilinkConfig) -> Self {
        Self {
            config,
            index: None,
        }
    }

    /// Cross-check targets against known entry ids
    pub fn with_index(mut self, index: &'a HashSet<String>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn config(&self) -> &WikilinkConfig {
        self.config
    }

    fn strict(&self) -> bool {
        match self.config.mode {
            ResolutionMode::Optimistic => false,
            ResolutionMode::Strict => true,
            ResolutionMode::Auto => self.index.is_some(),
        }
    }

    /// Rewrite wikilinks in plain text
    pub fn resolve_text(&self, text: &str) -> Resolution {
        let (pieces, warnings) = self.scan(text);
        let mut out = String::with_capacity(text.len());
        let mut links = Vec::new();

        for piece in pieces {
            match piece {
                Piece::Literal(s) => out.push_str(s),
                Piece::Link(token) => {
                    out.push_str(&token.to_link(self.config).to_html());
                    links.push(token);
                }
            }
        }

        Resolution {
            text: out,
            links,
            warnings,
        }
    }

    /// Transform markdown events, rewriting wikilinks in text outside code.
    ///
    /// Returns (events, tokens, warnings).
    pub fn transform<'e>(
        &self,
        events: Vec<Event<'e>>,
    ) -> (Vec<Event<'e>>, Vec<WikiLinkToken>, Vec<MalformedWikilink>) {
        let mut result = Vec::with_capacity(events.len());
        let mut links = Vec::new();
        let mut warnings = Vec::new();
        let mut in_code_block = false;
        let mut iter = events.into_iter().peekable();

        while let Some(event) = iter.next() {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    result.push(Event::Start(Tag::CodeBlock(kind)));
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    result.push(Event::End(TagEnd::CodeBlock));
                }
                Event::Text(text) if !in_code_block => {
                    // The parser splits `[[` and `]]` into separate text events
                    let mut merged = text.into_string();
                    while let Some(Event::Text(next)) = iter.peek() {
                        merged.push_str(next);
                        iter.next();
                    }

                    if !merged.contains("[[") {
                        result.push(Event::Text(CowStr::from(merged)));
                        continue;
                    }

                    let (pieces, mut span_warnings) = self.scan(&merged);
                    for piece in pieces {
                        match piece {
                            Piece::Literal(s) => {
                                result.push(Event::Text(CowStr::from(s.to_string())))
                            }
                            Piece::Link(token) => {
                                let link = token.to_link(self.config);
                                result.push(Event::InlineHtml(CowStr::from(link.open_tag())));
                                result.push(Event::Text(CowStr::from(link.text)));
                                result.push(Event::InlineHtml(CowStr::Borrowed("</a>")));
                                links.push(token);
                            }
                        }
                    }
                    warnings.append(&mut span_warnings);
                }
                other => result.push(other),
            }
        }

        (result, links, warnings)
    }

    fn scan<'t>(&self, text: &'t str) -> (Vec<Piece<'t>>, Vec<MalformedWikilink>) {
        let mut pieces = Vec::new();
        let mut warnings = Vec::new();
        let mut literal_start = 0;
        let mut cursor = 0;

        while let Some(rel) = text[cursor..].find("[[") {
            let open = cursor + rel;
            let inner_start = open + 2;
            let close = text[inner_start..].find("]]").map(|i| inner_start + i);
            let nested = text[inner_start..].find("[[").map(|i| inner_start + i);

            let Some(close) = close else {
                warnings.push(malformed(text, open, text.len(), MalformedReason::Unterminated));
                break;
            };

            if let Some(nested) = nested.filter(|n| *n < close) {
                // The outer opener stays literal; scanning resumes at the inner one
                warnings.push(malformed(text, open, nested, MalformedReason::Nested));
                cursor = nested;
                continue;
            }

            match self.parse(&text[inner_start..close]) {
                Ok(token) => {
                    if open > literal_start {
                        pieces.push(Piece::Literal(&text[literal_start..open]));
                    }
                    pieces.push(Piece::Link(token));
                    literal_start = close + 2;
                }
                Err(reason) => warnings.push(malformed(text, open, close + 2, reason)),
            }
            cursor = close + 2;
        }

        if literal_start < text.len() {
            pieces.push(Piece::Literal(&text[literal_start..]));
        }

        (pieces, warnings)
    }

    fn parse(&self, inner: &str) -> Result<WikiLinkToken, MalformedReason> {
        // A lone bracket inside the delimiters, as in `[[[x]]]`
        if inner.contains(['[', ']']) {
            return Err(MalformedReason::Nested);
        }

        let divider = self.config.alias_divider.as_str();
        let (target, alias) = match inner.split_once(divider).filter(|_| !divider.is_empty()) {
            Some((target, alias)) => (target.trim(), Some(alias.trim())),
            None => (inner.trim(), None),
        };

        if target.is_empty() {
            return Err(MalformedReason::EmptyTarget);
        }
        if alias.is_some_and(str::is_empty) {
            return Err(MalformedReason::EmptyAlias);
        }

        let (page, fragment) = match target.split_once('#') {
            Some((page, frag)) => (page.trim(), Some(slugify(frag)).filter(|f| !f.is_empty())),
            None => (target, None),
        };

        let (permalink, mut href, resolved) = if page.is_empty() {
            // `[[#Section]]` points into the current page
            match &fragment {
                Some(_) => (String::new(), String::new(), true),
                None => return Err(MalformedReason::EmptyTarget),
            }
        } else {
            let (permalink, href) = self.choose(page);
            let resolved = if self.strict() {
                self.index.is_some_and(|ids| ids.contains(&permalink))
            } else {
                is_well_formed(&permalink, &href)
            };
            (permalink, href, resolved)
        };

        if let Some(frag) = fragment {
            href.push('#');
            href.push_str(&frag);
        }

        Ok(WikiLinkToken {
            raw_target: target.to_string(),
            display_text: alias.unwrap_or(target).to_string(),
            permalink,
            resolved_href: href,
            resolved,
        })
    }

    /// Pick a candidate: the first indexed one in strict mode, else the first.
    fn choose(&self, page: &str) -> (String, String) {
        let candidates = self.config.page_resolver.candidates(page);
        let chosen = if self.strict() {
            self.index
                .and_then(|ids| candidates.iter().find(|c| ids.contains(*c)))
                .or_else(|| candidates.first())
        } else {
            candidates.first()
        };
        let permalink = chosen.cloned().unwrap_or_default();
        let href = self.config.href_template.href(&permalink);
        (permalink, href)
    }
}

fn malformed(text: &str, start: usize, end: usize, reason: MalformedReason) -> MalformedWikilink {
    let warning = MalformedWikilink {
        offset: start,
        span: text[start..end].to_string(),
        reason,
    };
    tracing::warn!("{}", warning);
    warning
}

fn is_well_formed(permalink: &str, href: &str) -> bool {
    !permalink.is_empty()
        && !href.is_empty()
        && !href
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulldown_cmark::Parser;

    fn config() -> WikilinkConfig {
        WikilinkConfig::default()
    }

    #[test]
    fn test_alias_becomes_display_text() {
        let cfg = config();
        let out = resolve("See [[Page One|alias]] for details.", &cfg);

        assert_eq!(out.links.len(), 1);
        let link = &out.links[0];
        assert_eq!(link.display_text, "alias");
        assert_eq!(link.raw_target, "Page One");
        let expected = cfg.href_template.href(&cfg.page_resolver.candidates("Page One")[0]);
        assert_eq!(link.resolved_href, expected);
        assert_eq!(
            out.text,
            r#"See <a href="/handbook/page-one" class="internal">alias</a> for details."#
        );
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_target_is_display_text_without_alias() {
        let out = resolve("See [[Page One]].", &config());
        assert_eq!(out.links[0].display_text, "Page One");
        assert!(out.text.contains(">Page One</a>."));
    }

    #[test]
    fn test_empty_target_left_literal() {
        let out = resolve("[[]]", &config());
        assert_eq!(out.text, "[[]]");
        assert!(out.links.is_empty());
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].reason, MalformedReason::EmptyTarget);
        assert_eq!(out.warnings[0].span, "[[]]");
    }

    #[test]
    fn test_empty_alias_is_malformed() {
        let out = resolve("a [[Target|]] b [[Ok]]", &config());
        assert!(out.text.starts_with("a [[Target|]] b <a "));
        assert_eq!(out.links.len(), 1);
        assert_eq!(out.warnings[0].reason, MalformedReason::EmptyAlias);
    }

    #[test]
    fn test_unterminated_does_not_abort_document() {
        let out = resolve("[[Good]] then [[broken", &config());
        assert_eq!(out.links.len(), 1);
        assert!(out.text.ends_with(" then [[broken"));
        assert_eq!(out.warnings[0].reason, MalformedReason::Unterminated);
        assert_eq!(out.warnings[0].offset, 14);
    }

    #[test]
    fn test_nested_opener_left_literal() {
        let out = resolve("[[outer [[inner]] tail]]", &config());
        assert_eq!(out.links.len(), 1);
        assert_eq!(out.links[0].raw_target, "inner");
        assert!(out.text.starts_with("[[outer <a "));
        assert!(out.text.ends_with("</a> tail]]"));
        assert_eq!(out.warnings[0].reason, MalformedReason::Nested);
        assert_eq!(out.warnings[0].span, "[[outer ");
    }

    #[test]
    fn test_stray_bracket_inside_delimiters_is_nested() {
        let out = resolve("[[[x]]] and [[a]b]]", &config());
        assert_eq!(out.text, "[[[x]]] and [[a]b]]");
        assert!(out.links.is_empty());
        let spans: Vec<_> = out.warnings.iter().map(|w| w.span.as_str()).collect();
        assert_eq!(spans, ["[[[x]]", "[[a]b]]"]);
        assert!(out.warnings.iter().all(|w| w.reason == MalformedReason::Nested));
    }

    #[test]
    fn test_text_without_links_is_unchanged() {
        let text = "Plain text with [single] brackets and ]] stray closers.";
        let out = resolve(text, &config());
        assert_eq!(out.text, text);
        assert!(out.links.is_empty());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_fragment_is_slugified() {
        let out = resolve("[[Rust Safety#Memory Model]]", &config());
        assert_eq!(out.links[0].resolved_href, "/handbook/rust-safety#memory-model");
        assert_eq!(out.links[0].display_text, "Rust Safety#Memory Model");
    }

    #[test]
    fn test_same_page_fragment() {
        let out = resolve("[[#Setup Steps|setup]]", &config());
        assert_eq!(out.links[0].resolved_href, "#setup-steps");
        assert!(out.links[0].resolved);
    }

    #[test]
    fn test_custom_divider_and_classes() {
        let cfg = WikilinkConfig {
            alias_divider: String::from("::"),
            resolved_class: String::from("wl"),
            ..config()
        };
        let out = resolve("[[a|b::label]]", &cfg);
        assert_eq!(out.links[0].raw_target, "a|b");
        assert_eq!(out.links[0].display_text, "label");
        assert!(out.text.contains(r#"class="wl""#));
    }

    #[test]
    fn test_closure_resolver_and_template() {
        let cfg = WikilinkConfig {
            page_resolver: Arc::new(|name: &str| vec![name.to_uppercase()]),
            href_template: Arc::new(|p: &str| format!("/wiki/{p}.html")),
            ..config()
        };
        let out = resolve("[[abc]]", &cfg);
        assert_eq!(out.links[0].resolved_href, "/wiki/ABC.html");
    }

    #[test]
    fn test_optimistic_marks_missing_targets_resolved() {
        let out = resolve("[[Does Not Exist]]", &config());
        assert!(out.links[0].resolved);
    }

    #[test]
    fn test_optimistic_rejects_ill_formed_href() {
        let cfg = WikilinkConfig {
            page_resolver: Arc::new(|name: &str| vec![name.to_string()]),
            ..config()
        };
        let out = resolve("[[two words]]", &cfg);
        assert!(!out.links[0].resolved);
        assert!(out.text.contains(r#"class="new""#));
    }

    #[test]
    fn test_strict_mode_uses_index() {
        let cfg = config();
        let index: HashSet<String> = ["page-one".to_string()].into_iter().collect();
        let resolver = WikilinkResolver::new(&cfg).with_index(&index);

        let out = resolver.resolve_text("[[Page One]] and [[Page Two]]");
        assert!(out.links[0].resolved);
        assert!(!out.links[1].resolved);
        assert!(out.text.contains(r#"<a href="/handbook/page-two" class="new">Page Two</a>"#));
    }

    #[test]
    fn test_strict_prefers_indexed_candidate() {
        let cfg = WikilinkConfig {
            page_resolver: Arc::new(|name: &str| vec![name.to_string(), slugify(name)]),
            ..config()
        };
        let index: HashSet<String> = ["page-one".to_string()].into_iter().collect();
        let out = WikilinkResolver::new(&cfg)
            .with_index(&index)
            .resolve_text("[[Page One]]");
        assert_eq!(out.links[0].permalink, "page-one");
        assert!(out.links[0].resolved);
    }

    #[test]
    fn test_optimistic_mode_ignores_index() {
        let cfg = WikilinkConfig {
            mode: ResolutionMode::Optimistic,
            ..config()
        };
        let index = HashSet::new();
        let out = WikilinkResolver::new(&cfg)
            .with_index(&index)
            .resolve_text("[[Anything]]");
        assert!(out.links[0].resolved);
    }

    #[test]
    fn test_strict_without_index_marks_everything_missing() {
        let cfg = WikilinkConfig {
            mode: ResolutionMode::Strict,
            ..config()
        };
        let out = resolve("[[Anything]]", &cfg);
        assert!(!out.links[0].resolved);
    }

    #[test]
    fn test_display_text_is_escaped() {
        let out = resolve("[[a|<b>]]", &config());
        assert!(out.text.contains(">&lt;b&gt;</a>"));
    }

    #[test]
    fn test_transform_events() {
        let cfg = config();
        let resolver = WikilinkResolver::new(&cfg);
        let events: Vec<Event> = Parser::new("Check [[Page One|this]] out").collect();

        let (events, links, warnings) = resolver.transform(events);

        assert_eq!(links.len(), 1);
        assert!(warnings.is_empty());
        let open = r#"<a href="/handbook/page-one" class="internal">"#;
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::InlineHtml(html) if html.as_ref() == open)));
    }

    #[test]
    fn test_transform_skips_code() {
        let cfg = config();
        let resolver = WikilinkResolver::new(&cfg);
        let events: Vec<Event> =
            Parser::new("```\n[[Not A Link]]\n```\n\nInline `[[code]]` too").collect();

        let (_, links, _) = resolver.transform(events);
        assert!(links.is_empty());
    }
}
