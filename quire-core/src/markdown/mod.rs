//! Markdown rendering with the wikilink and heading-anchor passes.

pub mod headings;
pub mod wikilinks;

#[cfg(test)]
mod test_integration;

use crate::models::Heading;
use pulldown_cmark::{html, Event, Options, Parser};
use serde::Serialize;

pub use headings::{inject_anchors, AnchorBehavior, HeadingAnchorTransformer};
pub use wikilinks::{
    resolve, MalformedWikilink, ResolvedLink, WikiLinkToken, WikilinkConfig, WikilinkResolver,
};

/// Output of rendering one document body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedDocument {
    pub html: String,
    pub links: Vec<WikiLinkToken>,
    pub headings: Vec<Heading>,
    pub warnings: Vec<MalformedWikilink>,
}

/// Markdown processor with the site's custom passes
#[derive(Debug, Clone)]
pub struct MarkdownProcessor {
    options: Options,
    headings: HeadingAnchorTransformer,
}

impl MarkdownProcessor {
    pub fn new(behavior: AnchorBehavior) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        Self {
            options,
            headings: HeadingAnchorTransformer::new(behavior),
        }
    }

    /// Convert markdown to HTML. The parsed events go through the wikilink
    /// pass, then the heading-anchor pass, before being rendered.
    pub fn render(&self, markdown: &str, wikilinks: &WikilinkResolver<'_>) -> RenderedDocument {
        let events: Vec<Event> = Parser::new_ext(markdown, self.options).collect();

        let (events, links, warnings) = wikilinks.transform(events);
        let (events, headings) = self.headings.transform(events);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        RenderedDocument {
            html: html_output,
            links,
            headings,
            warnings,
        }
    }
}

impl Default for MarkdownProcessor {
    fn default() -> Self {
        Self::new(AnchorBehavior::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> RenderedDocument {
        let config = WikilinkConfig::default();
        MarkdownProcessor::default().render(markdown, &WikilinkResolver::new(&config))
    }

    #[test]
    fn test_basic_markdown() {
        let doc = render("# Hello World\n\nThis is a **test**.");
        assert!(doc.html.contains("<h1 id=\"hello-world\">"));
        assert!(doc.html.contains("<strong>test</strong>"));
    }

    #[test]
    fn test_tables() {
        let md = r#"
| Header 1 | Header 2 |
|----------|----------|
| Cell 1   | Cell 2   |
"#;
        let doc = render(md);
        assert!(doc.html.contains("<table>"));
        assert!(doc.html.contains("<th>Header 1</th>"));
    }

    #[test]
    fn test_code_blocks() {
        let doc = render("```rust\nfn main() {}\n```");
        assert!(doc.html.contains("<pre"));
        assert!(doc.html.contains("fn main() {}"));
    }
}
