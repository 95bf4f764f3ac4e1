//! End-to-end tests for the markdown passes working together

use super::*;
use pulldown_cmark::{html, Parser};
use std::collections::HashSet;

fn plain_html(markdown: &str) -> String {
    let mut out = String::new();
    html::push_html(&mut out, Parser::new_ext(markdown, MarkdownProcessor::default().options));
    out
}

#[test]
fn test_wikilink_in_paragraph() {
    let config = WikilinkConfig::default();
    let processor = MarkdownProcessor::default();
    let doc = processor.render(
        "This is a paragraph with [[Page Name]] in it.",
        &WikilinkResolver::new(&config),
    );

    assert!(!doc.html.contains("[["), "Wikilinks should be converted");
    assert!(doc
        .html
        .contains(r#"<a href="/handbook/page-name" class="internal">Page Name</a>"#));
    assert_eq!(doc.links.len(), 1);
}

#[test]
fn test_wikilink_inside_heading_feeds_slug() {
    let config = WikilinkConfig::default();
    let doc = MarkdownProcessor::default().render(
        "## About [[Data Stack|the stack]]\n",
        &WikilinkResolver::new(&config),
    );

    assert_eq!(doc.headings[0].slug, "about-the-stack");
    assert_eq!(doc.links[0].display_text, "the stack");
}

#[test]
fn test_malformed_link_is_recovered() {
    let config = WikilinkConfig::default();
    let doc = MarkdownProcessor::default().render(
        "Broken [[]] but fine [[Ok]].\n",
        &WikilinkResolver::new(&config),
    );

    assert!(doc.html.contains("Broken [[]] but fine"));
    assert_eq!(doc.links.len(), 1);
    assert_eq!(doc.warnings.len(), 1);
}

#[test]
fn test_strict_resolution_marks_missing_pages() {
    let config = WikilinkConfig::default();
    let index: HashSet<String> = ["tools".to_string()].into_iter().collect();
    let doc = MarkdownProcessor::default().render(
        "[[Tools]] and [[Missing Page]]",
        &WikilinkResolver::new(&config).with_index(&index),
    );

    assert!(doc.html.contains(r#"<a href="/handbook/tools" class="internal">Tools</a>"#));
    assert!(doc
        .html
        .contains(r#"<a href="/handbook/missing-page" class="new">Missing Page</a>"#));
}

#[test]
fn test_document_without_links_or_headings_is_unchanged() {
    let markdown = "Just a paragraph with *emphasis* and `code`.\n\n- a list\n- of items\n";
    let config = WikilinkConfig::default();
    let doc = MarkdownProcessor::default().render(markdown, &WikilinkResolver::new(&config));

    assert_eq!(doc.html, plain_html(markdown));
    assert!(doc.links.is_empty());
    assert!(doc.headings.is_empty());
    assert!(doc.warnings.is_empty());
}
