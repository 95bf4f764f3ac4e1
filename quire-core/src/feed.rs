//! Syndication feed generation.

use crate::models::ContentEntry;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("Entry `{entry_id}` is missing feed field `{field}`")]
    MissingFeedField { entry_id: String, field: String },
}

/// Channel-level settings for one feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMetadata {
    pub title: String,
    pub description: String,
    /// Absolute site origin, e.g. `https://example.com`
    pub site_origin: String,
    pub language: String,
    /// Metadata field used as the item title
    pub title_field: String,
    /// Metadata field used as the publish date
    pub date_field: String,
}

impl FeedMetadata {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        site_origin: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            site_origin: site_origin.into(),
            language: String::from("en-us"),
            title_field: String::from("title"),
            date_field: String::from("date"),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    fn origin(&self) -> &str {
        self.site_origin.trim_end_matches('/')
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    pub published_at: DateTime<FixedOffset>,
    pub link: String,
}

/// A feed envelope with its items, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedDocument {
    pub title: String,
    pub description: String,
    pub site_origin: String,
    pub language: String,
    pub items: Vec<FeedItem>,
}

/// Project validated entries into a feed.
///
/// Drafts are skipped. Items are ordered by publish date, newest first, with
/// ties broken by id; an id seen twice keeps its first position.
pub fn generate_feed<'a, I>(entries: I, meta: &FeedMetadata) -> Result<FeedDocument, FeedError>
where
    I: IntoIterator<Item = &'a ContentEntry>,
{
    let mut eligible: Vec<&ContentEntry> = entries.into_iter().filter(|e| !e.is_draft()).collect();
    eligible.sort_by(|a, b| a.id.cmp(&b.id));

    let mut items = eligible
        .into_iter()
        .map(|entry| to_item(entry, meta))
        .collect::<Result<Vec<_>, _>>()?;

    items.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(item.id.clone()));

    tracing::debug!("Feed '{}' has {} items", meta.title, items.len());

    Ok(FeedDocument {
        title: meta.title.clone(),
        description: meta.description.clone(),
        site_origin: meta.origin().to_string(),
        language: meta.language.clone(),
        items,
    })
}

fn to_item(entry: &ContentEntry, meta: &FeedMetadata) -> Result<FeedItem, FeedError> {
    let missing = |field: &str| FeedError::MissingFeedField {
        entry_id: entry.id.clone(),
        field: field.to_string(),
    };

    let title = entry
        .metadata
        .get_str(&meta.title_field)
        .ok_or_else(|| missing(meta.title_field.as_str()))?;
    let published_at = entry
        .metadata
        .get_date(&meta.date_field)
        .ok_or_else(|| missing(meta.date_field.as_str()))?;

    Ok(FeedItem {
        id: entry.id.clone(),
        title: title.to_string(),
        published_at,
        link: format!("{}/{}/", meta.origin(), entry.id),
    })
}

impl FeedDocument {
    /// Render as an RSS 2.0 document
    pub fn to_rss(&self) -> String {
        let mut items = String::new();
        for item in &self.items {
            let link = escape_xml(&item.link);
            items.push_str(&format!(
                "    <item>\n      <title>{}</title>\n      <link>{}</link>\n      <guid isPermaLink=\"true\">{}</guid>\n      <pubDate>{}</pubDate>\n    </item>\n",
                escape_xml(&item.title),
                link,
                link,
                item.published_at.to_rfc2822()
            ));
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>{}</title>
    <link>{}/</link>
    <description>{}</description>
    <language>{}</language>
{}  </channel>
</rss>
"#,
            escape_xml(&self.title),
            escape_xml(&self.site_origin),
            escape_xml(&self.description),
            escape_xml(&self.language),
            items
        )
    }
}

pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
