//! Site building logic: load collections, render entries, generate feeds.

use crate::{
    collection::CollectionError,
    config::Config,
    feed::{generate_feed, FeedDocument, FeedError},
    markdown::{MalformedWikilink, MarkdownProcessor, RenderedDocument, WikilinkResolver},
    models::ContentEntry,
    sitemap::generate_sitemap,
};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Collection(#[from] CollectionError),

    #[error("Feed '{output}': {source}")]
    Feed {
        output: String,
        #[source]
        source: FeedError,
    },
}

/// One rendered entry
#[derive(Debug, Clone, Serialize)]
pub struct RenderedPage {
    pub collection: String,
    pub id: String,
    pub permalink: String,
    #[serde(flatten)]
    pub document: RenderedDocument,
}

/// A generated feed and the file it belongs in
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedFeed {
    pub output: String,
    pub document: FeedDocument,
}

/// Malformed wikilink found while rendering a page
#[derive(Debug, Clone, Serialize)]
pub struct PageWarning {
    pub collection: String,
    pub id: String,
    pub warning: MalformedWikilink,
}

/// Everything a build produces, before anything is written
#[derive(Debug, Clone, Serialize)]
pub struct SiteOutput {
    pub collections: BTreeMap<String, Vec<ContentEntry>>,
    pub pages: Vec<RenderedPage>,
    pub feeds: Vec<GeneratedFeed>,
    pub sitemap: Option<String>,
}

impl SiteOutput {
    pub fn entry_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    pub fn warnings(&self) -> Vec<PageWarning> {
        self.pages
            .iter()
            .flat_map(|page| {
                page.document.warnings.iter().map(|warning| PageWarning {
                    collection: page.collection.clone(),
                    id: page.id.clone(),
                    warning: warning.clone(),
                })
            })
            .collect()
    }
}

/// Main site builder
pub struct SiteBuilder {
    config: Config,
    processor: MarkdownProcessor,
}

impl SiteBuilder {
    pub fn new(config: Config) -> Self {
        let processor = MarkdownProcessor::new(config.headings.behavior);
        Self { config, processor }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load and validate every configured collection.
    ///
    /// Collections load in name order and the first failing one aborts.
    pub fn load_collections(&self) -> Result<BTreeMap<String, Vec<ContentEntry>>, BuildError> {
        let mut collections = BTreeMap::new();
        for loader in self.config.collection_loaders() {
            let entries = loader.load()?;
            collections.insert(loader.name().to_string(), entries);
        }
        Ok(collections)
    }

    /// Run the whole pipeline without touching the output directory
    pub fn build(&self) -> Result<SiteOutput, BuildError> {
        let collections = self.load_collections()?;
        let total: usize = collections.values().map(Vec::len).sum();
        tracing::info!("Loaded {} entries from {} collections", total, collections.len());

        let pages = self.render_pages(&collections);
        let feeds = self.generate_feeds(&collections)?;

        let sitemap = if self.config.enable_sitemap {
            let entries = collections.values().flatten();
            Some(generate_sitemap(
                &self.config.site.url,
                entries,
                &self.config.sitemap_date_field,
            ))
        } else {
            tracing::info!("Sitemap disabled; skipping sitemap.xml");
            None
        };

        tracing::info!("Rendered {} pages and {} feeds", pages.len(), feeds.len());

        Ok(SiteOutput {
            collections,
            pages,
            feeds,
            sitemap,
        })
    }

    /// Ids of the configured index collection, when there is one
    fn entry_index(
        &self,
        collections: &BTreeMap<String, Vec<ContentEntry>>,
    ) -> Option<HashSet<String>> {
        let name = self.config.wikilinks.index.as_ref()?;
        let entries = collections.get(name)?;
        Some(entries.iter().map(|e| e.id.clone()).collect())
    }

    fn render_pages(&self, collections: &BTreeMap<String, Vec<ContentEntry>>) -> Vec<RenderedPage> {
        let wikilinks = self.config.wikilink_config();
        let index = self.entry_index(collections);
        let mut resolver = WikilinkResolver::new(&wikilinks);
        if let Some(index) = &index {
            resolver = resolver.with_index(index);
        }

        let entries: Vec<&ContentEntry> = collections
            .values()
            .flatten()
            .filter(|entry| {
                if entry.is_draft() {
                    tracing::debug!("Skipping draft: {}/{}", entry.collection, entry.id);
                }
                !entry.is_draft()
            })
            .collect();

        let pages: Vec<RenderedPage> = entries
            .par_iter()
            .map(|entry| RenderedPage {
                collection: entry.collection.clone(),
                id: entry.id.clone(),
                permalink: entry.permalink(),
                document: self.processor.render(&entry.body, &resolver),
            })
            .collect();

        for page in &pages {
            for warning in &page.document.warnings {
                tracing::warn!("{}/{}: {}", page.collection, page.id, warning);
            }
        }

        pages
    }

    fn generate_feeds(
        &self,
        collections: &BTreeMap<String, Vec<ContentEntry>>,
    ) -> Result<Vec<GeneratedFeed>, BuildError> {
        let mut feeds = Vec::with_capacity(self.config.feeds.len());

        for feed in &self.config.feeds {
            let sources = feed
                .collections
                .iter()
                .filter_map(|name| collections.get(name))
                .flatten();
            let meta = self.config.feed_metadata(feed);
            let document = generate_feed(sources, &meta).map_err(|source| BuildError::Feed {
                output: feed.output.clone(),
                source,
            })?;
            feeds.push(GeneratedFeed {
                output: feed.output.clone(),
                document,
            });
        }

        Ok(feeds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write(base: &Path, rel: &str, content: &str) {
        let path = base.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn site(root: &Path, extra: &str) -> Config {
        let path = root.join("quire.yml");
        fs::write(
            &path,
            format!(
                "site:\n  title: Test\n  description: Desc\n  url: https://example.com\n{extra}"
            ),
        )
        .unwrap();
        Config::from_file(path).unwrap()
    }

    fn seed(root: &Path) {
        let content = root.join("src/content");
        write(
            &content,
            "blog/first.md",
            "---\ntitle: First\ndate: 2024-01-01\n---\nSee [[Tools]].\n",
        );
        write(
            &content,
            "blog/second.md",
            "---\ntitle: Second\ndate: 2024-06-01\n---\n# Intro\n\n# Intro\n",
        );
        write(&content, "blog/_template.md", "not a post");
        write(&content, "handbook/tools.md", "# Tools\n\n[[Missing|gone]] and [[]]\n");
    }

    #[test]
    fn test_build_end_to_end() {
        let dir = tempdir().unwrap();
        seed(dir.path());
        let output = SiteBuilder::new(site(dir.path(), "")).build().unwrap();

        assert_eq!(output.entry_count(), 3);
        assert_eq!(output.pages.len(), 3);

        let feed = &output.feeds[0];
        assert_eq!(feed.output, "rss.xml");
        let links: Vec<_> = feed.document.items.iter().map(|i| i.link.as_str()).collect();
        assert_eq!(
            links,
            ["https://example.com/second/", "https://example.com/first/"]
        );

        let second = output.pages.iter().find(|p| p.id == "second").unwrap();
        let slugs: Vec<_> = second.document.headings.iter().map(|h| h.slug.as_str()).collect();
        assert_eq!(slugs, ["intro", "intro-2"]);

        let warnings = output.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].id, "tools");

        let sitemap = output.sitemap.unwrap();
        assert!(sitemap.contains("<loc>https://example.com/handbook/tools/</loc>"));
    }

    #[test]
    fn test_optimistic_by_default() {
        let dir = tempdir().unwrap();
        seed(dir.path());
        let output = SiteBuilder::new(site(dir.path(), "")).build().unwrap();

        let tools = output.pages.iter().find(|p| p.id == "tools").unwrap();
        assert!(tools.document.links[0].resolved);
    }

    #[test]
    fn test_index_enables_cross_check() {
        let dir = tempdir().unwrap();
        seed(dir.path());
        let config = site(dir.path(), "wikilinks:\n  index: handbook\n");
        let output = SiteBuilder::new(config).build().unwrap();

        let first = output.pages.iter().find(|p| p.id == "first").unwrap();
        assert!(first.document.links[0].resolved);
        assert!(first.document.html.contains(r#"class="internal""#));

        let tools = output.pages.iter().find(|p| p.id == "tools").unwrap();
        assert!(!tools.document.links[0].resolved);
        assert!(tools.document.html.contains(r#"class="new">gone</a>"#));
    }

    #[test]
    fn test_invalid_entry_aborts_build() {
        let dir = tempdir().unwrap();
        seed(dir.path());
        write(&dir.path().join("src/content"), "blog/broken.md", "---\ntitle: Broken\n---\n");

        let err = SiteBuilder::new(site(dir.path(), "")).build().unwrap_err();
        assert!(matches!(
            err,
            BuildError::Collection(CollectionError::Validation { ref id, .. }) if id == "broken"
        ));
    }

    #[test]
    fn test_feed_field_missing_aborts_build() {
        let dir = tempdir().unwrap();
        seed(dir.path());
        let config = site(
            dir.path(),
            "feeds:\n  - output: handbook.xml\n    collections: [handbook]\n",
        );

        let err = SiteBuilder::new(config).build().unwrap_err();
        assert!(matches!(
            err,
            BuildError::Feed { source: FeedError::MissingFeedField { .. }, .. }
        ));
    }

    #[test]
    fn test_sitemap_lastmod_field_is_configurable() {
        let dir = tempdir().unwrap();
        seed(dir.path());
        write(
            &dir.path().join("src/content"),
            "handbook/setup.md",
            "---\ntitle: Setup\nupdated: 2024-03-05\n---\nSteps\n",
        );

        let config = site(dir.path(), "sitemap_date_field: updated\n");
        let sitemap = SiteBuilder::new(config).build().unwrap().sitemap.unwrap();

        assert!(sitemap.contains(
            "<loc>https://example.com/handbook/setup/</loc><lastmod>2024-03-05</lastmod>"
        ));
        assert!(!sitemap.contains("<lastmod>2024-01-01</lastmod>"));
    }

    #[test]
    fn test_drafts_not_rendered() {
        let dir = tempdir().unwrap();
        seed(dir.path());
        write(
            &dir.path().join("src/content"),
            "blog/wip.md",
            "---\ntitle: WIP\ndate: 2024-07-01\ndraft: true\n---\nsoon",
        );
        let output = SiteBuilder::new(site(dir.path(), "")).build().unwrap();

        assert_eq!(output.entry_count(), 4);
        assert!(output.pages.iter().all(|p| p.id != "wip"));
        assert!(output.feeds[0].document.items.iter().all(|i| i.id != "wip"));
    }
}
