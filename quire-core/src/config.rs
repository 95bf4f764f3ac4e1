//! Configuration parsing and management.

use crate::collection::CollectionLoader;
use crate::feed::FeedMetadata;
use crate::markdown::headings::AnchorBehavior;
use crate::markdown::wikilinks::{PathTemplate, ResolutionMode, SlugPolicy, WikilinkConfig};
use crate::schema::{CollectionSchema, FieldKind, FieldSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct matching the quire.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub site: SiteConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default = "default_collections")]
    pub collections: BTreeMap<String, CollectionConfig>,

    #[serde(default)]
    pub wikilinks: WikilinkSettings,

    #[serde(default)]
    pub headings: HeadingSettings,

    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedConfig>,

    #[serde(default = "default_true")]
    pub enable_sitemap: bool,

    /// Front matter field the sitemap reads `lastmod` from
    #[serde(default = "default_date_field")]
    pub sitemap_date_field: String,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub title: String,
    pub description: String,
    /// Absolute origin, e.g. `https://example.com`
    pub url: String,

    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    String::from("en-us")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_content_dir")]
    pub content: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output: PathBuf,
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("src/content")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            content: default_content_dir(),
            output: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Defaults to `<paths.content>/<collection name>`
    #[serde(default)]
    pub base: Option<PathBuf>,

    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// URL prefix for entry permalinks ("" publishes at the site root)
    #[serde(default)]
    pub route: String,

    #[serde(default)]
    pub schema: CollectionSchema,
}

fn default_pattern() -> String {
    String::from("**/*.md")
}

fn default_collections() -> BTreeMap<String, CollectionConfig> {
    let blog = CollectionConfig {
        base: None,
        pattern: String::from("**/[^_]*.md"),
        route: String::new(),
        schema: CollectionSchema::new()
            .field("title", FieldSpec::required(FieldKind::String))
            .field("date", FieldSpec::required(FieldKind::Date)),
    };
    let handbook = CollectionConfig {
        base: None,
        pattern: default_pattern(),
        route: String::from("handbook"),
        schema: CollectionSchema::new().field("title", FieldSpec::optional(FieldKind::String)),
    };
    BTreeMap::from([
        (String::from("blog"), blog),
        (String::from("handbook"), handbook),
    ])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikilinkSettings {
    #[serde(default = "default_href_template")]
    pub href_template: String,

    #[serde(default)]
    pub page_resolver: SlugPolicy,

    #[serde(default = "default_class_name")]
    pub class_name: String,

    #[serde(default = "default_new_class_name")]
    pub new_class_name: String,

    #[serde(default = "default_alias_divider")]
    pub alias_divider: String,

    #[serde(default)]
    pub resolution: ResolutionMode,

    /// Collection whose entry ids form the cross-check index
    #[serde(default)]
    pub index: Option<String>,
}

fn default_href_template() -> String {
    String::from("/handbook/{permalink}")
}

fn default_class_name() -> String {
    String::from("internal")
}

fn default_new_class_name() -> String {
    String::from("new")
}

fn default_alias_divider() -> String {
    String::from("|")
}

impl Default for WikilinkSettings {
    fn default() -> Self {
        Self {
            href_template: default_href_template(),
            page_resolver: SlugPolicy::default(),
            class_name: default_class_name(),
            new_class_name: default_new_class_name(),
            alias_divider: default_alias_divider(),
            resolution: ResolutionMode::default(),
            index: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeadingSettings {
    #[serde(default)]
    pub behavior: AnchorBehavior,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Output file name relative to the output directory
    #[serde(default = "default_feed_output")]
    pub output: String,

    #[serde(default = "default_feed_collections")]
    pub collections: Vec<String>,

    /// Falls back to `site.title`
    #[serde(default)]
    pub title: Option<String>,

    /// Falls back to `site.description`
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default = "default_title_field")]
    pub title_field: String,

    #[serde(default = "default_date_field")]
    pub date_field: String,
}

fn default_feed_output() -> String {
    String::from("rss.xml")
}

fn default_feed_collections() -> Vec<String> {
    vec![String::from("blog")]
}

fn default_title_field() -> String {
    String::from("title")
}

fn default_date_field() -> String {
    String::from("date")
}

fn default_feeds() -> Vec<FeedConfig> {
    vec![FeedConfig {
        output: default_feed_output(),
        collections: default_feed_collections(),
        title: None,
        description: None,
        title_field: default_title_field(),
        date_field: default_date_field(),
    }]
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Parse and check configuration from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.check()?;
        Ok(config)
    }

    /// Cross-field consistency checks
    pub fn check(&self) -> Result<(), ConfigError> {
        for feed in &self.feeds {
            if feed.collections.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "feed '{}' has no source collections",
                    feed.output
                )));
            }
            for name in &feed.collections {
                if !self.collections.contains_key(name) {
                    return Err(ConfigError::Invalid(format!(
                        "feed '{}' references unknown collection '{}'",
                        feed.output, name
                    )));
                }
            }
        }

        match (&self.wikilinks.index, self.wikilinks.resolution) {
            (Some(name), _) if !self.collections.contains_key(name) => {
                Err(ConfigError::Invalid(format!(
                    "wikilinks.index references unknown collection '{}'",
                    name
                )))
            }
            (None, ResolutionMode::Strict) => Err(ConfigError::Invalid(
                "strict wikilink resolution requires wikilinks.index".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Get the content root, resolved relative to config file
    pub fn content_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.content)
    }

    /// Get the output directory, resolved relative to config file
    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.output)
    }

    /// One loader per configured collection, in name order
    pub fn collection_loaders(&self) -> Vec<CollectionLoader> {
        self.collections
            .iter()
            .map(|(name, collection)| {
                let base = match &collection.base {
                    Some(base) => self.resolve_path(base),
                    None => self.content_dir().join(name),
                };
                CollectionLoader::new(
                    name.clone(),
                    base,
                    collection.pattern.clone(),
                    collection.schema.clone(),
                )
                .with_route(collection.route.clone())
            })
            .collect()
    }

    /// Resolver configuration built from the `wikilinks` section
    pub fn wikilink_config(&self) -> WikilinkConfig {
        let settings = &self.wikilinks;
        WikilinkConfig {
            page_resolver: Arc::new(settings.page_resolver),
            href_template: Arc::new(PathTemplate::new(settings.href_template.clone())),
            alias_divider: settings.alias_divider.clone(),
            resolved_class: settings.class_name.clone(),
            unresolved_class: settings.new_class_name.clone(),
            mode: settings.resolution,
        }
    }

    /// Channel metadata for one configured feed
    pub fn feed_metadata(&self, feed: &FeedConfig) -> FeedMetadata {
        let mut meta = FeedMetadata::new(
            feed.title.clone().unwrap_or_else(|| self.site.title.clone()),
            feed.description
                .clone()
                .unwrap_or_else(|| self.site.description.clone()),
            self.site.url.clone(),
        )
        .with_language(self.site.language.clone());
        meta.title_field = feed.title_field.clone();
        meta.date_field = feed.date_field.clone();
        meta
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(config_path) = &self.config_path {
            if let Some(parent) = config_path.parent() {
                parent.join(path)
            } else {
                path.to_path_buf()
            }
        } else {
            path.to_path_buf()
        }
    }
}
