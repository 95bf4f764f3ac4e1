//! # quire-core
//!
//! Build-time content pipeline for a static site.
//!
//! Source documents are grouped into collections, each validated against a
//! declared schema. During rendering, `[[wikilinks]]` are rewritten into
//! anchors and headings receive unique, self-linking slugs. Validated
//! entries also feed an RSS document and a sitemap.
//!
//! Every build is a single deterministic pass: the same source tree always
//! produces the same output.

pub mod builder;
pub mod collection;
pub mod config;
pub mod feed;
pub mod frontmatter;
pub mod markdown;
pub mod models;
pub mod schema;
pub mod sitemap;
pub mod slug;

pub use builder::{BuildError, SiteBuilder, SiteOutput};
pub use collection::{CollectionError, CollectionLoader};
pub use config::Config;
pub use feed::{generate_feed, FeedDocument, FeedError, FeedItem, FeedMetadata};
pub use markdown::{
    inject_anchors, resolve, MarkdownProcessor, ResolvedLink, WikiLinkToken, WikilinkConfig,
    WikilinkResolver,
};
pub use models::{ContentEntry, Heading};
pub use schema::{validate, CollectionSchema, FieldKind, FieldSpec, Metadata, SchemaError};
pub use sitemap::generate_sitemap;
pub use slug::slugify;
