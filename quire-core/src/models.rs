//! Build-scoped value types shared across the pipeline.

use crate::schema::Metadata;
use serde::Serialize;
use std::path::PathBuf;

/// One published document of a collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentEntry {
    /// Path relative to the collection base, extension stripped, `/`-separated
    pub id: String,

    /// Name of the owning collection (e.g. "blog", "handbook")
    pub collection: String,

    /// Route prefix the collection is published under ("" for the site root)
    pub route: String,

    /// Validated front matter
    pub metadata: Metadata,

    /// Markdown body without front matter
    pub body: String,

    pub source_path: PathBuf,
}

impl ContentEntry {
    /// Site-relative URL path, always with leading and trailing slash
    pub fn permalink(&self) -> String {
        let route = self.route.trim_matches('/');
        if route.is_empty() {
            format!("/{}/", self.id)
        } else {
            format!("/{}/{}/", route, self.id)
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.get_str("title")
    }

    /// Entries with `draft: true` are loaded and validated but never published
    pub fn is_draft(&self) -> bool {
        self.metadata.get_bool("draft").unwrap_or(false)
    }
}

/// A document heading with its assigned anchor slug
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub slug: String,
}
