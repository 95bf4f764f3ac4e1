//! Collection loading: discover files, derive ids, validate front matter.

use crate::frontmatter::{parse_frontmatter, FrontmatterError};
use crate::models::ContentEntry;
use crate::schema::{CollectionSchema, SchemaError};
use globset::{GlobBuilder, GlobMatcher};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("Collection `{collection}`: base directory {path:?} does not exist")]
    MissingBase { collection: String, path: PathBuf },

    #[error("Collection `{collection}`: invalid glob pattern '{pattern}': {source}")]
    Pattern {
        collection: String,
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Collection `{collection}`: failed to walk source tree: {source}")]
    Walk {
        collection: String,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Collection `{collection}`: entry `{id}` has unreadable front matter: {source}")]
    Frontmatter {
        collection: String,
        id: String,
        #[source]
        source: FrontmatterError,
    },

    /// First schema failure encountered while loading a collection
    #[error("Collection `{collection}`: entry `{id}` failed validation: {source}")]
    Validation {
        collection: String,
        id: String,
        #[source]
        source: SchemaError,
    },

    #[error("Collection `{collection}`: id `{id}` is produced by both {first:?} and {second:?}")]
    DuplicateId {
        collection: String,
        id: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Loads one named collection from a directory tree.
#[derive(Debug, Clone)]
pub struct CollectionLoader {
    name: String,
    base: PathBuf,
    pattern: String,
    route: String,
    schema: CollectionSchema,
}

impl CollectionLoader {
    pub fn new(
        name: impl Into<String>,
        base: impl Into<PathBuf>,
        pattern: impl Into<String>,
        schema: CollectionSchema,
    ) -> Self {
        Self {
            name: name.into(),
            base: base.into(),
            pattern: pattern.into(),
            route: String::new(),
            schema,
        }
    }

    /// Set the URL prefix entries of this collection are published under
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = route.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Load and validate every matching file.
    ///
    /// Files are read and validated in parallel; the result is sorted by id.
    /// Any failure aborts the whole collection, and when several files fail
    /// the one that sorts first by path is reported.
    pub fn load(&self) -> Result<Vec<ContentEntry>, CollectionError> {
        let files = self.discover()?;
        tracing::debug!(
            "Collection `{}`: {} files match '{}'",
            self.name,
            files.len(),
            self.pattern
        );

        let results: Vec<Result<ContentEntry, CollectionError>> = files
            .par_iter()
            .map(|(path, rel)| self.load_entry(path, rel))
            .collect();

        let mut entries = Vec::with_capacity(results.len());
        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        for result in results {
            let entry = result?;
            if let Some(first) = seen.get(&entry.id) {
                return Err(CollectionError::DuplicateId {
                    collection: self.name.clone(),
                    id: entry.id.clone(),
                    first: first.clone(),
                    second: entry.source_path.clone(),
                });
            }
            seen.insert(entry.id.clone(), entry.source_path.clone());
            entries.push(entry);
        }

        entries.sort_by(|a, b| a.id.cmp(&b.id));
        tracing::info!("Loaded {} entries into `{}`", entries.len(), self.name);
        Ok(entries)
    }

    /// Matching files as (absolute path, `/`-separated relative path), sorted by relative path
    fn discover(&self) -> Result<Vec<(PathBuf, String)>, CollectionError> {
        if !self.base.is_dir() {
            return Err(CollectionError::MissingBase {
                collection: self.name.clone(),
                path: self.base.clone(),
            });
        }

        let matcher = self.matcher()?;
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.base).sort_by_file_name() {
            let entry = entry.map_err(|source| CollectionError::Walk {
                collection: self.name.clone(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(rel) = entry.path().strip_prefix(&self.base) else {
                continue;
            };
            let rel = normalize_separators(rel);
            if matcher.is_match(&rel) {
                files.push((entry.path().to_path_buf(), rel));
            } else {
                tracing::debug!("Collection `{}`: skipping {}", self.name, rel);
            }
        }

        files.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(files)
    }

    fn matcher(&self) -> Result<GlobMatcher, CollectionError> {
        // `[^...]` is accepted as a synonym for `[!...]`
        let pattern = self.pattern.replace("[^", "[!");
        GlobBuilder::new(&pattern)
            .literal_separator(true)
            .build()
            .map(|glob| glob.compile_matcher())
            .map_err(|source| CollectionError::Pattern {
                collection: self.name.clone(),
                pattern: self.pattern.clone(),
                source,
            })
    }

    fn load_entry(&self, path: &Path, rel: &str) -> Result<ContentEntry, CollectionError> {
        let id = entry_id(rel);
        let content = fs::read_to_string(path).map_err(|source| CollectionError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let (raw, body) =
            parse_frontmatter(&content).map_err(|source| CollectionError::Frontmatter {
                collection: self.name.clone(),
                id: id.clone(),
                source,
            })?;

        let metadata = self
            .schema
            .validate(&raw)
            .map_err(|source| CollectionError::Validation {
                collection: self.name.clone(),
                id: id.clone(),
                source,
            })?;

        Ok(ContentEntry {
            id,
            collection: self.name.clone(),
            route: self.route.clone(),
            metadata,
            body,
            source_path: path.to_path_buf(),
        })
    }
}

/// Derive an entry id from a `/`-separated relative path by dropping the extension.
///
/// ```
/// use quire_core::collection::entry_id;
///
/// assert_eq!(entry_id("guides/setup.md"), "guides/setup");
/// assert_eq!(entry_id("notes.v2.md"), "notes.v2");
/// ```
pub fn entry_id(rel: &str) -> String {
    let (dir, file) = match rel.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, rel),
    };
    let stem = match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file,
    };
    match dir {
        Some(dir) => format!("{dir}/{stem}"),
        None => stem.to_string(),
    }
}

fn normalize_separators(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
