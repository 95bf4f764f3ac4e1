//! Validate collections and report wikilink diagnostics.

use anyhow::{Context, Result};
use quire_core::{builder::PageWarning, Config, SiteBuilder};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Serialize)]
struct CheckSummary<'a> {
    entries: usize,
    pages: usize,
    collections: BTreeMap<&'a str, usize>,
    feeds: Vec<FeedSummary<'a>>,
    warnings: &'a [PageWarning],
}

#[derive(Serialize)]
struct FeedSummary<'a> {
    output: &'a str,
    items: usize,
}

/// Run the whole pipeline without writing output and surface warnings.
pub fn check_site(config_path: &Path, json: bool) -> Result<()> {
    let config = Config::from_file(config_path).context("Failed to load configuration")?;
    let builder = SiteBuilder::new(config);
    let output = builder.build().context("Site failed validation")?;

    let warnings = output.warnings();
    let summary = CheckSummary {
        entries: output.entry_count(),
        pages: output.pages.len(),
        collections: output
            .collections
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.len()))
            .collect(),
        feeds: output
            .feeds
            .iter()
            .map(|feed| FeedSummary {
                output: &feed.output,
                items: feed.document.items.len(),
            })
            .collect(),
        warnings: &warnings,
    };

    if json {
        let payload = serde_json::to_string_pretty(&summary)?;
        println!("{}", payload);
    } else {
        println!(
            "Check complete: {} entries, {} pages, {} warnings",
            summary.entries,
            summary.pages,
            warnings.len()
        );
        for (name, count) in &summary.collections {
            println!("  {}: {} entries", name, count);
        }
        for feed in &summary.feeds {
            println!("  {}: {} items", feed.output, feed.items);
        }
        for warning in &warnings {
            println!(
                "- [{}/{}] {}",
                warning.collection, warning.id, warning.warning
            );
        }
    }

    Ok(())
}
