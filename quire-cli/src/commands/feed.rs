//! Print a single feed to stdout.

use anyhow::{anyhow, Context, Result};
use quire_core::{Config, SiteBuilder};
use std::path::Path;

/// Build the site in memory and print the named feed as RSS
pub fn print_feed(config_path: &Path, name: Option<&str>) -> Result<()> {
    let config = Config::from_file(config_path).context("Failed to load configuration")?;
    let output = SiteBuilder::new(config)
        .build()
        .context("Failed to build site")?;

    let feed = match name {
        Some(name) => output
            .feeds
            .iter()
            .find(|feed| feed.output == name)
            .ok_or_else(|| anyhow!("No feed named '{}' is configured", name))?,
        None => output
            .feeds
            .first()
            .ok_or_else(|| anyhow!("No feeds are configured"))?,
    };

    print!("{}", feed.document.to_rss());
    Ok(())
}
