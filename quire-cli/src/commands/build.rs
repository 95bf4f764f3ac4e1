//! Build command implementation.

use anyhow::{Context, Result};
use quire_core::{builder::RenderedPage, Config, SiteBuilder, SiteOutput};
use std::fs;
use std::path::Path;

/// Build the static site and write pages, feeds and the sitemap
pub fn build_site(config_path: &Path) -> Result<()> {
    tracing::info!("Loading config from {:?}", config_path);
    let config = Config::from_file(config_path).context("Failed to load configuration")?;

    tracing::info!("Building site: {}", config.site.title);
    let builder = SiteBuilder::new(config.clone());
    let output = builder.build().context("Failed to build site")?;

    tracing::info!(
        "Loaded {} entries, rendered {} pages",
        output.entry_count(),
        output.pages.len()
    );

    write_output(&config, &output)?;

    println!("✓ Site built in {:?}", config.output_dir());
    Ok(())
}

/// Write a finished build to the configured output directory
pub fn write_output(config: &Config, output: &SiteOutput) -> Result<()> {
    let output_dir = config.output_dir();
    fs::create_dir_all(&output_dir).context("Failed to create output directory")?;

    for page in &output.pages {
        write_page(config, &output_dir, page)?;
    }

    for feed in &output.feeds {
        let path = output_dir.join(&feed.output);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, feed.document.to_rss())
            .with_context(|| format!("Failed to write {:?}", path))?;
        tracing::info!("Generated {} ({} items)", feed.output, feed.document.items.len());
    }

    if let Some(sitemap) = &output.sitemap {
        let path = output_dir.join("sitemap.xml");
        fs::write(&path, sitemap).with_context(|| format!("Failed to write {:?}", path))?;
        tracing::info!("Generated sitemap.xml");
    } else {
        tracing::info!("Sitemap disabled; skipping sitemap.xml");
    }

    Ok(())
}

fn write_page(config: &Config, output_dir: &Path, page: &RenderedPage) -> Result<()> {
    let dir = output_dir.join(page.permalink.trim_matches('/'));
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {:?}", dir))?;

    let title = page
        .document
        .headings
        .first()
        .map(|heading| heading.text.as_str())
        .unwrap_or(page.id.as_str());

    let html = format!(
        "<!doctype html>\n<html lang=\"{lang}\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title} | {site}</title>\n</head>\n<body>\n<main>\n{body}</main>\n</body>\n</html>\n",
        lang = escape_html(&config.site.language),
        title = escape_html(title),
        site = escape_html(&config.site.title),
        body = page.document.html,
    );

    let path = dir.join("index.html");
    fs::write(&path, html).with_context(|| format!("Failed to write {:?}", path))?;
    tracing::debug!("Wrote {}", page.permalink);
    Ok(())
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
