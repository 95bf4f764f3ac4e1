//! Init command implementation.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

const DEFAULT_CONFIG: &str = include_str!("../../../quire.yml.example");

/// Initialize a new quire project
pub fn init_project(path: Option<&Path>) -> Result<()> {
    let root = path.unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(root).with_context(|| format!("Failed to create {:?}", root))?;

    write_config(root)?;
    scaffold_content(root)?;

    println!("✓ quire initialized in {:?}", root);
    println!("  - Edit quire.yml to customize site metadata");
    println!("  - Write posts in src/content/blog/ and pages in src/content/handbook/");
    Ok(())
}

fn write_config(root: &Path) -> Result<()> {
    let config_path = root.join("quire.yml");
    if config_path.exists() {
        println!("quire.yml already exists at {:?}", config_path);
        return Ok(());
    }

    fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {:?}", config_path))?;
    println!("Created {:?}", config_path);
    Ok(())
}

fn scaffold_content(root: &Path) -> Result<()> {
    let content = root.join("src").join("content");
    let blog = content.join("blog");
    let handbook = content.join("handbook");

    for dir in [&blog, &handbook] {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }

    write_if_missing(&blog.join("first-post.md"), SAMPLE_POST)?;
    write_if_missing(&handbook.join("getting-started.md"), SAMPLE_PAGE)?;

    Ok(())
}

fn write_if_missing(path: &Path, contents: &str) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {:?}", path))?;
    println!("Created {:?}", path);
    Ok(())
}

const SAMPLE_POST: &str = r#"---
title: First post
date: 2025-01-01
---

# Hello

This post links into the handbook: [[Getting Started|start here]].
"#;

const SAMPLE_PAGE: &str = r#"---
title: Getting Started
---

# Getting Started

Run `quire build` to render pages, `rss.xml` and `sitemap.xml` into `dist/`.

## Linking

Use `[[Page Name]]` or `[[Page Name|label]]` to link between handbook pages.
"#;
