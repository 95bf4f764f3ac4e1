//! sitemap.xml generation for published entries.

use crate::feed::escape_xml;
use crate::models::ContentEntry;

/// Build a sitemaps.org `urlset` for every non-draft entry.
///
/// URLs are sorted so the output is stable across builds; `lastmod` comes
/// from `date_field` when the entry has one.
pub fn generate_sitemap<'a, I>(site_origin: &str, entries: I, date_field: &str) -> String
where
    I: IntoIterator<Item = &'a ContentEntry>,
{
    let origin = site_origin.trim_end_matches('/');

    let mut urls: Vec<(String, Option<String>)> = entries
        .into_iter()
        .filter(|e| !e.is_draft())
        .map(|e| {
            let loc = format!("{}{}", origin, e.permalink());
            let lastmod = e
                .metadata
                .get_date(date_field)
                .map(|d| d.format("%Y-%m-%d").to_string());
            (loc, lastmod)
        })
        .collect();
    urls.sort();
    urls.dedup_by(|a, b| a.0 == b.0);

    let mut body = String::new();
    for (loc, lastmod) in &urls {
        body.push_str("  <url>");
        body.push_str(&format!("<loc>{}</loc>", escape_xml(loc)));
        if let Some(date) = lastmod {
            body.push_str(&format!("<lastmod>{}</lastmod>", date));
        }
        body.push_str("</url>\n");
    }

    tracing::debug!("Sitemap lists {} urls", urls.len());

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
{}</urlset>
"#,
        body
    )
}
