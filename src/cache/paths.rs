//! Public API paths whose cached responses depend on a given article.

/// Site root; listings on the front page change whenever anything publishes.
pub const SITE_ROOT: &str = "/";

pub fn article_detail(article_slug: &str) -> String {
    format!("/api/articles/{article_slug}")
}

pub fn section_listing(section_slug: &str) -> String {
    format!("/api/sections/{section_slug}/articles")
}

/// Paths to evict once an article's public view changes: its detail page,
/// its section listing and the site root.
pub fn article_paths(article_slug: &str, section_slug: &str) -> Vec<String> {
    vec![
        article_detail(article_slug),
        section_listing(section_slug),
        SITE_ROOT.to_string(),
    ]
}
