//! Parsing of parkrun profile pages
//!
//! The athlete's display name is the text of the first `<h2>` on the profile
//! page. Extraction sits behind [`NameExtractor`] so the scraping strategy can
//! follow upstream markup changes without touching the resolver.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h2").expect("h2 selector is valid"));
static TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("title selector is valid"));

/// Upper bound on page text included in diagnostic logs
const MAX_LOGGED_TEXT: usize = 2000;

/// Pulls an athlete's display name out of a profile page
pub trait NameExtractor: Send + Sync {
    /// Returns the display name, or `None` if the page does not contain one
    fn extract_name(&self, html: &str) -> Option<String>;
}

/// Takes the text of the first `<h2>` element, trimmed at both ends
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstHeadingExtractor;

impl NameExtractor for FirstHeadingExtractor {
    fn extract_name(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let heading = document.select(&HEADING).next()?;
        let text: String = heading.text().collect();
        let name = text.trim();

        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }
}

/// Returns the trimmed `<title>` text of a page, if it has one
pub fn page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let title = document.select(&TITLE).next()?;
    Some(collapse_whitespace(title.text()))
}

/// Visible text of a page, truncated for logging
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let text = collapse_whitespace(document.root_element().text());

    match text.char_indices().nth(MAX_LOGGED_TEXT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}

fn collapse_whitespace<'a>(pieces: impl Iterator<Item = &'a str>) -> String {
    pieces
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
