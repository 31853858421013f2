//! Main-content text for the fallback stage.
//!
//! `readability` scores the page, keeps the best content node and cleans it;
//! html2text renders that node as plain text.

use std::io::Cursor;
use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

use crate::fetch::host_of;

/// Wrapping width handed to html2text; wide enough that paragraphs stay on
/// one line.
const RENDER_WIDTH: usize = 1_000;

/// Link wrappers and images. Link text is kept, footnote URLs and image
/// placeholders are not. Runs on html5ever's serialization, so tags are
/// well-formed.
static INLINE_NOISE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?a(?:\s[^>]*)?>|<img(?:\s[^>]*)?>").expect("valid inline noise regex")
});

static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank-line regex"));

/// Returns the readable main text of `html`, or `None` when the page has
/// none. `page_url` resolves relative links inside the extracted node.
#[must_use]
pub fn readable_text(html: &str, page_url: &Url) -> Option<String> {
    let mut cursor = Cursor::new(html.as_bytes());
    let extracted = match readability::extractor::extract(&mut cursor, page_url) {
        Ok(extracted) => extracted,
        Err(e) => {
            tracing::debug!(
                host = %host_of(page_url.as_str()),
                error = ?e,
                "readability extraction failed"
            );
            return None;
        }
    };

    let content = INLINE_NOISE_RE.replace_all(&extracted.content, "");
    let rendered = html2text::from_read(content.as_bytes(), RENDER_WIDTH).unwrap_or_default();
    let lines: Vec<&str> = rendered.lines().map(str::trim_end).collect();
    let text = BLANK_RUN_RE
        .replace_all(lines.join("\n").trim(), "\n\n")
        .into_owned();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
