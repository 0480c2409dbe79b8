//! Embedded media references.
//!
//! The converter extracts images into `<workdir>/media/` and leaves
//! references to them in the markdown, in whatever shape the source document
//! used: relative (`media/image1.png`), absolute temp paths
//! (`C:\Users\...\Temp\novel-ingest-x\media\image1.png`), or `file://` URIs.
//! This module maps all of those to a path relative to the media root, finds
//! them in chapter content, and rewrites them to site-served web paths.
//!
//! | Reference | Resolves to |
//! |---|---|
//! | `media/image28.png` | `image28.png` |
//! | `C:\Temp\x\media\image28.png` | `image28.png` |
//! | `file:///tmp/x/media/sub/a%20b.png` | `sub/a b.png` |
//! | `https://example.com/a.png` | not resolvable |
//! | `data:image/png;base64,...` | not resolvable |
//! | `media/../secret.png` | not resolvable |

use percent_encoding::percent_decode_str;
use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::LazyLock;

static URI_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z][a-z0-9+.-]*://").expect("valid scheme pattern"));
static FILE_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^file://").expect("valid file scheme pattern"));
static FILE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^file:/+").expect("valid file prefix pattern"));
static DIRECT_MEDIA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^media/(.+)$").expect("valid media pattern"));
static HTML_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"src=(?:"([^"]+)"|'([^']+)')"#).expect("valid src attribute pattern")
});
static MARKDOWN_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*]\(([^)]+)\)").expect("valid image pattern"));

const MEDIA_MARKER: &str = "/media/";

/// Resolve a raw reference to a path relative to the extracted media root.
///
/// Returns `None` for inline data, remote URLs, references outside a `media`
/// directory, and anything that would escape it.
pub fn resolve_media_relative_path(reference: &str) -> Option<String> {
    let raw = reference.trim();
    if raw.is_empty() || raw.get(..5).is_some_and(|s| s.eq_ignore_ascii_case("data:")) {
        return None;
    }
    if URI_SCHEME.is_match(raw) && !FILE_SCHEME.is_match(raw) {
        return None;
    }

    let without_scheme = FILE_PREFIX.replace(raw, "");
    let normalized = percent_decode_strict(&without_scheme).replace('\\', "/");

    if let Some(caps) = DIRECT_MEDIA.captures(&normalized) {
        return sanitize_relative_path(&caps[1]);
    }

    // ASCII lowercasing keeps byte offsets aligned with `normalized`.
    let marker_at = normalized.to_ascii_lowercase().rfind(MEDIA_MARKER)?;
    sanitize_relative_path(&normalized[marker_at + MEDIA_MARKER.len()..])
}

/// Percent-decode `raw`, or return it untouched when any escape is malformed
/// or the decoded bytes are not UTF-8.
fn percent_decode_strict(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let well_formed = bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'%')
        .all(|(i, _)| {
            bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
        });
    if !well_formed {
        return raw.to_string();
    }
    match percent_decode_str(raw).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

fn sanitize_relative_path(path: &str) -> Option<String> {
    let without_query = path.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = without_query
        .trim_start_matches('/')
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() || segments.iter().any(|s| *s == "." || *s == "..") {
        return None;
    }
    Some(segments.join("/"))
}

/// Byte range of a markdown image destination within the parenthesized
/// part: `<...>` contents, or the first token (anything after it is an
/// optional title).
fn markdown_destination_range(raw: &str) -> Range<usize> {
    let lead = raw.len() - raw.trim_start().len();
    let trimmed = raw.trim();
    if let Some(inner) = trimmed
        .strip_prefix('<')
        .and_then(|s| s.split_once('>'))
        .map(|(inner, _)| inner)
    {
        let start = lead + 1 + (inner.len() - inner.trim_start().len());
        return start..start + inner.trim().len();
    }
    let token = trimmed.split_whitespace().next().unwrap_or_default();
    lead..lead + token.len()
}

fn markdown_destination(raw: &str) -> &str {
    &raw[markdown_destination_range(raw)]
}

/// Find every resolvable media reference in `content`.
///
/// HTML `src` attributes are scanned first, then markdown images. The
/// iterator is lazy, yields each trimmed reference once in first-seen order,
/// and silently skips references that do not resolve.
pub fn extract_media_refs(content: &str) -> impl Iterator<Item = String> + '_ {
    let html = HTML_SRC
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str());
    let markdown = MARKDOWN_IMAGE
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| markdown_destination(m.as_str()));

    let mut seen = HashSet::new();
    html.chain(markdown).filter_map(move |raw| {
        let reference = raw.trim();
        if reference.is_empty() || seen.contains(reference) {
            return None;
        }
        resolve_media_relative_path(reference)?;
        seen.insert(reference.to_string());
        Some(reference.to_string())
    })
}

/// True when the content embeds base64 image data.
pub fn contains_inline_image(content: &str) -> bool {
    content.contains("data:image")
}

/// Replace each original reference with its web path.
///
/// Only the positions [`extract_media_refs`] reads are touched: quoted `src`
/// attribute values and markdown image destinations. Angle brackets and
/// image titles around a destination are kept.
pub fn rewrite_media_refs(content: &str, replacements: &[(String, String)]) -> String {
    let lookup: HashMap<&str, &str> = replacements
        .iter()
        .map(|(old, new)| (old.as_str(), new.as_str()))
        .collect();

    let html = HTML_SRC.replace_all(content, |caps: &Captures| {
        let value = caps.get(1).or_else(|| caps.get(2));
        splice_match(caps, value.map(|m| m.range()), &lookup)
    });
    MARKDOWN_IMAGE
        .replace_all(&html, |caps: &Captures| {
            let destination = caps.get(1).map(|m| {
                let range = markdown_destination_range(m.as_str());
                m.start() + range.start..m.start() + range.end
            });
            splice_match(caps, destination, &lookup)
        })
        .into_owned()
}

/// The whole match with `span` (absolute offsets) swapped for its
/// replacement, or the match unchanged when there is none.
fn splice_match(caps: &Captures, span: Option<Range<usize>>, lookup: &HashMap<&str, &str>) -> String {
    let whole = caps.get(0).map_or("", |m| m.as_str());
    let offset = caps.get(0).map_or(0, |m| m.start());
    let Some(span) = span else {
        return whole.to_string();
    };
    let local = span.start - offset..span.end - offset;
    match lookup.get(whole[local.clone()].trim()) {
        Some(new) => format!("{}{}{}", &whole[..local.start], new, &whole[local.end..]),
        None => whole.to_string(),
    }
}
