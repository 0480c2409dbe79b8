//! Frontmatter for chapter and book content files.
//!
//! The site's content collections read a `---` delimited block of
//! `key: value` lines. Free-text values (titles, paths, timestamps) are
//! JSON-quoted so quotes, colons and CJK punctuation survive YAML parsing;
//! ids, hashes, orders and enum values are written bare.

use crate::manifest::ChapterEntry;

fn quoted(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Frontmatter block for a chapter file. Every manifest field except `slug`.
pub fn chapter_frontmatter(entry: &ChapterEntry) -> String {
    [
        "---".to_string(),
        format!("book_id: {}", entry.book_id),
        format!("chapter_id: {}", entry.chapter_id),
        format!("order: {}", entry.order),
        format!("title: {}", quoted(&entry.title)),
        format!("source_type: {}", entry.source_type),
        format!("source_file: {}", quoted(&entry.source_file)),
        format!("content_hash: {}", entry.content_hash),
        format!("updated_at: {}", quoted(&entry.updated_at)),
        format!("status: {}", entry.status),
        "---".to_string(),
        String::new(),
    ]
    .join("\n")
}

/// Complete chapter file: frontmatter followed by the trimmed body.
pub fn chapter_document(entry: &ChapterEntry, body: &str) -> String {
    format!("{}{}\n", chapter_frontmatter(entry), body.trim())
}

/// Book metadata file (frontmatter only).
pub fn book_meta_document(book_id: &str, title: &str, updated_at: &str) -> String {
    [
        "---".to_string(),
        format!("book_id: {book_id}"),
        format!("title: {}", quoted(title)),
        format!("updated_at: {}", quoted(updated_at)),
        "---".to_string(),
        String::new(),
    ]
    .join("\n")
}
