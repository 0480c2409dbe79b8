//! Shared test utilities for the novel-ingest test suite.
//!
//! Provides manifest entry builders, order assertions, and a converter that
//! writes fixture markdown instead of shelling out.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let converter = FakeConverter::new("开幕：一\n![x](media/a.png)\n")
//!     .with_media("a.png", b"png");
//!
//! let entries = vec![active_entry("b1-c001", 1), active_entry("b1-c002", 2)];
//! assert_eq!(chapter_ids(&entries), vec!["b1-c001", "b1-c002"]);
//! assert_dense_active_orders(&entries);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::convert::{ConvertError, DocumentConverter, MARKDOWN_FILENAME, MEDIA_DIRNAME};
use crate::manifest::{ChapterEntry, ChapterStatus, SourceType};

// =========================================================================
// Manifest entries
// =========================================================================

/// An active `book-1` entry from a full ingestion of `old.docx`.
pub fn active_entry(chapter_id: &str, order: u32) -> ChapterEntry {
    ChapterEntry::new(
        "book-1",
        chapter_id,
        order,
        &format!("标题 {chapter_id}"),
        SourceType::Full,
        "old.docx",
        "h",
        "2026-02-17T00:00:00.000Z",
        ChapterStatus::Active,
    )
}

/// Chapter ids in list order.
pub fn chapter_ids(entries: &[ChapterEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.chapter_id.as_str()).collect()
}

/// Assert active entries carry orders exactly 1..N, in any list position.
pub fn assert_dense_active_orders(entries: &[ChapterEntry]) {
    let mut orders: Vec<u32> = entries
        .iter()
        .filter(|e| e.is_active())
        .map(|e| e.order)
        .collect();
    orders.sort_unstable();
    let expected: Vec<u32> = (1..=orders.len() as u32).collect();
    assert_eq!(orders, expected, "active orders are not dense");
}

/// Prose long enough to make a chapter substantial on its own.
pub fn long_body(marker: &str) -> String {
    format!("{marker}{}", "这是正文。".repeat(120))
}

// =========================================================================
// Converter
// =========================================================================

/// Writes fixed markdown and media files, like a successful conversion.
pub struct FakeConverter {
    markdown: String,
    media: Vec<(PathBuf, Vec<u8>)>,
}

impl FakeConverter {
    pub fn new(markdown: &str) -> Self {
        Self {
            markdown: markdown.to_string(),
            media: Vec::new(),
        }
    }

    /// Add an extracted media file at `media/<relative>`.
    pub fn with_media(mut self, relative: &str, bytes: &[u8]) -> Self {
        self.media.push((PathBuf::from(relative), bytes.to_vec()));
        self
    }
}

impl DocumentConverter for FakeConverter {
    fn convert(&self, _source: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError> {
        let media_dir = out_dir.join(MEDIA_DIRNAME);
        for (relative, bytes) in &self.media {
            let path = media_dir.join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, bytes).unwrap();
        }
        let markdown_path = out_dir.join(MARKDOWN_FILENAME);
        fs::write(&markdown_path, &self.markdown).unwrap();
        Ok(markdown_path)
    }
}
