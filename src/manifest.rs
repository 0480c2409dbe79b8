//! The per-book chapter manifest.
//!
//! One JSON file per book records every chapter ever published for it, active
//! or archived. The manifest is the source of truth for chapter identity: the
//! `chapter_id` of an entry is also its URL slug, so entries are archived
//! rather than deleted.
//!
//! ## File format
//!
//! ```json
//! {
//!   "book_id": "book-1",
//!   "updated_at": "2026-02-17T12:00:00.000Z",
//!   "chapters": [
//!     { "book_id": "book-1", "chapter_id": "b1-c001", "slug": "b1-c001", "order": 1, ... }
//!   ]
//! }
//! ```
//!
//! Older manifests were a bare array of entries; those are still read.
//!
//! ## Failure policy
//!
//! Reading never fails. A missing file, a parse error, or a manifest that
//! belongs to another book all read as an empty manifest, which makes the
//! next run start fresh instead of aborting. Writing propagates errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Whether an entry is part of the public reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterStatus {
    Active,
    Archived,
}

impl fmt::Display for ChapterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChapterStatus::Active => write!(f, "active"),
            ChapterStatus::Archived => write!(f, "archived"),
        }
    }
}

/// How the entry's current content arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Split out of a full manuscript.
    Full,
    /// Submitted as a single-chapter document.
    Chapter,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Full => write!(f, "full"),
            SourceType::Chapter => write!(f, "chapter"),
        }
    }
}

/// One manifest record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterEntry {
    pub book_id: String,
    /// Stable identity, `<prefix>-c<NNN>`.
    pub chapter_id: String,
    /// Site route; always equal to `chapter_id`.
    #[serde(default)]
    pub slug: String,
    pub order: u32,
    pub title: String,
    pub source_type: SourceType,
    /// Forward-slash path of the source document, relative to the project root.
    pub source_file: String,
    /// SHA-256 hex digest of the chapter markdown.
    pub content_hash: String,
    pub updated_at: String,
    pub status: ChapterStatus,
}

impl ChapterEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        book_id: &str,
        chapter_id: &str,
        order: u32,
        title: &str,
        source_type: SourceType,
        source_file: &str,
        content_hash: &str,
        updated_at: &str,
        status: ChapterStatus,
    ) -> Self {
        Self {
            book_id: book_id.to_string(),
            chapter_id: chapter_id.to_string(),
            slug: chapter_id.to_string(),
            order,
            title: title.to_string(),
            source_type,
            source_file: source_file.to_string(),
            content_hash: content_hash.to_string(),
            updated_at: updated_at.to_string(),
            status,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ChapterStatus::Active
    }

    /// True when re-writing `other` would produce the same chapter file body
    /// and provenance (timestamps and order aside).
    pub fn same_content(&self, other: &ChapterEntry) -> bool {
        self.content_hash == other.content_hash
            && self.title == other.title
            && self.source_type == other.source_type
            && self.source_file == other.source_file
    }
}

/// On-disk manifest document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestFile {
    pub book_id: String,
    pub updated_at: String,
    pub chapters: Vec<ChapterEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredManifest {
    Legacy(Vec<ChapterEntry>),
    Current(ManifestFile),
}

/// Path of a book's manifest inside the manifests directory.
pub fn manifest_path(manifests_dir: &Path, book_id: &str) -> PathBuf {
    manifests_dir.join(format!("{book_id}.json"))
}

/// Read the entries of `book_id`'s manifest, or nothing.
pub fn read_manifest(path: &Path, book_id: &str) -> Vec<ChapterEntry> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };
    let mut entries = match serde_json::from_str::<StoredManifest>(&content) {
        Ok(StoredManifest::Legacy(entries)) => entries,
        Ok(StoredManifest::Current(manifest)) if manifest.book_id == book_id => manifest.chapters,
        Ok(StoredManifest::Current(_)) | Err(_) => return Vec::new(),
    };
    for entry in &mut entries {
        if entry.slug.is_empty() {
            entry.slug = entry.chapter_id.clone();
        }
    }
    entries
}

/// Write the manifest as pretty JSON with a trailing newline.
pub fn write_manifest(
    path: &Path,
    book_id: &str,
    entries: &[ChapterEntry],
    updated_at: &str,
) -> Result<(), ManifestError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let manifest = ManifestFile {
        book_id: book_id.to_string(),
        updated_at: updated_at.to_string(),
        chapters: entries.to_vec(),
    };
    let json = serde_json::to_string_pretty(&manifest)?;
    fs::write(path, format!("{json}\n"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::active_entry;
    use tempfile::TempDir;

    #[test]
    fn missing_file_reads_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(read_manifest(&tmp.path().join("nope.json"), "book-1").is_empty());
    }

    #[test]
    fn invalid_json_reads_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("book-1.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(read_manifest(&path, "book-1").is_empty());
    }

    #[test]
    fn roundtrip_through_disk() {
        let tmp = TempDir::new().unwrap();
        let path = manifest_path(&tmp.path().join("manifests"), "book-1");
        let entries = vec![active_entry("b1-c001", 1), active_entry("b1-c002", 2)];

        write_manifest(&path, "book-1", &entries, "2026-02-17T12:00:00.000Z").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("}\n"));
        assert!(content.contains("\"slug\": \"b1-c001\""));
        assert!(content.contains("\"status\": \"active\""));
        assert_eq!(read_manifest(&path, "book-1"), entries);
    }

    #[test]
    fn other_book_reads_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("book-1.json");
        write_manifest(&path, "book-2", &[active_entry("b1-c001", 1)], "t").unwrap();
        assert!(read_manifest(&path, "book-1").is_empty());
    }

    #[test]
    fn legacy_array_is_accepted_and_slug_filled() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("book-1.json");
        fs::write(
            &path,
            r#"[{
                "book_id": "book-1",
                "chapter_id": "b1-c001",
                "order": 1,
                "title": "开幕",
                "source_type": "full",
                "source_file": "old.docx",
                "content_hash": "h1",
                "updated_at": "2026-02-17T00:00:00.000Z",
                "status": "archived"
            }]"#,
        )
        .unwrap();

        let entries = read_manifest(&path, "book-1");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].slug, "b1-c001");
        assert_eq!(entries[0].status, ChapterStatus::Archived);
        assert!(!entries[0].is_active());
    }

    #[test]
    fn same_content_ignores_order_and_timestamp() {
        let a = active_entry("b1-c001", 1);
        let mut b = a.clone();
        b.order = 7;
        b.updated_at = "later".to_string();
        assert!(a.same_content(&b));
        b.content_hash = "other".to_string();
        assert!(!a.same_content(&b));
    }
}
