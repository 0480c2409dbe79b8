//! # Novel Ingest
//!
//! Turns a manuscript exported from a word processor into the chapter
//! content of a static web-novel site. A `.docx` goes in; per-chapter
//! markdown files with frontmatter, copied images, and a per-book manifest
//! come out.
//!
//! # Architecture: Convert, Split, Reconcile, Write
//!
//! ```text
//! 1. Convert    book.docx  →  document.md + media/     (external converter)
//! 2. Split      markdown   →  chapters                  (act headings, TOC suppressed)
//! 3. Reconcile  chapters   →  manifest entries          (stable ids across runs)
//! 4. Write      entries    →  chapter files, images, manifest, book meta
//! ```
//!
//! Splitting and reconciliation are pure functions over strings and entry
//! lists, so nearly all of the interesting behavior is tested without
//! touching the filesystem or running a converter.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`heading`] | Recognises act headings (`开幕：…`, `第二幕：…`) and normalizes titles |
//! | [`split`] | Cuts markdown into ordered chapters, dropping a leading table of contents |
//! | [`media`] | Resolves, extracts, and rewrites references to extracted images |
//! | [`manifest`] | Chapter entries and the per-book JSON manifest on disk |
//! | [`reconcile`] | Id allocation, full-manuscript merge, single-chapter upsert |
//! | [`frontmatter`] | Frontmatter for chapter and book content files |
//! | [`excerpt`] | Plain-text chapter excerpts |
//! | [`convert`] | The converter seam and the `pandoc` implementation |
//! | [`config`] | `ingest.toml` loading, validation, and merging over stock defaults |
//! | [`ingest`] | Orchestrates one run: full manuscript or single chapter |
//! | [`output`] | CLI output formatting for run reports |
//!
//! # Design Decisions
//!
//! ## Identity by Position
//!
//! A re-submitted manuscript keeps chapter ids by position: the third chapter
//! of the new document is `b1-c003` if `b1-c003` was the third active chapter
//! before. Titles change during editing far more often than chapter order, and
//! the site's URLs are built from ids. Chapters dropped from the tail are
//! archived, never deleted from the manifest, and their ids are never reused.
//!
//! ## Idempotent Runs
//!
//! Content is hashed with SHA-256. Chapters whose hash, title, and source are
//! unchanged keep their `updated_at` and are not rewritten, so re-running an
//! ingestion on the same document changes nothing.
//!
//! ## External Converter
//!
//! Word documents are converted by `pandoc`, behind the
//! [`convert::DocumentConverter`] trait. The rest of the pipeline only sees a
//! markdown file and a `media/` directory, which keeps tests converter-free.

pub mod config;
pub mod convert;
pub mod excerpt;
pub mod frontmatter;
pub mod heading;
pub mod ingest;
pub mod manifest;
pub mod media;
pub mod output;
pub mod reconcile;
pub mod split;

#[cfg(test)]
pub(crate) mod test_helpers;
