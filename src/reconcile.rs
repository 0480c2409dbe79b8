//! Manifest reconciliation: chapter identity across re-ingestions.
//!
//! Both operations are pure functions from (current entries, new input) to
//! the next list of entries. Neither touches the filesystem.
//!
//! ## Chapter ids
//!
//! Ids look like `<prefix>-c<NNN>`. The prefix is derived from the book id
//! (`book-1` → `b1`, anything else → lowercase alphanumerics, `b1` when that
//! is empty). New ids are always one past the highest number in use for the
//! prefix, so an id is never handed out twice, even after the chapter it
//! named was archived.
//!
//! ## Full merge: identity by position
//!
//! A re-submitted manuscript is matched against the active entries by
//! position, not by title or content. Chapter 3 of the new parse inherits the
//! id of the third active entry, whatever it contains. Inserting or deleting
//! a chapter in the middle of a manuscript therefore shifts every later
//! identity by one; manuscripts are expected to grow at the tail.
//!
//! ```text
//! existing (active)   b1-c001  b1-c002  b1-c003
//! incoming            ch1      ch2               → c003 archived
//! incoming            ch1      ch2      ch3  ch4 → c004 allocated
//! ```
//!
//! ## Single-chapter upsert
//!
//! A chapter document either names an existing entry (by id, active or
//! archived), which is updated in place and re-activated, or is inserted as a
//! new entry at the requested order. Active orders are renumbered densely
//! afterwards.

use crate::manifest::{ChapterEntry, ChapterStatus, SourceType};
use regex::Regex;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::LazyLock;

static BOOK_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)book-([0-9]+)").expect("valid book id pattern"));
static FILENAME_CHAPTER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)b[0-9]+-c[0-9]{3}").expect("valid chapter id pattern"));

/// Fallback prefix for book ids with no usable characters.
const DEFAULT_PREFIX: &str = "b1";

/// Derive the chapter id prefix for a book.
pub fn book_prefix(book_id: &str) -> String {
    if let Some(caps) = BOOK_NUMBER.captures(book_id) {
        return format!("b{}", &caps[1]);
    }
    let compact: String = book_id
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect();
    if compact.is_empty() {
        DEFAULT_PREFIX.to_string()
    } else {
        compact
    }
}

/// Parse the number out of `<prefix>-c<digits>` (case-insensitive).
pub fn chapter_number(chapter_id: &str, prefix: &str) -> Option<u64> {
    let lowered = chapter_id.to_ascii_lowercase();
    let digits = lowered
        .strip_prefix(&prefix.to_ascii_lowercase())?
        .strip_prefix("-c")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn format_chapter_id(prefix: &str, number: u64) -> String {
    format!("{prefix}-c{number:03}")
}

/// The id following the highest one in `existing_ids` for this book.
///
/// Ids belonging to other prefixes are ignored, as are numbers too large to
/// have a successor.
pub fn next_chapter_id<I, S>(book_id: &str, existing_ids: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let prefix = book_prefix(book_id);
    let next = existing_ids
        .into_iter()
        .filter_map(|id| chapter_number(id.as_ref(), &prefix)?.checked_add(1))
        .max()
        .unwrap_or(1);
    format_chapter_id(&prefix, next)
}

/// Extract a canonical chapter id such as `b1-c013` from a document name.
pub fn parse_chapter_id_from_filename(filename: &str) -> Option<String> {
    FILENAME_CHAPTER_ID
        .find(filename)
        .map(|m| m.as_str().to_lowercase())
}

/// Hands out fresh chapter ids within one reconciliation.
///
/// Seeded with every id already in the manifest; each allocation is recorded
/// so consecutive calls never collide.
#[derive(Debug)]
pub struct ChapterIdAllocator {
    book_id: String,
    prefix: String,
    taken: HashSet<String>,
}

impl ChapterIdAllocator {
    pub fn new(book_id: &str, entries: &[ChapterEntry]) -> Self {
        Self {
            book_id: book_id.to_string(),
            prefix: book_prefix(book_id),
            taken: entries.iter().map(|e| e.chapter_id.clone()).collect(),
        }
    }

    pub fn allocate(&mut self) -> String {
        let mut candidate = next_chapter_id(&self.book_id, &self.taken);
        while self.taken.contains(&candidate) {
            let number = chapter_number(&candidate, &self.prefix).unwrap_or(0);
            candidate = format_chapter_id(&self.prefix, number.saturating_add(1));
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

/// A chapter from a fresh full-manuscript parse, reduced to what the
/// manifest records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingChapter {
    pub title: String,
    /// Position in the parse. Ignored by the merge, which uses list position.
    pub order: u32,
    pub content_hash: String,
}

/// Reconcile a full manuscript parse against the existing entries.
pub fn merge_full_update(
    book_id: &str,
    existing: &[ChapterEntry],
    incoming: &[IncomingChapter],
    source_file: &str,
    updated_at: &str,
) -> Vec<ChapterEntry> {
    let mut sorted = existing.to_vec();
    sorted.sort_by_key(|e| e.order);
    let (active, archived): (Vec<ChapterEntry>, Vec<ChapterEntry>) =
        sorted.into_iter().partition(ChapterEntry::is_active);

    let mut allocator = ChapterIdAllocator::new(book_id, existing);
    let mut next = Vec::with_capacity(incoming.len().max(active.len()) + archived.len());

    for (index, chapter) in incoming.iter().enumerate() {
        let previous = active.get(index);
        let chapter_id = match previous {
            Some(entry) => entry.chapter_id.clone(),
            None => allocator.allocate(),
        };
        let mut entry = ChapterEntry::new(
            book_id,
            &chapter_id,
            index as u32 + 1,
            &chapter.title,
            SourceType::Full,
            source_file,
            &chapter.content_hash,
            updated_at,
            ChapterStatus::Active,
        );
        if let Some(previous) = previous
            && previous.same_content(&entry)
        {
            entry.updated_at = previous.updated_at.clone();
        }
        next.push(entry);
    }

    for stale in active.into_iter().skip(incoming.len()) {
        next.push(ChapterEntry {
            status: ChapterStatus::Archived,
            updated_at: updated_at.to_string(),
            ..stale
        });
    }

    next.extend(archived);
    next.sort_by_key(|e| (e.order, !e.is_active()));
    next
}

/// A single-chapter submission.
#[derive(Debug, Clone, Copy)]
pub struct ChapterUpsert<'a> {
    /// Existing id to update, or the id to create. `None` allocates one.
    pub chapter_id: Option<&'a str>,
    pub title: &'a str,
    pub content_hash: &'a str,
    pub source_file: &'a str,
    pub updated_at: &'a str,
    /// Requested position for a new entry; appended when `None`.
    pub order: Option<u32>,
}

/// Insert or update one chapter, then renumber active orders densely.
pub fn upsert_chapter(
    book_id: &str,
    existing: &[ChapterEntry],
    upsert: &ChapterUpsert<'_>,
) -> Vec<ChapterEntry> {
    let mut entries = existing.to_vec();

    let matched = upsert
        .chapter_id
        .and_then(|id| entries.iter().position(|e| e.chapter_id == id));

    if let Some(index) = matched {
        let previous = &entries[index];
        entries[index] = ChapterEntry::new(
            book_id,
            &previous.chapter_id,
            previous.order,
            upsert.title,
            SourceType::Chapter,
            upsert.source_file,
            upsert.content_hash,
            upsert.updated_at,
            ChapterStatus::Active,
        );
        return normalize_orders(entries);
    }

    let active_count = entries.iter().filter(|e| e.is_active()).count() as u32;
    let target = upsert.order.unwrap_or(active_count + 1);
    let chapter_id = match upsert.chapter_id {
        Some(id) => id.to_string(),
        None => ChapterIdAllocator::new(book_id, &entries).allocate(),
    };

    for entry in entries.iter_mut().filter(|e| e.is_active()) {
        if entry.order >= target {
            entry.order += 1;
        }
    }
    entries.push(ChapterEntry::new(
        book_id,
        &chapter_id,
        target,
        upsert.title,
        SourceType::Chapter,
        upsert.source_file,
        upsert.content_hash,
        upsert.updated_at,
        ChapterStatus::Active,
    ));

    normalize_orders(entries)
}

/// Active entries sorted and renumbered 1..N, then archived entries by order.
pub fn normalize_orders(entries: Vec<ChapterEntry>) -> Vec<ChapterEntry> {
    let (mut active, mut archived): (Vec<ChapterEntry>, Vec<ChapterEntry>) =
        entries.into_iter().partition(ChapterEntry::is_active);
    active.sort_by_key(|e| e.order);
    archived.sort_by_key(|e| e.order);
    for (index, entry) in active.iter_mut().enumerate() {
        entry.order = index as u32 + 1;
    }
    active.extend(archived);
    active
}

/// The entry an upsert just wrote: highest order among entries carrying the
/// run's timestamp and source file.
pub fn find_upsert_target<'a>(
    entries: &'a [ChapterEntry],
    updated_at: &str,
    source_file: &str,
) -> Option<&'a ChapterEntry> {
    entries
        .iter()
        .filter(|e| e.updated_at == updated_at && e.source_file == source_file)
        .min_by_key(|e| Reverse(e.order))
}
