//! Ingestion runs: one document in, chapter files and a manifest out.
//!
//! ## Full ingestion
//!
//! ```text
//! book.docx ──convert──▶ document.md + media/
//!           ──split────▶ chapters (TOC suppressed)
//!           ──merge────▶ manifest (ids kept by position)
//!           ──write────▶ src/content/chapters/<book>/<id>.md   (changed chapters only)
//!                        public/images/<book>/<id>/...          (media copied, refs rewritten)
//!           ──cleanup──▶ stale chapter files and media dirs removed, preview mirrored
//! ```
//!
//! ## Chapter ingestion
//!
//! A single-chapter document updates (or inserts) one manifest entry. The
//! target id comes from `--chapter-id`, then from a canonical id in the file
//! name (`chapter-b1-c013-v2.docx`), and is otherwise freshly allocated.
//!
//! ## Failure policy
//!
//! Validation errors, converter failures and missing media abort the run.
//! Cleanup steps (stale files, preview mirror, legacy book files) are
//! best-effort and never fail a run; each lives in its own helper that
//! swallows its own errors so a real failure elsewhere is never masked.
//! There is no rollback: an aborted run may leave partial output.

use crate::config::IngestConfig;
use crate::convert::{ConvertError, DocumentConverter, MEDIA_DIRNAME};
use crate::excerpt::{DEFAULT_EXCERPT_FALLBACK, create_excerpt};
use crate::frontmatter::{book_meta_document, chapter_document};
use crate::manifest::{ChapterEntry, ManifestError, manifest_path, read_manifest, write_manifest};
use crate::media::{contains_inline_image, extract_media_refs, resolve_media_relative_path, rewrite_media_refs};
use crate::reconcile::{
    ChapterUpsert, IncomingChapter, find_upsert_target, merge_full_update,
    parse_chapter_id_from_filename, upsert_chapter,
};
use crate::split::{ParsedChapter, split_full_markdown_into_chapters};
use chrono::{SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use walkdir::WalkDir;

/// Characters of chapter prose shown in the run report.
const REPORT_EXCERPT_CHARS: usize = 60;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error("Input must be a .docx file: {}", .0.display())]
    NotDocx(PathBuf),
    #[error("No chapters were detected in full ingestion mode.")]
    NoChapters,
    #[error("Found inline base64 images in chapter {0}. Inline images are not allowed.")]
    InlineImage(String),
    #[error("Missing extracted media file: {}", .0.display())]
    MissingMedia(PathBuf),
    #[error("Failed to resolve target chapter entry after upsert.")]
    TargetNotResolved,
}

/// What kind of document is being ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    /// A complete manuscript, split into chapters.
    Full,
    /// A single chapter.
    Chapter,
}

impl fmt::Display for IngestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestMode::Full => write!(f, "full"),
            IngestMode::Chapter => write!(f, "chapter"),
        }
    }
}

impl FromStr for IngestMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(IngestMode::Full),
            "chapter" => Ok(IngestMode::Chapter),
            other => Err(format!("unknown mode '{other}'")),
        }
    }
}

/// One ingestion run's inputs.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub mode: IngestMode,
    pub input_file: PathBuf,
    pub book_id: String,
    /// Full mode: ignore the existing manifest.
    pub reset: bool,
    /// Chapter mode: explicit target id.
    pub chapter_id: Option<String>,
    /// Chapter mode: position for a new chapter.
    pub order: Option<u32>,
}

/// Read a `--order` value the way `parseInt` does: leading whitespace, an
/// optional sign, then as many digits as there are. Negative positions clamp
/// to the front, oversized ones to the end; no digits means "append".
pub fn parse_order(raw: &str) -> Option<u32> {
    let trimmed = raw.trim_start();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_len = unsigned.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    if negative {
        return Some(0);
    }
    let value = unsigned[..digits_len].parse::<u32>().unwrap_or(u32::MAX);
    Some(value)
}

/// A chapter file written by the run.
#[derive(Debug, Clone)]
pub struct WrittenChapter {
    pub entry: ChapterEntry,
    /// Relative to the project root.
    pub file: PathBuf,
    pub excerpt: String,
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub mode: IngestMode,
    pub book_id: String,
    pub written: Vec<WrittenChapter>,
    pub unchanged: Vec<ChapterEntry>,
    pub archived: Vec<ChapterEntry>,
    pub removed_files: usize,
    /// Relative to the project root.
    pub manifest_path: PathBuf,
}

/// Resolved on-disk locations for one book.
#[derive(Debug, Clone)]
struct BookLayout {
    chapters_dir: PathBuf,
    books_dir: PathBuf,
    manifest_path: PathBuf,
    public_images_dir: PathBuf,
    preview_images_dir: PathBuf,
    web_root: String,
    book_id: String,
}

impl BookLayout {
    fn new(root: &Path, config: &IngestConfig, book_id: &str) -> Self {
        let paths = &config.paths;
        Self {
            chapters_dir: root.join(&paths.chapters_dir).join(book_id),
            books_dir: root.join(&paths.books_dir),
            manifest_path: manifest_path(&root.join(&paths.manifests_dir), book_id),
            public_images_dir: root.join(&paths.public_images_dir).join(book_id),
            preview_images_dir: root.join(&paths.preview_images_dir).join(book_id),
            web_root: paths.web_root.trim_end_matches('/').to_string(),
            book_id: book_id.to_string(),
        }
    }

    fn chapter_file(&self, chapter_id: &str) -> PathBuf {
        self.chapters_dir.join(format!("{chapter_id}.md"))
    }

    fn chapter_media_dir(&self, chapter_id: &str) -> PathBuf {
        self.public_images_dir.join(chapter_id)
    }

    fn web_path(&self, chapter_id: &str, relative: &str) -> String {
        format!("{}/{}/{}/{}", self.web_root, self.book_id, chapter_id, relative)
    }
}

/// Drives ingestion runs against one project root.
pub struct Ingestor<'a, C: DocumentConverter> {
    project_root: &'a Path,
    config: &'a IngestConfig,
    converter: &'a C,
}

impl<'a, C: DocumentConverter> Ingestor<'a, C> {
    pub fn new(project_root: &'a Path, config: &'a IngestConfig, converter: &'a C) -> Self {
        Self {
            project_root,
            config,
            converter,
        }
    }

    /// Convert the request's document and ingest it.
    pub fn run(&self, request: &IngestRequest) -> Result<IngestReport, IngestError> {
        let input_file = self.project_root.join(&request.input_file);
        ensure_docx(&input_file)?;

        let workdir = tempfile::Builder::new()
            .prefix("novel-ingest-")
            .tempdir()?;
        let markdown_path = self.converter.convert(&input_file, workdir.path())?;
        let updated_at = timestamp_now();

        match request.mode {
            IngestMode::Full => self.ingest_full(request, &input_file, &markdown_path, &updated_at),
            IngestMode::Chapter => {
                self.ingest_chapter(request, &input_file, &markdown_path, &updated_at)
            }
        }
    }

    fn ingest_full(
        &self,
        request: &IngestRequest,
        input_file: &Path,
        markdown_path: &Path,
        updated_at: &str,
    ) -> Result<IngestReport, IngestError> {
        let book_id = request.book_id.as_str();
        let raw = fs::read_to_string(markdown_path)?;
        let chapters = split_full_markdown_into_chapters(&raw);
        if chapters.is_empty() {
            return Err(IngestError::NoChapters);
        }

        let layout = BookLayout::new(self.project_root, self.config, book_id);
        let existing = if request.reset {
            Vec::new()
        } else {
            read_manifest(&layout.manifest_path, book_id)
        };
        let existing_by_id: HashMap<&str, &ChapterEntry> = existing
            .iter()
            .map(|e| (e.chapter_id.as_str(), e))
            .collect();

        let incoming: Vec<IncomingChapter> = chapters
            .iter()
            .map(|c| IncomingChapter {
                title: c.title.clone(),
                order: c.order,
                content_hash: chapter_hash(&c.content),
            })
            .collect();
        let source_file = self.manifest_source_path(input_file);
        let merged = merge_full_update(book_id, &existing, &incoming, &source_file, updated_at);

        fs::create_dir_all(&layout.chapters_dir)?;
        let by_order: HashMap<u32, &ParsedChapter> =
            chapters.iter().map(|c| (c.order, c)).collect();
        let media_root = markdown_path.parent().unwrap_or(Path::new("."));

        let mut report = self.empty_report(IngestMode::Full, &layout);
        for entry in &merged {
            let chapter_file = layout.chapter_file(&entry.chapter_id);
            if !entry.is_active() {
                remove_file_quietly(&chapter_file);
                report.archived.push(entry.clone());
                continue;
            }
            let Some(chapter) = by_order.get(&entry.order) else {
                continue;
            };
            if let Some(previous) = existing_by_id.get(entry.chapter_id.as_str())
                && previous.same_content(entry)
                && chapter_file.exists()
            {
                report.unchanged.push(entry.clone());
                continue;
            }

            let rewritten =
                rewrite_chapter_media(&chapter.content, media_root, &layout, &entry.chapter_id)?;
            fs::write(&chapter_file, chapter_document(entry, &rewritten))?;
            report.written.push(self.written(entry, &chapter_file, chapter.body()));
        }

        let active_ids: HashSet<&str> = merged
            .iter()
            .filter(|e| e.is_active())
            .map(|e| e.chapter_id.as_str())
            .collect();
        report.removed_files = remove_stale_chapter_files(&layout.chapters_dir, &active_ids);
        remove_stale_media_dirs(&layout.public_images_dir, &active_ids);
        mirror_preview_images(&layout.public_images_dir, &layout.preview_images_dir);

        write_manifest(&layout.manifest_path, book_id, &merged, updated_at)?;
        self.write_book_meta(&layout, updated_at)?;
        Ok(report)
    }

    fn ingest_chapter(
        &self,
        request: &IngestRequest,
        input_file: &Path,
        markdown_path: &Path,
        updated_at: &str,
    ) -> Result<IngestReport, IngestError> {
        let book_id = request.book_id.as_str();
        let raw = fs::read_to_string(markdown_path)?;
        let chunks = split_full_markdown_into_chapters(&raw);
        let (title, content) = match chunks.into_iter().next() {
            Some(chapter) => (chapter.title, chapter.content),
            None => (file_stem(input_file), raw),
        };

        let chapter_id = request.chapter_id.clone().or_else(|| {
            input_file
                .file_name()
                .and_then(|name| parse_chapter_id_from_filename(&name.to_string_lossy()))
        });

        let layout = BookLayout::new(self.project_root, self.config, book_id);
        let existing = read_manifest(&layout.manifest_path, book_id);
        let source_file = self.manifest_source_path(input_file);
        let content_hash = chapter_hash(&content);
        let merged = upsert_chapter(
            book_id,
            &existing,
            &ChapterUpsert {
                chapter_id: chapter_id.as_deref(),
                title: &title,
                content_hash: &content_hash,
                source_file: &source_file,
                updated_at,
                order: request.order,
            },
        );

        let target = find_upsert_target(&merged, updated_at, &source_file)
            .ok_or(IngestError::TargetNotResolved)?;

        let media_root = markdown_path.parent().unwrap_or(Path::new("."));
        let rewritten = rewrite_chapter_media(&content, media_root, &layout, &target.chapter_id)?;
        fs::create_dir_all(&layout.chapters_dir)?;
        let chapter_file = layout.chapter_file(&target.chapter_id);
        fs::write(&chapter_file, chapter_document(target, &rewritten))?;

        let mut report = self.empty_report(IngestMode::Chapter, &layout);
        let body = content.split_once('\n').map(|(_, rest)| rest).unwrap_or_default();
        report.written.push(self.written(target, &chapter_file, body));
        report.archived = merged.iter().filter(|e| !e.is_active()).cloned().collect();

        mirror_preview_images(&layout.public_images_dir, &layout.preview_images_dir);
        write_manifest(&layout.manifest_path, book_id, &merged, updated_at)?;
        self.write_book_meta(&layout, updated_at)?;
        Ok(report)
    }

    fn write_book_meta(&self, layout: &BookLayout, updated_at: &str) -> Result<(), IngestError> {
        fs::create_dir_all(&layout.books_dir)?;
        remove_file_quietly(&layout.books_dir.join(format!("{}.json", layout.book_id)));
        let title = self.config.books.title_for(&layout.book_id);
        fs::write(
            layout.books_dir.join(format!("{}.md", layout.book_id)),
            book_meta_document(&layout.book_id, &title, updated_at),
        )?;
        Ok(())
    }

    /// Forward-slash path of `path` relative to the project root.
    fn manifest_source_path(&self, path: &Path) -> String {
        relative_path(self.project_root, path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn empty_report(&self, mode: IngestMode, layout: &BookLayout) -> IngestReport {
        IngestReport {
            mode,
            book_id: layout.book_id.clone(),
            written: Vec::new(),
            unchanged: Vec::new(),
            archived: Vec::new(),
            removed_files: 0,
            manifest_path: relative_path(self.project_root, &layout.manifest_path),
        }
    }

    fn written(&self, entry: &ChapterEntry, file: &Path, body: &str) -> WrittenChapter {
        WrittenChapter {
            entry: entry.clone(),
            file: relative_path(self.project_root, file),
            excerpt: create_excerpt(body, REPORT_EXCERPT_CHARS, DEFAULT_EXCERPT_FALLBACK),
        }
    }
}

/// SHA-256 hex digest of chapter markdown.
pub fn hash_content(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

/// Hash of chapter content with media references reduced to `media/<rel>`.
///
/// Converted markdown points at a fresh scratch directory on every run, so
/// raw references would change the hash of an untouched chapter.
fn chapter_hash(content: &str) -> String {
    let stable: Vec<(String, String)> = extract_media_refs(content)
        .filter_map(|reference| {
            let relative = resolve_media_relative_path(&reference)?;
            Some((reference, format!("{MEDIA_DIRNAME}/{relative}")))
        })
        .collect();
    hash_content(&rewrite_media_refs(content, &stable))
}

/// Current UTC time, RFC 3339 with milliseconds (`2026-02-17T12:00:00.000Z`).
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn ensure_docx(path: &Path) -> Result<(), IngestError> {
    let is_docx = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("docx"));
    if is_docx {
        Ok(())
    } else {
        Err(IngestError::NotDocx(path.to_path_buf()))
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Lexical relative path from `base` to `target`, using `..` when needed.
fn relative_path(base: &Path, target: &Path) -> PathBuf {
    if let Ok(stripped) = target.strip_prefix(base) {
        return stripped.to_path_buf();
    }
    let base: Vec<Component> = base.components().collect();
    let target: Vec<Component> = target.components().collect();
    let common = base
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();
    let mut relative = PathBuf::new();
    for _ in common..base.len() {
        relative.push("..");
    }
    for component in &target[common..] {
        relative.push(component.as_os_str());
    }
    relative
}

/// Copy a chapter's media into the public tree and point its references there.
fn rewrite_chapter_media(
    content: &str,
    media_root: &Path,
    layout: &BookLayout,
    chapter_id: &str,
) -> Result<String, IngestError> {
    if contains_inline_image(content) {
        return Err(IngestError::InlineImage(chapter_id.to_string()));
    }

    let dest_dir = layout.chapter_media_dir(chapter_id);
    fs::create_dir_all(&dest_dir)?;

    let mut replacements = Vec::new();
    for reference in extract_media_refs(content) {
        let Some(relative) = resolve_media_relative_path(&reference) else {
            continue;
        };
        let source = relative
            .split('/')
            .fold(media_root.join(MEDIA_DIRNAME), |path, segment| path.join(segment));
        let dest = relative
            .split('/')
            .fold(dest_dir.clone(), |path, segment| path.join(segment));

        copy_media(&source, &dest).map_err(|_| IngestError::MissingMedia(source.clone()))?;
        replacements.push((reference, layout.web_path(chapter_id, &relative)));
    }

    Ok(rewrite_media_refs(content, &replacements))
}

fn copy_media(source: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest)?;
    Ok(())
}

// ============================================================================
// Best-effort cleanup: failures here are ignored
// ============================================================================

fn remove_file_quietly(path: &Path) {
    let _ = fs::remove_file(path);
}

/// Delete `*.md` files in `dir` that do not belong to an active chapter.
/// Returns how many were removed.
fn remove_stale_chapter_files(dir: &Path, active_ids: &HashSet<&str>) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    let mut removed = 0;
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let is_markdown = path.extension().is_some_and(|e| e == "md");
        let is_active = path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|stem| active_ids.contains(stem));
        if is_markdown && !is_active && fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }
    removed
}

/// Delete per-chapter media directories of chapters that are no longer active.
fn remove_stale_media_dirs(book_media_dir: &Path, active_ids: &HashSet<&str>) {
    let Ok(entries) = fs::read_dir(book_media_dir) else {
        return;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
        let name = entry.file_name();
        if is_dir && !active_ids.contains(name.to_string_lossy().as_ref()) {
            let _ = fs::remove_dir_all(entry.path());
        }
    }
}

/// Replace the preview mirror with a fresh copy of the book's public media.
fn mirror_preview_images(source: &Path, target: &Path) {
    let _ = fs::remove_dir_all(target);
    let _ = copy_tree(source, target);
}

fn copy_tree(source: &Path, target: &Path) -> io::Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let dest = target.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ChapterStatus;
    use crate::test_helpers::{FakeConverter, assert_dense_active_orders, chapter_ids, long_body};
    use tempfile::TempDir;

    fn request(mode: IngestMode, file: &str) -> IngestRequest {
        IngestRequest {
            mode,
            input_file: PathBuf::from(file),
            book_id: "book-1".to_string(),
            reset: false,
            chapter_id: None,
            order: None,
        }
    }

    fn three_act_book() -> String {
        format!(
            "开幕：审判\n{}\n<img src=\"media/image1.png\" />\n第二幕：张家庄\n{}\n![图](media/sub/image2.jpeg)\n第三幕：归来\n{}\n",
            long_body("一"),
            long_body("二"),
            long_body("三")
        )
    }

    fn run(root: &Path, converter: &FakeConverter, request: &IngestRequest) -> IngestReport {
        let config = IngestConfig::default();
        Ingestor::new(root, &config, converter).run(request).unwrap()
    }

    fn manifest(root: &Path) -> Vec<ChapterEntry> {
        read_manifest(&root.join("content/manifests/book-1.json"), "book-1")
    }

    #[test]
    fn full_ingest_writes_chapters_media_and_manifest() {
        let root = TempDir::new().unwrap();
        let converter = FakeConverter::new(&three_act_book())
            .with_media("image1.png", b"png")
            .with_media("sub/image2.jpeg", b"jpeg");

        let report = run(root.path(), &converter, &request(IngestMode::Full, "book.docx"));

        assert_eq!(report.written.len(), 3);
        let entries = manifest(root.path());
        assert_eq!(chapter_ids(&entries), vec!["b1-c001", "b1-c002", "b1-c003"]);
        assert_dense_active_orders(&entries);
        assert!(entries.iter().all(|e| e.source_file == "book.docx"));

        let chapter = fs::read_to_string(root.path().join("src/content/chapters/book-1/b1-c001.md")).unwrap();
        assert!(chapter.starts_with("---\nbook_id: book-1\nchapter_id: b1-c001\norder: 1\n"));
        assert!(chapter.contains("# 开幕：审判"));
        assert!(chapter.contains("src=\"/images/book-1/b1-c001/image1.png\""));

        let second = fs::read_to_string(root.path().join("src/content/chapters/book-1/b1-c002.md")).unwrap();
        assert!(second.contains("![图](/images/book-1/b1-c002/sub/image2.jpeg)"));

        assert!(root.path().join("public/images/book-1/b1-c001/image1.png").is_file());
        assert!(root.path().join("public/images/book-1/b1-c002/sub/image2.jpeg").is_file());
        assert!(root.path().join("images/book-1/b1-c002/sub/image2.jpeg").is_file());

        let meta = fs::read_to_string(root.path().join("src/content/books/book-1.md")).unwrap();
        assert!(meta.contains("title: \"全中国最激烈故事 第一部\""));
    }

    #[test]
    fn reingesting_identical_document_writes_nothing() {
        let root = TempDir::new().unwrap();
        let converter = FakeConverter::new(&three_act_book())
            .with_media("image1.png", b"png")
            .with_media("sub/image2.jpeg", b"jpeg");
        let req = request(IngestMode::Full, "book.docx");

        run(root.path(), &converter, &req);
        let before = manifest(root.path());
        let report = run(root.path(), &converter, &req);

        assert!(report.written.is_empty());
        assert_eq!(report.unchanged.len(), 3);
        assert_eq!(manifest(root.path()), before);
    }

    #[test]
    fn shorter_document_archives_tail_and_removes_its_files() {
        let root = TempDir::new().unwrap();
        let full = FakeConverter::new(&three_act_book())
            .with_media("image1.png", b"png")
            .with_media("sub/image2.jpeg", b"jpeg");
        run(root.path(), &full, &request(IngestMode::Full, "book.docx"));

        let shorter = FakeConverter::new(&format!("开幕：审判\n{}\n", long_body("新")));
        let report = run(root.path(), &shorter, &request(IngestMode::Full, "book.docx"));

        assert_eq!(report.archived.len(), 2);
        let entries = manifest(root.path());
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].status, ChapterStatus::Archived);
        assert!(!root.path().join("src/content/chapters/book-1/b1-c002.md").exists());
        assert!(!root.path().join("public/images/book-1/b1-c002").exists());
        assert!(root.path().join("src/content/chapters/book-1/b1-c001.md").exists());
    }

    #[test]
    fn reset_starts_numbering_over() {
        let root = TempDir::new().unwrap();
        let converter = FakeConverter::new("开幕：一\n正文\n");
        let mut req = request(IngestMode::Full, "book.docx");
        run(root.path(), &converter, &req);

        fs::write(
            root.path().join("content/manifests/book-1.json"),
            "[{\"book_id\":\"book-1\",\"chapter_id\":\"b1-c007\",\"order\":1,\"title\":\"x\",\"source_type\":\"full\",\"source_file\":\"a.docx\",\"content_hash\":\"h\",\"updated_at\":\"t\",\"status\":\"active\"}]",
        )
        .unwrap();
        req.reset = true;
        run(root.path(), &converter, &req);

        assert_eq!(chapter_ids(&manifest(root.path())), vec!["b1-c001"]);
    }

    #[test]
    fn chapter_ingest_appends_new_chapter() {
        let root = TempDir::new().unwrap();
        run(
            root.path(),
            &FakeConverter::new("开幕：一\n正文一\n"),
            &request(IngestMode::Full, "book.docx"),
        );

        let report = run(
            root.path(),
            &FakeConverter::new("第二幕：新增\n正文二\n"),
            &request(IngestMode::Chapter, "chapters/new-chapter.docx"),
        );

        assert_eq!(report.written[0].entry.chapter_id, "b1-c002");
        let entries = manifest(root.path());
        assert_eq!(chapter_ids(&entries), vec!["b1-c001", "b1-c002"]);
        assert_eq!(entries[1].source_file, "chapters/new-chapter.docx");
        assert_eq!(entries[1].order, 2);
        let chapter = fs::read_to_string(root.path().join("src/content/chapters/book-1/b1-c002.md")).unwrap();
        assert!(chapter.contains("source_type: chapter"));
    }

    #[test]
    fn chapter_ingest_updates_id_from_filename() {
        let root = TempDir::new().unwrap();
        run(
            root.path(),
            &FakeConverter::new("开幕：一\n正文一\n第二幕：二\n正文二\n"),
            &request(IngestMode::Full, "book.docx"),
        );

        run(
            root.path(),
            &FakeConverter::new("开幕：修订\n新正文\n"),
            &request(IngestMode::Chapter, "chapter-b1-c001-v2.docx"),
        );

        let entries = manifest(root.path());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].chapter_id, "b1-c001");
        assert_eq!(entries[0].title, "开幕：修订");
        let chapter = fs::read_to_string(root.path().join("src/content/chapters/book-1/b1-c001.md")).unwrap();
        assert!(chapter.contains("新正文"));
    }

    #[test]
    fn chapter_ingest_inserts_at_requested_order() {
        let root = TempDir::new().unwrap();
        run(
            root.path(),
            &FakeConverter::new("开幕：一\n正文一\n第二幕：二\n正文二\n"),
            &request(IngestMode::Full, "book.docx"),
        );

        let mut req = request(IngestMode::Chapter, "prologue.docx");
        req.order = Some(1);
        run(root.path(), &FakeConverter::new("序章正文\n"), &req);

        let entries = manifest(root.path());
        assert_eq!(chapter_ids(&entries), vec!["b1-c003", "b1-c001", "b1-c002"]);
        assert_eq!(entries[0].title, "第一章");
        assert_dense_active_orders(&entries);
    }

    #[test]
    fn non_docx_input_is_rejected() {
        let root = TempDir::new().unwrap();
        let config = IngestConfig::default();
        let converter = FakeConverter::new("开幕：一\n");
        let result = Ingestor::new(root.path(), &config, &converter)
            .run(&request(IngestMode::Full, "book.pdf"));
        assert!(matches!(result, Err(IngestError::NotDocx(_))));
    }

    #[test]
    fn empty_document_has_no_chapters() {
        let root = TempDir::new().unwrap();
        let config = IngestConfig::default();
        let converter = FakeConverter::new("  \n");
        let result = Ingestor::new(root.path(), &config, &converter)
            .run(&request(IngestMode::Full, "book.docx"));
        assert!(matches!(result, Err(IngestError::NoChapters)));
    }

    #[test]
    fn inline_images_are_rejected() {
        let root = TempDir::new().unwrap();
        let config = IngestConfig::default();
        let converter = FakeConverter::new("开幕：一\n<img src=\"data:image/png;base64,AAAA\" />\n");
        let result = Ingestor::new(root.path(), &config, &converter)
            .run(&request(IngestMode::Full, "book.docx"));
        assert!(matches!(result, Err(IngestError::InlineImage(id)) if id == "b1-c001"));
    }

    #[test]
    fn missing_media_is_fatal() {
        let root = TempDir::new().unwrap();
        let config = IngestConfig::default();
        let converter = FakeConverter::new("开幕：一\n![x](media/gone.png)\n");
        let result = Ingestor::new(root.path(), &config, &converter)
            .run(&request(IngestMode::Full, "book.docx"));
        assert!(matches!(result, Err(IngestError::MissingMedia(p)) if p.ends_with("media/gone.png")));
    }

    #[test]
    fn hash_is_sha256_hex() {
        assert_eq!(
            hash_content(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn chapter_hash_ignores_scratch_directory() {
        let a = "正文\n![x](/tmp/novel-ingest-a/media/image1.png)";
        let b = "正文\n![x](/tmp/novel-ingest-b/media/image1.png)";
        assert_eq!(chapter_hash(a), chapter_hash(b));
        assert_eq!(chapter_hash(a), hash_content("正文\n![x](media/image1.png)"));
        assert_ne!(chapter_hash(a), chapter_hash("正文\n![x](media/image2.png)"));
    }

    #[test]
    fn timestamp_has_millisecond_precision() {
        let ts = timestamp_now();
        assert_eq!(ts.len(), "2026-02-17T12:00:00.000Z".len());
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn relative_paths_climb_out_of_root() {
        assert_eq!(
            relative_path(Path::new("/site"), Path::new("/site/docs/a.docx")),
            PathBuf::from("docs/a.docx")
        );
        assert_eq!(
            relative_path(Path::new("/site/web"), Path::new("/site/docs/a.docx")),
            PathBuf::from("../docs/a.docx")
        );
    }

    #[test]
    fn order_parsing_follows_leading_digits() {
        assert_eq!(parse_order("3"), Some(3));
        assert_eq!(parse_order(" 3abc"), Some(3));
        assert_eq!(parse_order("+2"), Some(2));
        assert_eq!(parse_order("-1"), Some(0));
        assert_eq!(parse_order("99999999999"), Some(u32::MAX));
        assert_eq!(parse_order("abc"), None);
        assert_eq!(parse_order("-"), None);
        assert_eq!(parse_order(""), None);
    }

    #[test]
    fn negative_order_inserts_at_front() {
        let root = TempDir::new().unwrap();
        run(
            root.path(),
            &FakeConverter::new("开幕：一\n正文一\n第二幕：二\n正文二\n"),
            &request(IngestMode::Full, "book.docx"),
        );

        let mut req = request(IngestMode::Chapter, "prologue.docx");
        req.order = parse_order("-1");
        run(root.path(), &FakeConverter::new("序章正文\n"), &req);

        let entries = manifest(root.path());
        assert_eq!(chapter_ids(&entries), vec!["b1-c003", "b1-c001", "b1-c002"]);
        assert_dense_active_orders(&entries);
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("full".parse::<IngestMode>(), Ok(IngestMode::Full));
        assert_eq!("chapter".parse::<IngestMode>(), Ok(IngestMode::Chapter));
        assert!("book".parse::<IngestMode>().is_err());
    }
}
