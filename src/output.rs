//! CLI output formatting for ingestion runs.
//!
//! Output is information-first: every chapter leads with its position and
//! title, followed by its id. Files and excerpts are indented context lines.
//!
//! ```text
//! Written
//! 001 开幕：21世纪大审判 (b1-c001)
//!     File: src/content/chapters/book-1/b1-c001.md
//!     Excerpt: 公元二〇二一年，法庭里坐满了人……
//!
//! Unchanged
//! 002 第二幕：张家庄的故事 (b1-c002)
//!
//! Archived
//! 003 第三幕：归来 (b1-c003)
//!
//! Removed 1 stale chapter file
//! Manifest: content/manifests/book-1.json
//! Ingestion completed: mode=full, book=book-1
//! ```
//!
//! Formatting functions return `Vec<String>` so tests can inspect the exact
//! lines; the `print_*` wrappers write them to stdout.

use crate::ingest::IngestReport;
use crate::manifest::ChapterEntry;

/// Zero-padded 3-digit position.
fn format_index(pos: u32) -> String {
    format!("{:0>3}", pos)
}

/// 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn chapter_header(entry: &ChapterEntry) -> String {
    format!(
        "{} {} ({})",
        format_index(entry.order),
        entry.title,
        entry.chapter_id
    )
}

fn section(lines: &mut Vec<String>, heading: &str, entries: &[ChapterEntry]) {
    if entries.is_empty() {
        return;
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(heading.to_string());
    lines.extend(entries.iter().map(chapter_header));
}

/// Format a finished run as display lines.
pub fn format_ingest_report(report: &IngestReport) -> Vec<String> {
    let mut lines = Vec::new();

    if !report.written.is_empty() {
        lines.push("Written".to_string());
        for chapter in &report.written {
            lines.push(chapter_header(&chapter.entry));
            lines.push(format!("{}File: {}", indent(1), chapter.file.display()));
            lines.push(format!("{}Excerpt: {}", indent(1), chapter.excerpt));
        }
    }
    section(&mut lines, "Unchanged", &report.unchanged);
    section(&mut lines, "Archived", &report.archived);

    if !lines.is_empty() {
        lines.push(String::new());
    }
    if report.removed_files > 0 {
        let plural = if report.removed_files == 1 { "" } else { "s" };
        lines.push(format!(
            "Removed {} stale chapter file{}",
            report.removed_files, plural
        ));
    }
    lines.push(format!("Manifest: {}", report.manifest_path.display()));
    lines.push(format!(
        "Ingestion completed: mode={}, book={}",
        report.mode, report.book_id
    ));
    lines
}

pub fn print_ingest_report(report: &IngestReport) {
    for line in format_ingest_report(report) {
        println!("{}", line);
    }
}
