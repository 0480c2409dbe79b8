//! Splitting a converted manuscript into chapters.
//!
//! The splitter walks the document line by line. Every line the
//! [`heading`](crate::heading) detector recognises opens a new chapter whose
//! content starts with a synthesized `# <title>` line; all other lines belong
//! to the chapter currently open, or to a leading buffer before the first
//! heading.
//!
//! ## Table of contents suppression
//!
//! Exported manuscripts usually open with a table of contents whose entries
//! look exactly like act headings. Those entries turn into a run of tiny
//! chapters in front of the first real one. Every chapter before the first
//! one with at least [`SUBSTANTIAL_CHAPTER_CHARS`] characters is dropped, but
//! nothing is lost: the leading buffer and the bodies of the dropped chapters
//! are folded into the first kept chapter, right after its heading.
//!
//! ```text
//! # 目录                       ┐
//! 开幕：21世纪大审判 1          │ dropped (short)
//! 第二幕：张家庄的故事 29       ┘  bodies kept as preface
//! 开幕：21世纪大审判            ← first substantial chapter, order 1
//! ...
//! ```

use crate::heading::detect_chapter_title;

/// Minimum content length (in characters) of the first real chapter.
pub const SUBSTANTIAL_CHAPTER_CHARS: usize = 500;

/// Title of the single chapter produced for documents without headings.
pub const FALLBACK_CHAPTER_TITLE: &str = "第一章";

/// A chapter cut from the current document. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChapter {
    pub title: String,
    /// 1-based position within this parse.
    pub order: u32,
    /// Chapter markdown, starting with its `# <title>` line.
    pub content: String,
}

impl ParsedChapter {
    /// Chapter content without the heading line.
    pub fn body(&self) -> &str {
        split_heading(&self.content).1
    }
}

/// Split raw markdown into ordered chapters.
pub fn split_full_markdown_into_chapters(markdown: &str) -> Vec<ParsedChapter> {
    let mut leading: Vec<&str> = Vec::new();
    let mut open: Vec<(String, Vec<String>)> = Vec::new();

    for line in markdown
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
    {
        if let Some(title) = detect_chapter_title(line) {
            let heading = format!("# {title}");
            open.push((title, vec![heading]));
            continue;
        }
        match open.last_mut() {
            Some((_, lines)) => lines.push(line.to_string()),
            None => leading.push(line),
        }
    }

    if open.is_empty() {
        let fallback = markdown.trim();
        if fallback.is_empty() {
            return Vec::new();
        }
        return vec![ParsedChapter {
            title: FALLBACK_CHAPTER_TITLE.to_string(),
            order: 1,
            content: format!("# {FALLBACK_CHAPTER_TITLE}\n\n{fallback}"),
        }];
    }

    let chapters: Vec<ParsedChapter> = open
        .into_iter()
        .enumerate()
        .map(|(i, (title, lines))| ParsedChapter {
            title,
            order: i as u32 + 1,
            content: lines.join("\n").trim().to_string(),
        })
        .collect();

    let first_substantial = chapters
        .iter()
        .position(|c| c.content.chars().count() >= SUBSTANTIAL_CHAPTER_CHARS)
        .unwrap_or(0);

    let mut preface: Vec<String> = Vec::new();
    let leading_content = leading.join("\n");
    let leading_content = leading_content.trim();
    if !leading_content.is_empty() {
        preface.push(leading_content.to_string());
    }

    let mut kept = Vec::with_capacity(chapters.len() - first_substantial);
    for (i, chapter) in chapters.into_iter().enumerate() {
        if i < first_substantial {
            let body = chapter.body();
            if !body.is_empty() {
                preface.push(body.to_string());
            }
        } else {
            kept.push(chapter);
        }
    }

    for (i, chapter) in kept.iter_mut().enumerate() {
        chapter.order = i as u32 + 1;
    }

    if !preface.is_empty() {
        let first = &mut kept[0];
        let (heading, body) = split_heading(&first.content);
        let prefix = preface.join("\n\n");
        first.content = if body.is_empty() {
            format!("{heading}\n\n{prefix}")
        } else {
            format!("{heading}\n\n{prefix}\n\n{body}")
        };
    }

    kept
}

/// Split content into its first line and the trimmed remainder.
fn split_heading(content: &str) -> (&str, &str) {
    match content.split_once('\n') {
        Some((heading, rest)) => (heading.strip_suffix('\r').unwrap_or(heading), rest.trim()),
        None => (content, ""),
    }
}
