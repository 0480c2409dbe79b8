//! Plain-text excerpts of chapter markdown.
//!
//! Used to preview chapters in the ingestion report. The markdown is parsed
//! with `pulldown-cmark` and only prose survives: code, images and raw HTML
//! are dropped, link text is kept, whitespace is collapsed.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

/// Excerpt length used by the site for chapter descriptions.
pub const DEFAULT_EXCERPT_CHARS: usize = 160;

/// Shown when a chapter has no prose at all.
pub const DEFAULT_EXCERPT_FALLBACK: &str = "《全中国最激烈故事》章节在线阅读。";

/// Flatten markdown to a single line of prose.
pub fn markdown_to_plain_text(markdown: &str) -> String {
    let mut text = String::new();
    let mut hidden = 0usize;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::CodeBlock(_) | Tag::Image { .. }) => hidden += 1,
            Event::End(TagEnd::CodeBlock | TagEnd::Image) => hidden = hidden.saturating_sub(1),
            Event::Text(t) if hidden == 0 => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::Item
                | TagEnd::BlockQuote(_)
                | TagEnd::TableCell,
            ) => text.push(' '),
            _ => {}
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Plain text cut to `max_chars` characters, with `…` when cut.
pub fn create_excerpt(markdown: &str, max_chars: usize, fallback: &str) -> String {
    let plain = markdown_to_plain_text(markdown);
    if plain.is_empty() {
        return fallback.to_string();
    }
    if plain.chars().count() <= max_chars {
        return plain;
    }
    let cut: String = plain.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}
