//! Chapter heading recognition.
//!
//! Manuscripts mark chapters with act headings: `开幕` for the prologue and
//! `第N幕` for every following act, where `N` is written either in CJK
//! numerals or Arabic digits. Word processors decorate these lines freely, so
//! a line is normalized before it is tested:
//!
//! - HTML tags become spaces (`<strong>开幕</strong>` → `开幕`)
//! - emphasis markers `* _ ` ~` are removed
//! - a leading markdown heading prefix (`##`) is dropped
//! - whitespace runs collapse to one space
//!
//! A normalized heading always uses the full-width colon as its separator:
//!
//! - `**开幕.21世纪大审判**` → `开幕：21世纪大审判`
//! - `## 第二幕：张家庄的故事 29` → `第二幕：张家庄的故事` (TOC page number dropped)
//! - `第3幕 归来` → `第3幕：归来`

use regex::Regex;
use std::sync::LazyLock;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[^>]+>").expect("valid tag pattern"));
static EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*_`~]").expect("valid emphasis pattern"));
static HEADING_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#+\s*").expect("valid heading prefix pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Marker, separator run, tail text.
static ACT_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(开幕|第[一二三四五六七八九十百零两0-9]+幕)\s*[：:.．、 ]+\s*(.+)$")
        .expect("valid act title pattern")
});
static TRAILING_PAGE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[0-9]{1,4}$").expect("valid page number pattern"));
static ACT_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(开幕|第[一二三四五六七八九十百零两0-9]+幕)[:：]")
        .expect("valid act heading pattern")
});

/// Normalize a raw line into a display title.
///
/// Lines that look like act headings come back in canonical
/// `<marker>：<text>` form; anything else is returned with markup stripped
/// and whitespace collapsed.
pub fn normalize_title(raw: &str) -> String {
    let without_tags = HTML_TAG.replace_all(raw, " ");
    let without_emphasis = EMPHASIS.replace_all(&without_tags, "");
    let without_prefix = HEADING_PREFIX.replace(&without_emphasis, "");
    let collapsed = WHITESPACE.replace_all(&without_prefix, " ");
    let stripped = collapsed.trim();

    if let Some(caps) = ACT_TITLE.captures(stripped) {
        let tail = TRAILING_PAGE_NUMBER.replace(caps[2].trim(), "");
        return format!("{}：{}", &caps[1], tail);
    }
    stripped.to_string()
}

/// Return the normalized title when `line` is a chapter heading.
pub fn detect_chapter_title(line: &str) -> Option<String> {
    let normalized = normalize_title(line);
    if normalized.is_empty() {
        return None;
    }
    ACT_HEADING.is_match(&normalized).then_some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prologue_with_dot_separator() {
        assert_eq!(
            detect_chapter_title("**开幕.21世纪大审判**").as_deref(),
            Some("开幕：21世纪大审判")
        );
    }

    #[test]
    fn act_with_full_width_colon() {
        assert_eq!(
            detect_chapter_title("**第二幕：张家庄的故事**").as_deref(),
            Some("第二幕：张家庄的故事")
        );
    }

    #[test]
    fn act_with_arabic_digits_and_space_separator() {
        assert_eq!(
            detect_chapter_title("第12幕 归来").as_deref(),
            Some("第12幕：归来")
        );
    }

    #[test]
    fn heading_prefix_and_html_are_stripped() {
        assert_eq!(
            detect_chapter_title("## <span>第三幕</span>、 夜行").as_deref(),
            Some("第三幕：夜行")
        );
    }

    #[test]
    fn toc_page_number_is_dropped() {
        assert_eq!(
            detect_chapter_title("第二幕：张家庄的故事 29").as_deref(),
            Some("第二幕：张家庄的故事")
        );
    }

    #[test]
    fn five_digit_tail_number_is_kept() {
        assert_eq!(
            detect_chapter_title("第二幕：纪年 12345").as_deref(),
            Some("第二幕：纪年 12345")
        );
    }

    #[test]
    fn marker_without_separator_is_not_a_heading() {
        assert_eq!(detect_chapter_title("第二幕"), None);
        assert_eq!(detect_chapter_title("开幕"), None);
    }

    #[test]
    fn marker_mid_sentence_is_not_a_heading() {
        assert_eq!(detect_chapter_title("我们终于看到了第二幕：结局"), None);
    }

    #[test]
    fn blank_and_plain_lines_are_not_headings() {
        assert_eq!(detect_chapter_title(""), None);
        assert_eq!(detect_chapter_title("   "), None);
        assert_eq!(detect_chapter_title("# 卷首语"), None);
    }

    #[test]
    fn normalize_keeps_plain_text() {
        assert_eq!(normalize_title("#  卷首语  "), "卷首语");
        assert_eq!(normalize_title("*序言*"), "序言");
        assert_eq!(normalize_title("a   b\tc"), "a b c");
    }
}
