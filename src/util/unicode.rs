use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Display width in terminal cells.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Collapse a title onto one line: newlines, tabs and other control
/// characters become single spaces.
pub fn single_line(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// Truncate a string to fit within `max_cells` terminal cells, appending `…` if truncated.
pub fn truncate_to_width(s: &str, max_cells: usize) -> String {
    if max_cells == 0 {
        return String::new();
    }
    if display_width(s) <= max_cells {
        return s.to_string();
    }
    if max_cells == 1 {
        return "\u{2026}".to_string();
    }
    let budget = max_cells - 1; // 1 cell for '…'
    let mut width = 0;
    let mut result = String::new();
    for grapheme in s.graphemes(true) {
        let gw = UnicodeWidthStr::width(grapheme);
        if width + gw > budget {
            break;
        }
        width += gw;
        result.push_str(grapheme);
    }
    result.push('\u{2026}');
    result
}

/// Right-align `s` in a field `cells` wide.
pub fn pad_left(s: &str, cells: usize) -> String {
    let pad = cells.saturating_sub(display_width(s));
    format!("{}{}", " ".repeat(pad), s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_width_ascii() {
        assert_eq!(display_width("hello"), 5);
    }

    #[test]
    fn display_width_cjk() {
        assert_eq!(display_width("你好"), 4);
    }

    #[test]
    fn display_width_emoji() {
        assert_eq!(display_width("🎉"), 2);
    }

    #[test]
    fn single_line_replaces_controls() {
        assert_eq!(single_line("a\nb\tc"), "a b c");
        assert_eq!(single_line("plain"), "plain");
    }

    #[test]
    fn truncate_no_truncation_needed() {
        assert_eq!(truncate_to_width("hello", 10), "hello");
    }

    #[test]
    fn truncate_exact_fit() {
        assert_eq!(truncate_to_width("hello", 5), "hello");
    }

    #[test]
    fn truncate_ascii() {
        assert_eq!(truncate_to_width("hello world", 6), "hello…");
    }

    #[test]
    fn truncate_cjk_boundary() {
        // "你好世界" = 8 cells, budget 4 → "你" (2) + "好" (2) = 4
        assert_eq!(truncate_to_width("你好世界", 5), "你好…");
    }

    #[test]
    fn truncate_cjk_off_by_one() {
        // budget 3: "你" fits (2), "好" would make 4
        assert_eq!(truncate_to_width("你好世界", 4), "你…");
    }

    #[test]
    fn truncate_keeps_combining_marks_together() {
        assert_eq!(truncate_to_width("cafe\u{0301}s and more", 6), "cafe\u{0301}s…");
    }

    #[test]
    fn truncate_zero_and_one() {
        assert_eq!(truncate_to_width("hello", 0), "");
        assert_eq!(truncate_to_width("hello", 1), "…");
    }

    #[test]
    fn pad_left_aligns() {
        assert_eq!(pad_left("7", 3), "  7");
        assert_eq!(pad_left("123", 2), "123");
    }
}
