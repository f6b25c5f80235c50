use crossterm::style::{Color, Stylize};
use serde::Serialize;

use crate::io::recovery::RecoveryEntry;
use crate::model::task::{Task, TaskId};
use crate::model::theme::{Theme, ThemeColor};
use crate::util::unicode::{pad_left, single_line, truncate_to_width};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    /// 1-based position in the listing
    pub position: usize,
    pub id: TaskId,
    pub completed: bool,
    pub title: String,
}

#[derive(Serialize)]
pub struct ListJson {
    pub hide_completed: bool,
    pub theme: i64,
    pub tasks: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct ThemeJson {
    pub id: i64,
    pub color: ThemeColor,
    pub label: &'static str,
    pub selected: bool,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn task_to_json(position: usize, task: &Task) -> TaskJson {
    TaskJson {
        position,
        id: task.id,
        completed: task.completed,
        title: task.title.clone(),
    }
}

pub fn theme_to_json(theme: &Theme, selected: i64) -> ThemeJson {
    ThemeJson {
        id: theme.id,
        color: theme.color,
        label: theme.label,
        selected: theme.id == selected,
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// How listings are rendered
#[derive(Debug, Clone, Copy)]
pub struct ListStyle {
    /// Accent color for checkboxes; None = plain text
    pub accent: Option<ThemeColor>,
    /// Truncate titles wider than this (0 = never)
    pub max_title_width: usize,
}

impl ListStyle {
    #[cfg(test)]
    pub fn plain() -> Self {
        ListStyle {
            accent: None,
            max_title_width: 0,
        }
    }
}

fn crossterm_color(color: ThemeColor) -> Color {
    let (r, g, b) = color.rgb();
    Color::Rgb { r, g, b }
}

/// Format a single task as a numbered one-line summary.
/// `number_width` is the width of the widest position number in the listing.
pub fn format_task_line(
    position: usize,
    number_width: usize,
    task: &Task,
    style: &ListStyle,
) -> String {
    let number = pad_left(&format!("{}.", position), number_width + 1);
    let checkbox = if task.completed { "[x]" } else { "[ ]" };
    let mut title = single_line(&task.title);
    if style.max_title_width > 0 {
        title = truncate_to_width(&title, style.max_title_width);
    }

    match style.accent {
        Some(color) => {
            let checkbox = checkbox.with(crossterm_color(color));
            if task.completed {
                format!("{} {} {}", number, checkbox, title.as_str().dim().crossed_out())
            } else {
                format!("{} {} {}", number, checkbox, title)
            }
        }
        None => format!("{} {} {}", number, checkbox, title),
    }
}

/// Format a task listing; empty lists get a hint line.
pub fn format_listing(tasks: &[&Task], hidden: usize, style: &ListStyle) -> Vec<String> {
    let mut lines = Vec::new();
    if tasks.is_empty() {
        if hidden > 0 {
            lines.push(format!("All done. {} completed hidden.", hidden));
        } else {
            lines.push("Nothing to do. Add a task with `td add`.".to_string());
        }
        return lines;
    }

    let number_width = tasks.len().to_string().len();
    for (i, task) in tasks.iter().enumerate() {
        lines.push(format_task_line(i + 1, number_width, task, style));
    }
    if hidden > 0 {
        lines.push(format!("({} completed hidden)", hidden));
    }
    lines
}

/// Format one row of the theme picker, marking the selected theme
pub fn format_theme_line(theme: &Theme, selected: i64, use_color: bool) -> String {
    let marker = if theme.id == selected { "*" } else { " " };
    let swatch = if use_color {
        "\u{25CF}".with(crossterm_color(theme.color)).to_string()
    } else {
        format!("({})", theme.color.name())
    };
    format!("{} {}  {} {}", marker, theme.id, theme.label, swatch)
}

pub fn format_recovery_entry(entry: &RecoveryEntry) -> Vec<String> {
    let mut lines = vec![format!(
        "{} [{}] {}",
        entry
            .timestamp
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        entry.category,
        entry.description
    )];
    for (key, value) in &entry.fields {
        lines.push(format!("  {}: {}", key, value));
    }
    for line in entry.body.lines() {
        lines.push(format!("    {}", line));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::theme::THEMES;
    use pretty_assertions::assert_eq;

    fn task(title: &str, completed: bool) -> Task {
        let mut t = Task::new(title);
        t.completed = completed;
        t
    }

    #[test]
    fn plain_task_lines() {
        let style = ListStyle::plain();
        assert_eq!(
            format_task_line(1, 1, &task("Buy milk", false), &style),
            "1. [ ] Buy milk"
        );
        assert_eq!(
            format_task_line(3, 2, &task("Call mom", true), &style),
            " 3. [x] Call mom"
        );
    }

    #[test]
    fn multiline_titles_are_flattened() {
        let line = format_task_line(1, 1, &task("two\nlines", false), &ListStyle::plain());
        assert_eq!(line, "1. [ ] two lines");
    }

    #[test]
    fn long_titles_are_truncated() {
        let style = ListStyle {
            accent: None,
            max_title_width: 8,
        };
        let line = format_task_line(1, 1, &task("a very long title", false), &style);
        assert_eq!(line, "1. [ ] a very …");
    }

    #[test]
    fn listing_numbers_are_aligned() {
        let tasks: Vec<Task> = (1..=10).map(|i| task(&format!("t{}", i), false)).collect();
        let refs: Vec<&Task> = tasks.iter().collect();
        let lines = format_listing(&refs, 0, &ListStyle::plain());
        assert_eq!(lines[0], " 1. [ ] t1");
        assert_eq!(lines[9], "10. [ ] t10");
    }

    #[test]
    fn listing_reports_hidden_count() {
        let a = task("a", false);
        let lines = format_listing(&[&a], 2, &ListStyle::plain());
        assert_eq!(lines, vec!["1. [ ] a", "(2 completed hidden)"]);

        let lines = format_listing(&[], 2, &ListStyle::plain());
        assert_eq!(lines, vec!["All done. 2 completed hidden."]);
    }

    #[test]
    fn empty_listing_hint() {
        let lines = format_listing(&[], 0, &ListStyle::plain());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Nothing to do"));
    }

    #[test]
    fn colored_line_keeps_text() {
        let style = ListStyle {
            accent: Some(ThemeColor::Blue),
            max_title_width: 0,
        };
        let line = format_task_line(1, 1, &task("Buy milk", false), &style);
        assert!(line.contains("[ ]"));
        assert!(line.contains("Buy milk"));
        assert!(line.contains('\u{1b}'));
    }

    #[test]
    fn theme_lines_mark_selection() {
        assert_eq!(
            format_theme_line(&THEMES[1], 2, false),
            "* 2  Kind of Blue (blue)"
        );
        assert_eq!(
            format_theme_line(&THEMES[0], 2, false),
            "  1  Dark and Stormy (gray)"
        );
    }

    #[test]
    fn theme_json_flags_selected() {
        let json = serde_json::to_value(theme_to_json(&THEMES[3], 4)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 4, "color": "purple", "label": "Purple Rain", "selected": true})
        );
    }
}
