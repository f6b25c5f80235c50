use serde::Serialize;

/// Theme id used when no theme preference has ever been stored
pub const DEFAULT_THEME_ID: i64 = 1;

/// Accent colors available to themes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeColor {
    Gray,
    Blue,
    Green,
    Purple,
}

impl ThemeColor {
    /// Lowercase color name
    pub fn name(self) -> &'static str {
        match self {
            ThemeColor::Gray => "gray",
            ThemeColor::Blue => "blue",
            ThemeColor::Green => "green",
            ThemeColor::Purple => "purple",
        }
    }

    /// RGB value used for terminal output
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            ThemeColor::Gray => (0x8E, 0x8E, 0x93),
            ThemeColor::Blue => (0x00, 0x7A, 0xFF),
            ThemeColor::Green => (0x34, 0xC7, 0x59),
            ThemeColor::Purple => (0xAF, 0x52, 0xDE),
        }
    }
}

/// Color shown when the selected theme id matches no built-in theme
pub const NEUTRAL_COLOR: ThemeColor = ThemeColor::Gray;

/// A built-in cosmetic theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub id: i64,
    pub color: ThemeColor,
    pub label: &'static str,
}

/// The fixed theme table, in picker order
pub const THEMES: [Theme; 4] = [
    Theme {
        id: 1,
        color: ThemeColor::Gray,
        label: "Dark and Stormy",
    },
    Theme {
        id: 2,
        color: ThemeColor::Blue,
        label: "Kind of Blue",
    },
    Theme {
        id: 3,
        color: ThemeColor::Green,
        label: "Garden Green",
    },
    Theme {
        id: 4,
        color: ThemeColor::Purple,
        label: "Purple Rain",
    },
];

/// Look up a built-in theme by id
pub fn find_theme(id: i64) -> Option<&'static Theme> {
    THEMES.iter().find(|t| t.id == id)
}

/// Accent color for a theme id. Unknown ids (including 0) resolve to
/// [`NEUTRAL_COLOR`].
pub fn theme_color(id: i64) -> ThemeColor {
    find_theme(id).map_or(NEUTRAL_COLOR, |t| t.color)
}
