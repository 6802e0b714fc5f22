//! Color palettes for the light and dark themes

use crate::config::Theme;
use colored::{Color, ColoredString, Colorize};

/// Colors used for the four message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub primary: Color,
    pub success: Color,
    pub info: Color,
    pub warning: Color,
    pub error: Color,
    pub dim: Color,
}

impl Palette {
    /// Light backgrounds get standard colors, dark ones the bright variants
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                primary: Color::Blue,
                success: Color::Green,
                info: Color::Blue,
                warning: Color::Yellow,
                error: Color::Red,
                dim: Color::BrightBlack,
            },
            Theme::Dark => Self {
                primary: Color::BrightBlue,
                success: Color::BrightGreen,
                info: Color::BrightCyan,
                warning: Color::BrightYellow,
                error: Color::BrightRed,
                dim: Color::BrightBlack,
            },
        }
    }

    pub fn success(&self, text: &str) -> ColoredString {
        text.color(self.success)
    }

    pub fn info(&self, text: &str) -> ColoredString {
        text.color(self.info)
    }

    pub fn warning(&self, text: &str) -> ColoredString {
        text.color(self.warning)
    }

    pub fn error(&self, text: &str) -> ColoredString {
        text.color(self.error)
    }

    pub fn dim(&self, text: &str) -> ColoredString {
        text.color(self.dim)
    }

    /// Sample lines shown by `mycli theme`
    pub fn preview(&self) -> Vec<String> {
        vec![
            "─".repeat(40),
            format!("{}", self.success(" Success message")),
            format!("{}", self.info(" Info message")),
            format!("{}", self.warning(" Warning message")),
            format!("{}", self.error(" Error message")),
            "─".repeat(40),
        ]
    }
}
