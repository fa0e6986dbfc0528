use ratatui::style::{Color, Style};
use rill_core::ThemePreference;

/// Color palette for the terminal UI.
///
/// Two variants, selected from the persisted preference. The dark palette is
/// based on iceberg.vim; the light palette mirrors it with inverted
/// luminance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub bg: Color,
    pub fg: Color,
    pub panel_bg: Color,
    pub muted: Color,
    pub accent: Color,
    pub user: Color,
    pub assistant: Color,
    pub error: Color,
    pub notice: Color,
    pub border: Color,
}

impl Theme {
    pub const DARK: Theme = Theme {
        bg: Color::Rgb(22, 24, 33),
        fg: Color::Rgb(198, 200, 209),
        panel_bg: Color::Rgb(30, 33, 50),
        muted: Color::Rgb(107, 112, 137),
        accent: Color::Rgb(132, 160, 198),
        user: Color::Rgb(137, 184, 194),
        assistant: Color::Rgb(198, 200, 209),
        error: Color::Rgb(226, 120, 120),
        notice: Color::Rgb(226, 164, 120),
        border: Color::Rgb(60, 65, 90),
    };

    pub const LIGHT: Theme = Theme {
        bg: Color::Rgb(235, 237, 242),
        fg: Color::Rgb(51, 55, 74),
        panel_bg: Color::Rgb(222, 225, 234),
        muted: Color::Rgb(140, 145, 165),
        accent: Color::Rgb(51, 101, 163),
        user: Color::Rgb(50, 120, 140),
        assistant: Color::Rgb(51, 55, 74),
        error: Color::Rgb(180, 50, 50),
        notice: Color::Rgb(170, 110, 40),
        border: Color::Rgb(170, 175, 195),
    };

    pub fn from_preference(preference: ThemePreference) -> Self {
        match preference {
            ThemePreference::Dark => Self::DARK,
            ThemePreference::Light => Self::LIGHT,
        }
    }

    /// Base style for all text
    pub fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    /// Panel style (input box, message cards)
    pub fn panel(&self) -> Style {
        Style::default().fg(self.fg).bg(self.panel_bg)
    }

    /// Border style
    pub fn border(&self) -> Style {
        Style::default().fg(self.border)
    }

    /// Muted style (status line, counters)
    pub fn muted(&self) -> Style {
        Style::default().fg(self.muted).bg(self.bg)
    }

    /// Error style
    pub fn error(&self) -> Style {
        Style::default().fg(self.error).bg(self.bg)
    }

    /// Style for the role label of a message
    pub fn role_style(&self, user: bool) -> Style {
        let color = if user { self.user } else { self.accent };
        Style::default().fg(color).bg(self.bg)
    }
}
