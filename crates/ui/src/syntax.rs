use ratatui::style::{Color, Style};
use ratatui::text::Span;
use rill_core::ThemePreference;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

/// Syntax highlighter for fenced code blocks
pub struct SyntaxHighlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl SyntaxHighlighter {
    /// Create a highlighter matching the UI theme preference
    pub fn new(preference: ThemePreference) -> Self {
        let theme_set = ThemeSet::load_defaults();
        let name = match preference {
            ThemePreference::Dark => "base16-ocean.dark",
            ThemePreference::Light => "InspiredGitHub",
        };
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme: theme_set.themes[name].clone(),
        }
    }

    /// Highlight a code block into styled lines.
    ///
    /// Unknown languages fall back to plain text, so highlighting never
    /// fails; at worst the block renders unstyled.
    pub fn highlight_code(&self, code: &str, lang: &str) -> Vec<Vec<Span<'static>>> {
        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_name(lang))
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let mut highlighter = HighlightLines::new(syntax, &self.theme);
        let mut lines = Vec::new();

        for line in LinesWithEndings::from(code) {
            let mut spans = Vec::new();
            match highlighter.highlight_line(line, &self.syntax_set) {
                Ok(ranges) => {
                    for (style, text) in ranges {
                        let color = syntect_to_ratatui_color(&style.foreground);
                        spans.push(Span::styled(
                            text.trim_end_matches('\n').to_string(),
                            Style::default().fg(color),
                        ));
                    }
                }
                Err(_) => {
                    spans.push(Span::styled(
                        line.trim_end_matches('\n').to_string(),
                        Style::default().fg(self.text_color()),
                    ));
                }
            }
            lines.push(spans);
        }

        lines
    }

    /// Default text color from the syntect theme
    pub fn text_color(&self) -> Color {
        let foreground = self
            .theme
            .settings
            .foreground
            .unwrap_or(syntect::highlighting::Color { r: 198, g: 200, b: 209, a: 255 });
        Color::Rgb(foreground.r, foreground.g, foreground.b)
    }
}

fn syntect_to_ratatui_color(color: &syntect::highlighting::Color) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}
