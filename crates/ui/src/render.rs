//! Rendering of transcript messages into terminal lines.
//!
//! Assistant messages are parsed as markdown; user messages render literally
//! so nothing the user typed is ever interpreted as markup. Rendering is a
//! pure function of the message, so re-rendering the same content yields
//! the same lines.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use crate::syntax::SyntaxHighlighter;
use crate::theme::Theme;
use crate::transcript::{MessageEntry, Notice};

/// Renders messages against a theme at a fixed width.
pub struct MessageRenderer<'a> {
    theme: &'a Theme,
    highlighter: &'a SyntaxHighlighter,
    width: usize,
}

impl<'a> MessageRenderer<'a> {
    pub fn new(theme: &'a Theme, highlighter: &'a SyntaxHighlighter, width: usize) -> Self {
        Self { theme, highlighter, width: width.max(8) }
    }

    /// Render one message to styled lines, label included.
    pub fn render(&self, entry: &MessageEntry) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        let (label, label_style) = if entry.is_user() {
            ("you", self.theme.role_style(true).add_modifier(Modifier::BOLD))
        } else {
            ("rill", self.theme.role_style(false).add_modifier(Modifier::BOLD))
        };
        lines.push(Line::from(Span::styled(label.to_string(), label_style)));

        if entry.is_user() {
            self.render_literal(&entry.content, &mut lines);
        } else {
            self.render_markdown(&entry.content, &mut lines);
        }

        if entry.streaming {
            let cursor = Span::styled("▌".to_string(), self.theme.muted());
            if entry.content.is_empty() {
                lines.push(Line::from(cursor));
            } else if let Some(last) = lines.last_mut() {
                last.spans.push(cursor);
            }
        }

        if let Some(notice) = &entry.notice {
            let (text, style) = match notice {
                Notice::Stopped => (rill_core::GENERATION_STOPPED_NOTICE.to_string(), self.theme.muted()),
                Notice::Error(message) => (format!("error: {}", message), self.theme.error()),
            };
            lines.push(Line::from(Span::styled(text, style.add_modifier(Modifier::ITALIC))));
        }

        lines.push(Line::default());
        lines
    }

    /// Literal rendering: wrap, never interpret.
    fn render_literal(&self, text: &str, lines: &mut Vec<Line<'static>>) {
        let style = self.theme.base();
        for raw_line in text.split('\n') {
            if raw_line.is_empty() {
                lines.push(Line::default());
                continue;
            }
            for wrapped in textwrap::wrap(raw_line, self.width) {
                lines.push(Line::from(Span::styled(wrapped.to_string(), style)));
            }
        }
    }

    fn render_markdown(&self, text: &str, lines: &mut Vec<Line<'static>>) {
        let parser = Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH);

        let mut spans: Vec<Span<'static>> = Vec::new();
        let mut style_stack: Vec<Style> = vec![self.theme.base()];
        let mut code_block: Option<(String, String)> = None;
        let mut list_depth: usize = 0;

        for event in parser {
            match event {
                Event::Start(Tag::Paragraph) => {}
                Event::End(TagEnd::Paragraph) => {
                    self.flush(&mut spans, lines);
                    lines.push(Line::default());
                }
                Event::Start(Tag::Heading { .. }) => {
                    self.flush(&mut spans, lines);
                    style_stack.push(
                        Style::default().fg(self.theme.accent).add_modifier(Modifier::BOLD),
                    );
                }
                Event::End(TagEnd::Heading(..)) => {
                    style_stack.pop();
                    self.flush(&mut spans, lines);
                    lines.push(Line::default());
                }
                Event::Start(Tag::Strong) => {
                    style_stack.push(self.current(&style_stack).add_modifier(Modifier::BOLD));
                }
                Event::End(TagEnd::Strong) => {
                    style_stack.pop();
                }
                Event::Start(Tag::Emphasis) => {
                    style_stack.push(self.current(&style_stack).add_modifier(Modifier::ITALIC));
                }
                Event::End(TagEnd::Emphasis) => {
                    style_stack.pop();
                }
                Event::Start(Tag::CodeBlock(kind)) => {
                    self.flush(&mut spans, lines);
                    let lang = match kind {
                        CodeBlockKind::Fenced(lang) => lang.to_string(),
                        CodeBlockKind::Indented => String::new(),
                    };
                    code_block = Some((lang, String::new()));
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((lang, code)) = code_block.take() {
                        self.render_code_block(&lang, &code, lines);
                    }
                }
                Event::Start(Tag::List(_)) => {
                    self.flush(&mut spans, lines);
                    list_depth += 1;
                }
                Event::End(TagEnd::List(_)) => {
                    list_depth = list_depth.saturating_sub(1);
                    if list_depth == 0 {
                        lines.push(Line::default());
                    }
                }
                Event::Start(Tag::Item) => {
                    let indent = "  ".repeat(list_depth.saturating_sub(1));
                    spans.push(Span::styled(
                        format!("{}• ", indent),
                        Style::default().fg(self.theme.accent),
                    ));
                }
                Event::End(TagEnd::Item) => {
                    self.flush(&mut spans, lines);
                }
                Event::Text(text) => {
                    if let Some((_, code)) = code_block.as_mut() {
                        code.push_str(&text);
                    } else {
                        spans.push(Span::styled(text.to_string(), self.current(&style_stack)));
                    }
                }
                Event::Code(code) => {
                    spans.push(Span::styled(
                        code.to_string(),
                        Style::default().fg(self.theme.user).bg(self.theme.panel_bg),
                    ));
                }
                Event::SoftBreak => {
                    spans.push(Span::styled(" ".to_string(), self.current(&style_stack)));
                }
                Event::HardBreak => {
                    self.flush(&mut spans, lines);
                }
                Event::Rule => {
                    self.flush(&mut spans, lines);
                    lines.push(Line::from(Span::styled(
                        "─".repeat(self.width),
                        self.theme.border(),
                    )));
                }
                _ => {}
            }
        }

        self.flush(&mut spans, lines);

        // Drop a trailing blank so the message does not end double-spaced.
        while lines.last().is_some_and(|l| l.spans.is_empty()) {
            lines.pop();
        }
    }

    fn current(&self, stack: &[Style]) -> Style {
        stack.last().copied().unwrap_or_else(|| self.theme.base())
    }

    /// Emit pending inline spans as wrapped lines.
    fn flush(&self, spans: &mut Vec<Span<'static>>, lines: &mut Vec<Line<'static>>) {
        if spans.is_empty() {
            return;
        }
        for line in wrap_spans(std::mem::take(spans), self.width) {
            lines.push(line);
        }
    }

    fn render_code_block(&self, lang: &str, code: &str, lines: &mut Vec<Line<'static>>) {
        let panel = self.theme.panel_bg;
        for span_line in self.highlighter.highlight_code(code, lang.trim()) {
            let styled: Vec<Span<'static>> = span_line
                .into_iter()
                .map(|span| {
                    let style = span.style.bg(panel);
                    Span::styled(span.content.into_owned(), style)
                })
                .collect();
            lines.push(Line::from(styled));
        }
        lines.push(Line::default());
    }
}

/// Greedy wrap at span boundaries, splitting oversized spans at word
/// boundaries.
fn wrap_spans(spans: Vec<Span<'static>>, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut column = 0;

    for span in spans {
        let span_width = span.content.width();
        if column + span_width <= width {
            column += span_width;
            current.push(span);
            continue;
        }

        let style = span.style;
        for piece in textwrap::wrap(&span.content, textwrap::Options::new(width)) {
            let piece_width = piece.width();
            if column + piece_width > width && !current.is_empty() {
                lines.push(Line::from(std::mem::take(&mut current)));
                column = 0;
            }
            current.push(Span::styled(piece.to_string(), style));
            column += piece_width;
        }
    }

    if !current.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Transcript;
    use rill_core::ThemePreference;

    fn renderer<'a>(
        theme: &'a Theme,
        highlighter: &'a SyntaxHighlighter,
    ) -> MessageRenderer<'a> {
        MessageRenderer::new(theme, highlighter, 60)
    }

    fn plain_text(lines: &[Line<'_>]) -> String {
        lines
            .iter()
            .map(|line| {
                line.spans.iter().map(|s| s.content.as_ref()).collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_user_message_is_literal() {
        let theme = Theme::DARK;
        let highlighter = SyntaxHighlighter::new(ThemePreference::Dark);
        let mut transcript = Transcript::new();
        let id = transcript.append_user("**not bold** `not code`");

        let lines = renderer(&theme, &highlighter).render(transcript.get(id).unwrap());
        let text = plain_text(&lines);
        assert!(text.contains("**not bold** `not code`"));
    }

    #[test]
    fn test_assistant_markdown_strips_markers() {
        let theme = Theme::DARK;
        let highlighter = SyntaxHighlighter::new(ThemePreference::Dark);
        let mut transcript = Transcript::new();
        let id = transcript.append_assistant();
        transcript.update(id, "some **bold** text");
        transcript.freeze(id);

        let lines = renderer(&theme, &highlighter).render(transcript.get(id).unwrap());
        let text = plain_text(&lines);
        assert!(text.contains("some bold text"));
        assert!(!text.contains("**"));
    }

    #[test]
    fn test_code_fence_renders_code_lines() {
        let theme = Theme::DARK;
        let highlighter = SyntaxHighlighter::new(ThemePreference::Dark);
        let mut transcript = Transcript::new();
        let id = transcript.append_assistant();
        transcript.update(id, "```rust\nfn main() {}\n```");
        transcript.freeze(id);

        let lines = renderer(&theme, &highlighter).render(transcript.get(id).unwrap());
        let text = plain_text(&lines);
        assert!(text.contains("fn main() {}"));
        assert!(!text.contains("```"));
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let theme = Theme::DARK;
        let highlighter = SyntaxHighlighter::new(ThemePreference::Dark);
        let mut transcript = Transcript::new();
        let id = transcript.append_assistant();
        transcript.update(id, "# Title\n\n- one\n- two\n\n`inline`\n");
        transcript.freeze(id);

        let r = renderer(&theme, &highlighter);
        let first = r.render(transcript.get(id).unwrap());
        let second = r.render(transcript.get(id).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_streaming_cursor_present() {
        let theme = Theme::DARK;
        let highlighter = SyntaxHighlighter::new(ThemePreference::Dark);
        let mut transcript = Transcript::new();
        let id = transcript.append_assistant();
        transcript.update(id, "partial");

        let lines = renderer(&theme, &highlighter).render(transcript.get(id).unwrap());
        assert!(plain_text(&lines).contains("▌"));
    }

    #[test]
    fn test_stopped_notice_rendered() {
        let theme = Theme::DARK;
        let highlighter = SyntaxHighlighter::new(ThemePreference::Dark);
        let mut transcript = Transcript::new();
        let id = transcript.append_assistant();
        transcript.set_notice(id, Notice::Stopped);

        let lines = renderer(&theme, &highlighter).render(transcript.get(id).unwrap());
        assert!(plain_text(&lines).contains(rill_core::GENERATION_STOPPED_NOTICE));
    }

    #[test]
    fn test_error_notice_rendered() {
        let theme = Theme::DARK;
        let highlighter = SyntaxHighlighter::new(ThemePreference::Dark);
        let mut transcript = Transcript::new();
        let id = transcript.append_assistant();
        transcript.update(id, "partial answer");
        transcript.set_notice(id, Notice::Error("endpoint returned status 500".into()));

        let lines = renderer(&theme, &highlighter).render(transcript.get(id).unwrap());
        let text = plain_text(&lines);
        assert!(text.contains("partial answer"));
        assert!(text.contains("endpoint returned status 500"));
    }

    #[test]
    fn test_long_line_wraps() {
        let theme = Theme::DARK;
        let highlighter = SyntaxHighlighter::new(ThemePreference::Dark);
        let mut transcript = Transcript::new();
        let id = transcript.append_user("word ".repeat(40));

        let lines = renderer(&theme, &highlighter).render(transcript.get(id).unwrap());
        // Label line, several wrapped content lines, trailing blank.
        assert!(lines.len() > 3);
    }
}
