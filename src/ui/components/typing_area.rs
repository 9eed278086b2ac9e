use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::session::diff::CharStatus;
use crate::session::typing_test::TypingTest;
use crate::ui::theme::Theme;

pub struct TypingArea<'a> {
    test: &'a TypingTest,
    theme: &'a Theme,
}

impl<'a> TypingArea<'a> {
    pub fn new(test: &'a TypingTest, theme: &'a Theme) -> Self {
        Self { test, theme }
    }
}

/// Text shown for one target char: the typed char for mismatches (a visible
/// marker when a space was missed), the target char otherwise.
fn display_char(target: char, status: CharStatus) -> char {
    match status {
        CharStatus::Incorrect(_) if target == ' ' => '\u{00b7}', // ·
        CharStatus::Incorrect(actual) => actual,
        _ => target,
    }
}

impl Widget for TypingArea<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let cursor = self.test.cursor();

        let spans: Vec<Span> = self
            .test
            .target
            .iter()
            .zip(self.test.statuses())
            .enumerate()
            .map(|(idx, (&target, status))| {
                let style = match status {
                    CharStatus::Correct => Style::default().fg(colors.text_correct()),
                    CharStatus::Incorrect(_) => Style::default()
                        .fg(colors.text_incorrect())
                        .bg(colors.text_incorrect_bg())
                        .add_modifier(Modifier::UNDERLINED),
                    CharStatus::Skipped => Style::default()
                        .fg(colors.text_skipped())
                        .add_modifier(Modifier::CROSSED_OUT),
                    CharStatus::Pending if idx == cursor => Style::default()
                        .fg(colors.text_cursor_fg())
                        .bg(colors.text_cursor_bg()),
                    CharStatus::Pending => Style::default().fg(colors.text_pending()),
                };
                Span::styled(display_char(target, status).to_string(), style)
            })
            .collect();

        let title = format!(" {}% ", (self.test.progress() * 100.0).round());
        let block = Block::bordered()
            .title(title)
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));

        Paragraph::new(Line::from(spans))
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}
