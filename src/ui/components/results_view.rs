use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::session::result::TestResult;
use crate::ui::theme::Theme;

pub struct ResultsView<'a> {
    result: &'a TestResult,
    theme: &'a Theme,
}

impl<'a> ResultsView<'a> {
    pub fn new(result: &'a TestResult, theme: &'a Theme) -> Self {
        Self { result, theme }
    }
}

impl Widget for ResultsView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let m = &self.result.metrics;
        let label = Style::default().fg(colors.text_pending());
        let value = Style::default()
            .fg(colors.accent())
            .add_modifier(Modifier::BOLD);

        let headline = Line::from(vec![
            Span::styled("WPM ", label),
            Span::styled(m.wpm.to_string(), value),
            Span::styled("   Acc ", label),
            Span::styled(format!("{}%", m.accuracy_percent), value),
        ]);
        let details = Line::from(Span::styled(
            format!(
                "Raw {}   CPM {}   {:.2} sec   Words {}   Chars {}",
                m.raw_wpm, m.cpm, m.elapsed_secs, m.word_count, m.character_count
            ),
            Style::default().fg(colors.fg()),
        ));

        let typed: Vec<char> = self.result.user_input.chars().collect();
        let sentence_spans: Vec<Span> = self
            .result
            .sentence
            .chars()
            .enumerate()
            .map(|(i, expected)| match typed.get(i) {
                Some(&actual) if actual == expected => Span::styled(
                    expected.to_string(),
                    Style::default().fg(colors.text_correct()),
                ),
                Some(_) if expected == ' ' => Span::styled(
                    "_",
                    Style::default()
                        .fg(colors.text_incorrect())
                        .bg(colors.text_incorrect_bg()),
                ),
                Some(_) => Span::styled(
                    expected.to_string(),
                    Style::default()
                        .fg(colors.text_incorrect())
                        .add_modifier(Modifier::UNDERLINED),
                ),
                None => Span::styled(expected.to_string(), label),
            })
            .collect();

        let lines = vec![
            headline,
            Line::default(),
            Line::from(sentence_spans),
            Line::default(),
            details,
            Line::from(Span::styled(
                format!("{} mistakes", self.result.wrong_positions.len()),
                label,
            )),
        ];

        let block = Block::bordered()
            .title(" Results ")
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}
