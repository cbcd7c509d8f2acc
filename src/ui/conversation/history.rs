//! Conversation transcript display component

use crate::events::{Message, MessageStatus, Role};
use crate::session::SessionState;
use crate::ui::conversation::streaming::{ThinkingIndicator, streaming_cursor};
use crate::ui::wrap_text;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Questions offered on an empty transcript
pub const EXAMPLE_QUESTIONS: [&str; 3] = [
    "How do I build better habits?",
    "What is Dharma?",
    "Why do I procrastinate?",
];

/// Read-only view of the transcript.
///
/// Output depends only on the session state, the options and the animation
/// frame.
pub struct TranscriptView<'a> {
    state: &'a SessionState,
    show_timestamps: bool,
    frame: usize,
    scroll_back: usize,
}

impl<'a> TranscriptView<'a> {
    pub fn new(state: &'a SessionState, show_timestamps: bool, frame: usize) -> Self {
        Self {
            state,
            show_timestamps,
            frame,
            scroll_back: 0,
        }
    }

    /// Lines scrolled up from the bottom
    pub fn scroll_back(mut self, lines: usize) -> Self {
        self.scroll_back = lines;
        self
    }

    /// Every transcript line for the given content width
    pub fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        if let Some(error) = &self.state.last_error {
            for (i, text) in wrap_text(&error.message, width.saturating_sub(7) as usize)
                .into_iter()
                .enumerate()
            {
                let label = if i == 0 { "Error: " } else { "       " };
                lines.push(Line::from(vec![
                    Span::styled(label, Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
                    Span::styled(text, Style::default().fg(Color::Red)),
                ]));
            }
            lines.push(Line::from(""));
        }

        if self.state.messages.is_empty() {
            lines.extend(Self::empty_state());
            return lines;
        }

        for message in &self.state.messages {
            lines.extend(self.render_message(message, width));
            // spacing between messages
            lines.push(Line::from(""));
        }

        lines
    }

    fn empty_state() -> Vec<Line<'static>> {
        let mut lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Ask me anything about habits, mindset, or life's purpose.",
                Style::default().fg(Color::Gray),
            )),
            Line::from(""),
        ];
        for question in EXAMPLE_QUESTIONS {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(format!("\"{}\"", question), Style::default().fg(Color::DarkGray)),
            ]));
        }
        lines
    }

    /// Render a single message into lines
    fn render_message(&self, message: &Message, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        let label_color = match message.role {
            Role::User => Color::Blue,
            Role::Assistant => Color::Magenta,
        };

        let mut header = vec![Span::styled(
            message.role.display_name(),
            Style::default().fg(label_color).add_modifier(Modifier::BOLD),
        )];
        if self.show_timestamps {
            let timestamp = message.created_at.format("%H:%M:%S").to_string();
            header.push(Span::styled(format!(" {}", timestamp), Style::default().fg(Color::DarkGray)));
        }
        lines.push(Line::from(header));

        if message.status == MessageStatus::Pending && message.content.is_empty() {
            let mut thinking = ThinkingIndicator::new(self.frame).line();
            thinking.spans.insert(0, Span::raw("  "));
            lines.push(thinking);
            return lines;
        }

        let content_style = self.content_style(message);
        let content_lines = wrap_text(&message.content, width.saturating_sub(3) as usize);
        let last = content_lines.len().saturating_sub(1);

        for (i, content_line) in content_lines.into_iter().enumerate() {
            let mut spans = vec![Span::raw("  "), Span::styled(content_line, content_style)];
            if i == last && message.status == MessageStatus::Streaming {
                spans.push(streaming_cursor(self.frame));
            }
            lines.push(Line::from(spans));
        }

        if message.status == MessageStatus::Failed {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(
                    "✗ answer interrupted",
                    Style::default().fg(Color::Red).add_modifier(Modifier::ITALIC),
                ),
            ]));
        }

        lines
    }

    /// Get content style based on role and status
    fn content_style(&self, message: &Message) -> Style {
        match (message.role, message.status) {
            (_, MessageStatus::Failed) => Style::default().fg(Color::DarkGray),
            (Role::User, _) => Style::default().fg(Color::Blue),
            (Role::Assistant, _) => Style::default().fg(Color::White),
        }
    }
}

impl Widget for TranscriptView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title("Conversation");

        let inner_area = block.inner(area);
        block.render(area, buf);
        if inner_area.height == 0 || inner_area.width == 0 {
            return;
        }

        let all_lines = self.lines(inner_area.width);

        // Anchor to the bottom, shifted up by the scroll offset
        let height = inner_area.height as usize;
        let end = all_lines.len().saturating_sub(self.scroll_back).max(height.min(all_lines.len()));
        let start = end.saturating_sub(height);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorInfo, ErrorKind};
    use crate::ui::test_support::{buffer_rows, buffer_text};

    fn message(role: Role, content: &str, status: MessageStatus) -> Message {
        let mut m = match role {
            Role::User => Message::user(content),
            Role::Assistant => Message::assistant_placeholder(),
        };
        m.content = content.to_string();
        m.status = status;
        m
    }

    fn render(state: &SessionState, frame: usize, width: u16, height: u16) -> Buffer {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        TranscriptView::new(state, false, frame).render(area, &mut buf);
        buf
    }

    #[test]
    fn empty_transcript_shows_examples() {
        let text = buffer_text(&render(&SessionState::default(), 0, 70, 12));
        assert!(text.contains("Ask me anything about habits"));
        for question in EXAMPLE_QUESTIONS {
            assert!(text.contains(question));
        }
    }

    #[test]
    fn shows_messages_and_thinking_indicator() {
        let state = SessionState {
            messages: vec![
                message(Role::User, "What is Dharma?", MessageStatus::Complete),
                message(Role::Assistant, "", MessageStatus::Pending),
            ],
            is_loading: true,
            ..Default::default()
        };
        let text = buffer_text(&render(&state, 12, 60, 10));
        assert!(text.contains("You"));
        assert!(text.contains("What is Dharma?"));
        assert!(text.contains("Sage"));
        assert!(text.contains("Thinking"));
    }

    #[test]
    fn error_banner_and_failed_marker() {
        let state = SessionState {
            messages: vec![
                message(Role::User, "hello", MessageStatus::Complete),
                message(Role::Assistant, "half an", MessageStatus::Failed),
            ],
            last_error: Some(ErrorInfo {
                kind: ErrorKind::Status,
                message: "Chat service returned HTTP 500".to_string(),
            }),
            ..Default::default()
        };
        let text = buffer_text(&render(&state, 0, 60, 12));
        assert!(text.contains("Error: Chat service returned HTTP 500"));
        assert!(text.contains("half an"));
        assert!(text.contains("answer interrupted"));
    }

    #[test]
    fn rendering_twice_is_identical() {
        let state = SessionState {
            messages: vec![
                message(Role::User, "Why do I procrastinate?", MessageStatus::Complete),
                message(Role::Assistant, "Because the reward is distant.", MessageStatus::Streaming),
            ],
            is_loading: true,
            ..Default::default()
        };
        let area = Rect::new(0, 0, 50, 10);
        let mut first = Buffer::empty(area);
        let mut second = Buffer::empty(area);
        TranscriptView::new(&state, true, 7).render(area, &mut first);
        TranscriptView::new(&state, true, 7).render(area, &mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn long_transcripts_show_the_latest_lines() {
        let mut messages = Vec::new();
        for i in 0..20 {
            messages.push(message(Role::User, &format!("question {}", i), MessageStatus::Complete));
            messages.push(message(Role::Assistant, &format!("answer {}", i), MessageStatus::Complete));
        }
        let state = SessionState {
            messages,
            ..Default::default()
        };

        let text = buffer_text(&render(&state, 0, 40, 8));
        assert!(text.contains("answer 19"));
        assert!(!text.contains("question 0"));

        let area = Rect::new(0, 0, 40, 8);
        let mut scrolled = Buffer::empty(area);
        TranscriptView::new(&state, false, 0)
            .scroll_back(1000)
            .render(area, &mut scrolled);
        let rows = buffer_rows(&scrolled);
        assert!(rows[1].contains("You"));
        assert!(rows[2].contains("question 0"));
    }
}
