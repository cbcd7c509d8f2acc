//! Static landing page

use crate::events::AppEvent;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};

pub const TITLE: &str = "The Modern Sage";

/// Works the endpoint draws its answers from
pub const SOURCES: [&str; 4] = [
    "Atomic Habits",
    "Ikigai",
    "The 7 Habits of Highly Effective People",
    "The Bhagavad Gita",
];

/// Landing screen shown before the conversation starts
#[derive(Debug, Clone, Copy, Default)]
pub struct LandingPage;

impl LandingPage {
    pub fn new() -> Self {
        Self
    }

    pub fn handle_key(&self, key: KeyEvent) -> Option<AppEvent> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        match key.code {
            KeyCode::Enter | KeyCode::Char(' ') => Some(AppEvent::StartConversation),
            KeyCode::Esc | KeyCode::Char('q') => Some(AppEvent::Exit),
            _ => None,
        }
    }

    fn hero_lines() -> Vec<Line<'static>> {
        vec![
            Line::from(vec![
                Span::styled("● ", Style::default().fg(Color::Green)),
                Span::styled("Advanced RAG V2 Active", Style::default().fg(Color::Gray)),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                TITLE,
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(vec![
                Span::raw("Where "),
                Span::styled("Modern Psychology", Style::default().fg(Color::Blue)),
                Span::raw(" meets "),
                Span::styled("Ancient Wisdom", Style::default().fg(Color::Magenta)),
                Span::raw("."),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                "A dual-perspective AI guided by behavioral psychology and timeless philosophy.",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(Span::styled(
                "Grounded in truth, backed by citations.",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(""),
            Line::from(""),
            Line::from(Span::styled(
                "[ Press Enter to start consultation → ]",
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled("q to quit", Style::default().fg(Color::DarkGray))),
        ]
    }

    fn footer_line() -> Line<'static> {
        let mut spans = vec![Span::styled(
            "Synthesizing insights from ",
            Style::default().fg(Color::Gray),
        )];
        for (i, source) in SOURCES.iter().enumerate() {
            if i > 0 {
                let separator = if i == SOURCES.len() - 1 { ", and " } else { ", " };
                spans.push(Span::styled(separator, Style::default().fg(Color::Gray)));
            }
            spans.push(Span::styled(*source, Style::default().fg(Color::White)));
        }
        spans.push(Span::styled(".", Style::default().fg(Color::Gray)));
        Line::from(spans)
    }
}

impl Widget for LandingPage {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let hero = Self::hero_lines();
        let hero_height = hero.len() as u16;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(hero_height),
                Constraint::Min(0),
                Constraint::Length(2), // Footer
            ])
            .split(area);

        Paragraph::new(hero)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[1], buf);

        Paragraph::new(Self::footer_line())
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[3], buf);
    }
}
