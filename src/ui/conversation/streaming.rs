use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// Ticks per animation step
const TICKS_PER_STEP: usize = 6;

/// "Thinking..." line shown while waiting for the first fragment
#[derive(Debug, Clone, Copy)]
pub struct ThinkingIndicator {
    frame: usize,
}

impl ThinkingIndicator {
    pub fn new(frame: usize) -> Self {
        Self { frame }
    }

    fn dots(&self) -> &'static str {
        match (self.frame / TICKS_PER_STEP) % 4 {
            0 => ".  ",
            1 => ".. ",
            2 => "...",
            _ => "   ",
        }
    }

    pub fn line(&self) -> Line<'static> {
        Line::from(vec![
            Span::styled(
                "Thinking",
                Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
            ),
            Span::styled(self.dots(), Style::default().fg(Color::Yellow)),
        ])
    }
}

impl Widget for ThinkingIndicator {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        buf.set_line(area.x, area.y, &self.line(), area.width);
    }
}

/// Block cursor appended to a streaming answer, blinking with the frame
pub fn streaming_cursor(frame: usize) -> Span<'static> {
    let symbol = if (frame / TICKS_PER_STEP) % 2 == 0 { "▋" } else { " " };
    Span::styled(symbol, Style::default().fg(Color::Magenta))
}
