use crate::client::ChatBackend;
use crate::config::UiConfig;
use crate::session::{SessionController, SessionState, SubmitOutcome};
use crate::ui::conversation::composer::{ConversationComposer, ConversationResult};
use crate::ui::conversation::history::TranscriptView;
use crate::ui::conversation::{ParsedCommand, SlashCommand, get_help_text};
use crate::ui::wrap_text;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use std::cell::Cell;

/// Transcript lines moved per PgUp/PgDn
const SCROLL_STEP: usize = 5;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    GoHome,
    Exit,
}

/// Conversation screen: session controller plus its widgets
pub struct ConversationManager<B: ChatBackend> {
    session: SessionController<B>,
    composer: ConversationComposer,
    ui: UiConfig,
    frame: usize,
    scroll_back: usize,
    notice: Option<String>,
    /// Transcript area of the last render, used to bound scrolling
    transcript_area: Cell<Rect>,
}

impl<B: ChatBackend> ConversationManager<B> {
    pub fn new(session: SessionController<B>, ui: UiConfig) -> Self {
        let mut composer = ConversationComposer::new("Type your question...");
        composer.set_focus(true);

        Self {
            session,
            composer,
            ui,
            frame: 0,
            scroll_back: 0,
            notice: None,
            transcript_area: Cell::new(Rect::default()),
        }
    }

    pub fn state(&self) -> &SessionState {
        self.session.state()
    }

    /// Advance animations and apply streamed fragments (called from main loop)
    pub fn tick(&mut self) {
        self.frame = self.frame.wrapping_add(1);
        self.session.poll();
        self.composer.set_phase(self.session.state().phase());
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        if self.notice.is_some() {
            self.notice = None;
            if key.code == KeyCode::Esc {
                return ConversationAction::None;
            }
        }

        match key.code {
            KeyCode::PageUp => {
                self.scroll_up(SCROLL_STEP);
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.scroll_back = self.scroll_back.saturating_sub(SCROLL_STEP);
                return ConversationAction::None;
            }
            KeyCode::Esc if !self.composer.is_palette_open() => {
                return ConversationAction::GoHome;
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return ConversationAction::Exit;
            }
            _ => {}
        }

        let result = self.composer.handle_key(key);
        self.handle_result(result)
    }

    /// Handle text pasted into the terminal
    pub fn handle_paste(&mut self, text: &str) -> ConversationAction {
        let result = self.composer.insert_str(text);
        self.handle_result(result)
    }

    fn handle_result(&mut self, result: ConversationResult) -> ConversationAction {
        match result {
            ConversationResult::Edited(content) => {
                self.session.update_input(content);
                ConversationAction::None
            }
            ConversationResult::Submitted(content) => {
                self.session.update_input(content);
                if let SubmitOutcome::Accepted { .. } = self.session.submit_input() {
                    self.composer.clear();
                    self.scroll_back = 0;
                }
                ConversationAction::None
            }
            ConversationResult::Command(command) => {
                self.session.update_input(String::new());
                self.handle_slash_command(command)
            }
            ConversationResult::None => ConversationAction::None,
        }
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, command: ParsedCommand) -> ConversationAction {
        if let Some(argument) = command.argument {
            // Commands take no arguments
            self.notice = Some(format!(
                "/{} does not take arguments (got \"{}\").\n\n{}",
                command.command.command(),
                argument,
                get_help_text()
            ));
            return ConversationAction::None;
        }

        match command.command {
            SlashCommand::Home => ConversationAction::GoHome,
            SlashCommand::Bye => ConversationAction::Exit,
            SlashCommand::Help => {
                self.notice = Some(get_help_text());
                ConversationAction::None
            }
        }
    }

    fn scroll_up(&mut self, step: usize) {
        let area = self.transcript_area.get();
        let inner_width = area.width.saturating_sub(2);
        let inner_height = area.height.saturating_sub(2) as usize;
        let total = TranscriptView::new(self.session.state(), self.ui.show_timestamps, self.frame)
            .lines(inner_width)
            .len();
        let max = total.saturating_sub(inner_height);
        self.scroll_back = (self.scroll_back + step).min(max);
    }

    fn render_header(area: Rect, buf: &mut Buffer) {
        let lines = vec![
            Line::from(Span::styled(
                "The Modern Sage",
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "Modern Psychology meets Ancient Spirituality",
                Style::default().fg(Color::Gray),
            )),
        ];
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::BOTTOM))
            .render(area, buf);
    }

    fn render_notice(notice: &str, area: Rect, buf: &mut Buffer) {
        let width = area.width.saturating_sub(4).max(1);
        let wrapped = wrap_text(notice, width.saturating_sub(2) as usize);
        let height = (wrapped.len() as u16 + 2).min(area.height);
        let notice_area = Rect {
            x: area.x + 2.min(area.width),
            y: area.y,
            width,
            height,
        }
        .intersection(area);
        if notice_area.is_empty() {
            return;
        }

        Clear.render(notice_area, buf);
        Paragraph::new(wrapped.into_iter().map(Line::from).collect::<Vec<_>>())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Help (any key to close)")
                    .style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: false })
            .render(notice_area, buf);
    }
}

impl<B: ChatBackend> Widget for &ConversationManager<B> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Create layout: header, history takes most space, composer at bottom
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(5),    // History
                Constraint::Length(3), // Composer
            ])
            .split(area);

        ConversationManager::<B>::render_header(chunks[0], buf);

        self.transcript_area.set(chunks[1]);
        TranscriptView::new(self.session.state(), self.ui.show_timestamps, self.frame)
            .scroll_back(self.scroll_back)
            .render(chunks[1], buf);

        self.composer.render(chunks[2], buf);

        if let Some(notice) = &self.notice {
            ConversationManager::<B>::render_notice(notice, chunks[1], buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChatRequest;
    use crate::events::{MessageStatus, StreamEvent};
    use crate::ui::test_support::buffer_text;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    /// Backend that keeps every stream sender for the test
    #[derive(Clone, Default)]
    struct HeldBackend {
        senders: Arc<Mutex<Vec<mpsc::Sender<StreamEvent>>>>,
        tokens: Arc<Mutex<Vec<CancellationToken>>>,
    }

    impl ChatBackend for HeldBackend {
        fn open_stream(&self, _request: ChatRequest, cancel: CancellationToken) -> mpsc::Receiver<StreamEvent> {
            let (tx, rx) = mpsc::channel(16);
            self.senders.lock().unwrap().push(tx);
            self.tokens.lock().unwrap().push(cancel);
            rx
        }
    }

    fn manager() -> (ConversationManager<HeldBackend>, HeldBackend) {
        let backend = HeldBackend::default();
        let manager = ConversationManager::new(SessionController::new(backend.clone()), UiConfig::default());
        (manager, backend)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(manager: &mut ConversationManager<HeldBackend>, text: &str) {
        for c in text.chars() {
            manager.handle_key(press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn typing_updates_session_input() {
        let (mut manager, _) = manager();
        type_text(&mut manager, "What is Dharma?");
        assert_eq!(manager.state().input_buffer, "What is Dharma?");
    }

    #[test]
    fn enter_submits_and_clears_composer() {
        let (mut manager, backend) = manager();
        type_text(&mut manager, "What is Dharma?");
        manager.handle_key(press(KeyCode::Enter));

        assert_eq!(manager.state().messages.len(), 2);
        assert_eq!(manager.state().input_buffer, "");
        assert!(manager.state().is_loading);

        let tx = backend.senders.lock().unwrap()[0].clone();
        tx.try_send(StreamEvent::Delta("Duty.".to_string())).unwrap();
        tx.try_send(StreamEvent::Done).unwrap();
        manager.tick();

        assert_eq!(manager.state().messages[1].content, "Duty.");
        assert_eq!(manager.state().messages[1].status, MessageStatus::Complete);
        assert!(!manager.state().is_loading);
    }

    #[test]
    fn draft_survives_rejected_submit() {
        let (mut manager, _) = manager();
        type_text(&mut manager, "first");
        manager.handle_key(press(KeyCode::Enter));
        type_text(&mut manager, "second");
        manager.handle_key(press(KeyCode::Enter));

        assert_eq!(manager.state().messages.len(), 2);
        assert_eq!(manager.state().input_buffer, "second");
    }

    #[test]
    fn command_with_arguments_is_not_run() {
        let (mut manager, _) = manager();
        type_text(&mut manager, "/home now please");
        assert_eq!(manager.handle_key(press(KeyCode::Enter)), ConversationAction::None);

        let notice = manager.notice.clone().unwrap();
        assert!(notice.contains("/home does not take arguments"));
        assert!(notice.contains("now please"));
        assert!(manager.state().messages.is_empty());
    }

    #[test]
    fn slash_commands_map_to_actions() {
        let (mut manager, _) = manager();
        type_text(&mut manager, "/bye");
        assert_eq!(manager.handle_key(press(KeyCode::Enter)), ConversationAction::Exit);

        type_text(&mut manager, "/home");
        assert_eq!(manager.handle_key(press(KeyCode::Enter)), ConversationAction::GoHome);

        type_text(&mut manager, "/help");
        assert_eq!(manager.handle_key(press(KeyCode::Enter)), ConversationAction::None);
        assert!(manager.notice.is_some());
        assert!(manager.state().messages.is_empty());
    }

    #[test]
    fn help_notice_renders_and_closes() {
        let (mut manager, _) = manager();
        type_text(&mut manager, "/help");
        manager.handle_key(press(KeyCode::Enter));

        let area = Rect::new(0, 0, 80, 30);
        let mut buf = Buffer::empty(area);
        (&manager).render(area, &mut buf);
        assert!(buffer_text(&buf).contains("/bye"));

        manager.handle_key(press(KeyCode::Esc));
        assert!(manager.notice.is_none());
    }

    #[test]
    fn renders_header_and_composer() {
        let (manager, _) = manager();
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        (&manager).render(area, &mut buf);

        let text = buffer_text(&buf);
        assert!(text.contains("The Modern Sage"));
        assert!(text.contains("Modern Psychology meets Ancient Spirituality"));
        assert!(text.contains("Type your question..."));
    }

    #[test]
    fn renders_in_short_and_narrow_terminals() {
        let (mut manager, backend) = manager();
        type_text(&mut manager, "What is Dharma?");
        manager.handle_key(press(KeyCode::Enter));
        let tx = backend.senders.lock().unwrap()[0].clone();
        tx.try_send(StreamEvent::Delta("Duty.".to_string())).unwrap();
        manager.tick();
        type_text(&mut manager, "/he");

        for height in 1..=11 {
            for width in [40, 3, 1] {
                let area = Rect::new(0, 0, width, height);
                let mut buf = Buffer::empty(area);
                (&manager).render(area, &mut buf);
            }
        }
    }

    #[test]
    fn help_notice_renders_in_short_terminals() {
        let (mut manager, _) = manager();
        type_text(&mut manager, "/help");
        manager.handle_key(press(KeyCode::Enter));
        assert!(manager.notice.is_some());
        for height in 1..=11 {
            let area = Rect::new(0, 0, 40, height);
            let mut buf = Buffer::empty(area);
            (&manager).render(area, &mut buf);
        }
    }

    #[test]
    fn escape_goes_home() {
        let (mut manager, _) = manager();
        assert_eq!(manager.handle_key(press(KeyCode::Esc)), ConversationAction::GoHome);
    }

    #[test]
    fn paste_inserts_text() {
        let (mut manager, _) = manager();
        manager.handle_paste("Why do I\r\nprocrastinate?");
        assert_eq!(manager.state().input_buffer, "Why do I\nprocrastinate?");
    }
}
