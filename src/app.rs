use crate::client::HttpChatBackend;
use crate::config::Config;
use crate::events::{AppEvent, Screen};
use crate::session::SessionController;
use crate::ui::{ConversationAction, ConversationManager, LandingPage};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Frame, Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};
use std::panic;
use tracing::{error, info};

/// Terminal application: routes between the landing page and the conversation
pub struct App {
    config: Config,
    backend: HttpChatBackend,
    screen: Screen,
    landing: LandingPage,
    conversation: Option<ConversationManager<HttpChatBackend>>,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config, start: Screen) -> Result<Self> {
        let backend = HttpChatBackend::new(&config)?;
        let mut app = Self {
            config,
            backend,
            screen: Screen::Landing,
            landing: LandingPage::new(),
            conversation: None,
            should_quit: false,
        };
        if start == Screen::Conversation {
            app.handle_event(AppEvent::StartConversation);
        }
        Ok(app)
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Apply a navigation request
    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::StartConversation => {
                info!(api_url = %self.backend.api_url(), "Conversation opened");
                let session = SessionController::new(self.backend.clone());
                self.conversation = Some(ConversationManager::new(session, self.config.ui.clone()));
                self.screen = Screen::Conversation;
            }
            AppEvent::GoHome => {
                // Dropping the session cancels any exchange still streaming
                self.conversation = None;
                self.screen = Screen::Landing;
                info!("Conversation closed");
            }
            AppEvent::Exit => {
                self.conversation = None;
                self.should_quit = true;
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.handle_event(AppEvent::Exit);
            return;
        }

        let event = match (self.screen, self.conversation.as_mut()) {
            (Screen::Conversation, Some(conversation)) => Self::conversation_event(conversation.handle_key(key)),
            _ => self.landing.handle_key(key),
        };
        if let Some(event) = event {
            self.handle_event(event);
        }
    }

    fn handle_paste(&mut self, text: &str) {
        if let Some(conversation) = self.conversation.as_mut() {
            if let Some(event) = Self::conversation_event(conversation.handle_paste(text)) {
                self.handle_event(event);
            }
        }
    }

    fn conversation_event(action: ConversationAction) -> Option<AppEvent> {
        match action {
            ConversationAction::None => None,
            ConversationAction::GoHome => Some(AppEvent::GoHome),
            ConversationAction::Exit => Some(AppEvent::Exit),
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.size();
        match (self.screen, self.conversation.as_ref()) {
            (Screen::Conversation, Some(conversation)) => frame.render_widget(conversation, area),
            _ => frame.render_widget(self.landing, area),
        }
    }

    /// Take over the terminal until the user quits
    pub fn run(mut self) -> Result<()> {
        install_panic_hook();

        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
            .context("Failed to enter alternate screen")?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

        let result = self.event_loop(&mut terminal);

        restore_terminal()?;
        terminal.show_cursor().context("Failed to show cursor")?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let tick_rate = self.config.tick_rate();

        while !self.should_quit {
            if let Some(conversation) = self.conversation.as_mut() {
                conversation.tick();
            }

            terminal.draw(|frame| self.draw(frame))?;

            if event::poll(tick_rate)? {
                match event::read()? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Paste(text) => self.handle_paste(&text),
                    _ => {}
                }
            }
        }

        Ok(())
    }
}

/// Leave raw mode and the alternate screen
fn restore_terminal() -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableBracketedPaste)
        .context("Failed to leave alternate screen")?;
    Ok(())
}

/// Restore the terminal before the panic message is printed
fn install_panic_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        error!(panic = %info, "Terminal UI panicked");
        default_hook(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::default()
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn navigates_between_screens() {
        let mut app = App::new(config(), Screen::Landing).unwrap();
        assert_eq!(app.screen(), Screen::Landing);

        app.handle_key(press(KeyCode::Enter));
        assert_eq!(app.screen(), Screen::Conversation);
        assert!(app.conversation.is_some());

        app.handle_key(press(KeyCode::Esc));
        assert_eq!(app.screen(), Screen::Landing);
        assert!(app.conversation.is_none());

        app.handle_key(press(KeyCode::Char('q')));
        assert!(app.should_quit());
    }

    #[test]
    fn can_start_in_conversation() {
        let app = App::new(config(), Screen::Conversation).unwrap();
        assert_eq!(app.screen(), Screen::Conversation);
    }

    #[test]
    fn ctrl_c_quits_from_any_screen() {
        let mut app = App::new(config(), Screen::Conversation).unwrap();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit());
    }
}
