use std::time::Duration;

use chrono::Local;
use tokio::task::JoinHandle;
use travelbot_core::{Completion, Resolution, SessionController, SubmitError, Turn};

pub const WELCOME_MESSAGE: &str = "Welcome to TravelBot! I'm your personal AI travel assistant for Sri Lanka. \
How can I help plan your perfect journey today?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Input line
    pub input: String,
    pub cursor: usize, // cursor position in chars

    // Conversation
    pub session: SessionController,
    pub task: Option<JoinHandle<Completion>>,
    pub status: Option<String>,

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16,      // Height of chat area for scroll calculations
    pub total_chat_lines: u16, // Updated during render
    pub follow_tail: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
    pub thinking_delay: Duration,
}

impl App {
    pub fn new(session: SessionController, thinking_delay: Duration) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            input: String::new(),
            cursor: 0,
            session,
            task: None,
            status: None,
            chat_scroll: 0,
            chat_height: 0,
            total_chat_lines: 0,
            follow_tail: true,
            animation_frame: 0,
            thinking_delay,
        }
    }

    pub fn tick_animation(&mut self) {
        self.animation_frame = (self.animation_frame + 1) % 3;
    }

    /// The thinking indicator only appears once the placeholder has been
    /// waiting for `thinking_delay`.
    pub fn thinking_visible(&self, turn: &Turn) -> bool {
        (Local::now() - turn.created_at)
            .to_std()
            .map(|elapsed| elapsed >= self.thinking_delay)
            .unwrap_or(false)
    }

    // Input editing
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    /// Send the input line. Blank input is ignored.
    pub fn submit_input(&mut self) {
        match self.session.submit(&self.input) {
            Ok(pending) => {
                self.task = Some(self.session.dispatch(pending));
                self.input.clear();
                self.cursor = 0;
                self.status = None;
                self.follow_tail = true;
            }
            Err(SubmitError::EmptyMessage) => {}
            Err(e @ SubmitError::Busy(_)) => {
                self.status = Some(e.to_string());
            }
        }
    }

    /// Resolve the in-flight request if its task has finished.
    pub async fn poll_task(&mut self) {
        if !self.task.as_ref().is_some_and(|task| task.is_finished()) {
            return;
        }
        let Some(task) = self.task.take() else {
            return;
        };

        let resolution = match task.await {
            Ok(completion) => self.session.resolve(completion),
            Err(e) => match self.session.abandon(&format!("request task failed: {}", e)) {
                Some(resolution) => resolution,
                None => return,
            },
        };

        if let Resolution::Failed { error, .. } = resolution {
            self.status = Some(error);
        }
        self.follow_tail = true;
    }

    /// Start over with an empty conversation.
    pub fn new_chat(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.session.reset();
        self.status = None;
        self.chat_scroll = 0;
        self.follow_tail = true;
    }

    // Chat scrolling
    fn max_scroll(&self) -> u16 {
        self.total_chat_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = (self.chat_scroll + 1).min(self.max_scroll());
        self.follow_tail = self.chat_scroll == self.max_scroll();
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
        self.follow_tail = false;
    }

    pub fn scroll_half_page_down(&mut self) {
        let half_page = self.chat_height / 2;
        self.chat_scroll = (self.chat_scroll + half_page).min(self.max_scroll());
        self.follow_tail = self.chat_scroll == self.max_scroll();
    }

    pub fn scroll_half_page_up(&mut self) {
        let half_page = self.chat_height / 2;
        self.chat_scroll = self.chat_scroll.saturating_sub(half_page);
        self.follow_tail = false;
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
        self.follow_tail = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
        self.follow_tail = true;
    }

    /// Called by the renderer once the chat height is known.
    pub fn update_chat_layout(&mut self, total_lines: u16, height: u16) {
        self.total_chat_lines = total_lines;
        self.chat_height = height;
        if self.follow_tail {
            self.chat_scroll = self.max_scroll();
        } else {
            self.chat_scroll = self.chat_scroll.min(self.max_scroll());
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;
    use travelbot_core::{CompletionClient, FailurePolicy, GeminiBackend, Phase, TurnKind};

    /// An app whose endpoint refuses connections.
    pub(crate) fn offline_app() -> App {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/generate", listener.local_addr().unwrap());
        drop(listener);

        let client = CompletionClient::new(Arc::new(GeminiBackend::new(&url)));
        let session = SessionController::new(client, "You are TravelAI.", FailurePolicy::ReplaceWithNotice);
        App::new(session, Duration::from_millis(600))
    }

    #[test]
    fn test_input_editing_is_utf8_safe() {
        let mut app = offline_app();
        for c in "Café".chars() {
            app.insert_char(c);
        }
        app.cursor_left();
        app.backspace();
        assert_eq!(app.input, "Caé");
        app.cursor_home();
        app.delete();
        assert_eq!(app.input, "aé");
        app.cursor_end();
        app.insert_char('!');
        assert_eq!(app.input, "aé!");
        assert_eq!(app.cursor, 3);
    }

    #[tokio::test]
    async fn test_blank_input_is_not_sent() {
        let mut app = offline_app();
        app.input = "   ".to_string();
        app.submit_input();
        assert!(app.task.is_none());
        assert_eq!(app.session.turns().count(), 0);
    }

    #[tokio::test]
    async fn test_failed_request_shows_notice_and_status() {
        let mut app = offline_app();
        app.input = "Best beaches?".to_string();
        app.cursor = app.input.chars().count();
        app.submit_input();

        assert!(app.input.is_empty());
        assert!(app.task.is_some());
        assert!(app.session.is_awaiting());

        for _ in 0..200 {
            app.poll_task().await;
            if app.task.is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(app.session.phase(), Phase::Idle);
        let kinds: Vec<TurnKind> = app.session.turns().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TurnKind::Message, TurnKind::Notice]);
        assert!(app.status.is_some());
    }

    #[tokio::test]
    async fn test_new_chat_clears_conversation() {
        let mut app = offline_app();
        app.input = "hello".to_string();
        app.submit_input();
        app.new_chat();

        assert!(app.task.is_none());
        assert_eq!(app.session.turns().count(), 0);
        assert!(!app.session.is_awaiting());
    }

    #[test]
    fn test_scroll_is_clamped_and_follows_tail() {
        let mut app = offline_app();
        app.update_chat_layout(30, 10);
        assert_eq!(app.chat_scroll, 20);

        app.scroll_up();
        assert!(!app.follow_tail);
        app.update_chat_layout(40, 10);
        assert_eq!(app.chat_scroll, 19);

        app.scroll_to_bottom();
        assert_eq!(app.chat_scroll, 30);
        app.scroll_down();
        assert_eq!(app.chat_scroll, 30);
        assert!(app.follow_tail);
    }

    #[test]
    fn test_thinking_indicator_waits_for_delay() {
        let app = offline_app();
        let mut turn = Turn::placeholder();
        assert!(!app.thinking_visible(&turn));
        turn.created_at = Local::now() - chrono::Duration::seconds(2);
        assert!(app.thinking_visible(&turn));
    }
}
