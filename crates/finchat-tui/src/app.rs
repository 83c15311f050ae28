use finchat_core::{Action, BackendReply, ChatClient, ChatState, Failure, Ticket};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;

use crate::tui::AppEvent;

/// What the startup greeting check learned about the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    Checking,
    Online,
    Offline(String),
}

pub struct App {
    pub should_quit: bool,
    pub state: ChatState,
    pub client: ChatClient,
    pub backend_status: BackendStatus,

    // Input editing (cursor is a char index into the input buffer)
    pub cursor: usize,

    // Chat view state
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height of the chat area, set by the renderer
    pub chat_width: u16,  // inner width of the chat area, set by the renderer

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Layout areas for mouse hit-testing
    pub chat_area: Option<Rect>,
    pub send_area: Option<Rect>,

    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(client: ChatClient, events: UnboundedSender<AppEvent>) -> Self {
        Self {
            should_quit: false,
            state: ChatState::new(),
            client,
            backend_status: BackendStatus::Checking,
            cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            chat_area: None,
            send_area: None,
            events,
        }
    }

    /// Submit the input buffer and run the backend call in the background.
    pub fn send_message(&mut self) {
        let Some(dispatch) = self.state.update(Action::SubmitStarted) else {
            return;
        };
        self.cursor = 0;
        tracing::info!(ticket = %dispatch.ticket, "query submitted");

        // Scroll to bottom so "Thinking..." is visible
        self.scroll_to_bottom();

        let client = self.client.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = client.ask(&dispatch.query).await;
            let _ = events.send(AppEvent::Reply {
                ticket: dispatch.ticket,
                outcome,
            });
        });
    }

    pub fn receive_reply(&mut self, ticket: Ticket, outcome: Result<BackendReply, Failure>) {
        match &outcome {
            Ok(_) => tracing::info!(%ticket, "reply received"),
            Err(failure) => tracing::info!(%ticket, %failure, "query failed"),
        }
        self.state.update(Action::ResponseReceived { ticket, outcome });
        self.scroll_to_bottom();
    }

    /// Ask the backend root for its greeting, without touching the conversation
    pub fn check_backend(&mut self) {
        self.backend_status = BackendStatus::Checking;
        let client = self.client.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = client.greeting().await;
            let _ = events.send(AppEvent::Greeting(result));
        });
    }

    pub fn receive_greeting(&mut self, result: Result<String, Failure>) {
        self.backend_status = match result {
            Ok(greeting) => {
                tracing::info!(backend = %self.client.base_url(), %greeting, "backend online");
                BackendStatus::Online
            }
            Err(failure) => {
                tracing::warn!(backend = %self.client.base_url(), %failure, "backend unreachable");
                BackendStatus::Offline(failure.to_string())
            }
        };
    }

    pub fn input(&self) -> &str {
        self.state.current_input()
    }

    fn replace_input(&mut self, text: String, cursor: usize) {
        self.state.update(Action::InputChanged(text));
        self.cursor = cursor;
    }

    pub fn insert_char(&mut self, c: char) {
        let mut text = self.input().to_string();
        let byte_pos = char_to_byte_index(&text, self.cursor);
        text.insert(byte_pos, c);
        self.replace_input(text, self.cursor + 1);
    }

    pub fn delete_before_cursor(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let mut text = self.input().to_string();
        let byte_pos = char_to_byte_index(&text, self.cursor - 1);
        text.remove(byte_pos);
        self.replace_input(text, self.cursor - 1);
    }

    pub fn delete_at_cursor(&mut self) {
        if self.cursor >= self.input().chars().count() {
            return;
        }
        let mut text = self.input().to_string();
        let byte_pos = char_to_byte_index(&text, self.cursor);
        text.remove(byte_pos);
        self.replace_input(text, self.cursor);
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.input().chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input().chars().count();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.total_chat_lines().saturating_sub(self.visible_height());
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
    }

    pub fn half_page(&self) -> u16 {
        (self.visible_height() / 2).max(1)
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.state.is_waiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        let total_lines = self.total_chat_lines();
        let visible_height = self.visible_height();

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        }
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Number of wrapped lines the conversation takes in the chat area
    fn total_chat_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.state.messages() {
            total_lines = total_lines.saturating_add(1); // Sender line ("You:" or "Bot:")
            for line in msg.text.lines() {
                let wrapped = wrapped_line_count(line, wrap_width);
                total_lines = total_lines.saturating_add(wrapped.min(u16::MAX as usize) as u16);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if self.state.is_waiting() {
            total_lines = total_lines.saturating_add(2); // "Bot:" + "Thinking..."
        }

        total_lines
    }
}

/// Rows a line takes when word-wrapped at `width` columns.
///
/// Approximates the paragraph word wrapper: words move to the next row when they
/// don't fit, and words longer than a row are split across rows.
fn wrapped_line_count(line: &str, width: usize) -> usize {
    let width = width.max(1);
    let mut rows = 1;
    let mut used = 0;

    for word in line.split(' ') {
        let len = word.chars().count();
        let needed = if used == 0 { len } else { used + 1 + len };
        if needed <= width {
            used = needed;
            continue;
        }

        if used > 0 {
            rows += 1;
        }
        if len == 0 {
            used = 0;
            continue;
        }
        rows += (len - 1) / width;
        used = (len - 1) % width + 1;
    }

    rows
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
