use std::sync::Arc;

use concierge_core::knowledge::QUICK_QUESTIONS;
use concierge_core::{ChatRole, ChatState, KnowledgeBase, Message, StreamingController, SubmitOutcome};
use ratatui::layout::Rect;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Input,
    QuickQuestions,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub focus: FocusPane,

    // Input line
    pub input: String,
    pub cursor: usize, // cursor position in chars

    // Latest conversation snapshot
    pub chat: ChatState,
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub follow_tail: bool,

    pub quick_selected: usize,
    pub animation_frame: u8,

    // Rendered areas for mouse hit-testing
    pub chat_area: Option<Rect>,

    pub knowledge: KnowledgeBase,
    pub provider_label: String,

    controller: Arc<StreamingController>,
}

impl App {
    pub fn new(controller: Arc<StreamingController>, knowledge: KnowledgeBase) -> Self {
        let chat = controller.store().snapshot();
        let provider_label = controller
            .describe()
            .unwrap_or_else(|| "not configured".to_string());

        Self {
            should_quit: false,
            focus: FocusPane::Input,

            input: String::new(),
            cursor: 0,

            chat,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_tail: true,

            quick_selected: 0,
            animation_frame: 0,

            chat_area: None,

            knowledge,
            provider_label,

            controller,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.controller.store().subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.chat.is_loading
    }

    /// Pull the latest snapshot from the store
    pub fn sync_conversation(&mut self) {
        self.chat = self.controller.store().snapshot();
        if self.follow_tail {
            self.scroll_to_bottom();
        }
    }

    /// Submit whatever is in the input line
    pub fn submit_input(&mut self) {
        // The cached snapshot can lag behind the store
        if self.input.trim().is_empty() || self.controller.store().is_loading() {
            return;
        }
        let text = self.input.clone();
        if self.controller.is_configured() {
            self.input.clear();
            self.cursor = 0;
        }
        self.submit_text(text);
    }

    pub fn submit_quick_question(&mut self, index: usize) {
        if let Some(question) = QUICK_QUESTIONS.get(index) {
            self.quick_selected = index;
            self.submit_text(question.to_string());
        }
    }

    /// Hand the prompt to the controller on its own task
    pub fn submit_text(&mut self, text: String) {
        if self.controller.store().is_loading() {
            return;
        }
        self.follow_tail = true;
        let controller = Arc::clone(&self.controller);
        tokio::spawn(async move {
            let outcome = controller.submit(&text).await;
            if let SubmitOutcome::Ignored(reason) = outcome {
                tracing::debug!(?reason, "submission ignored");
            }
        });
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
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

    // Quick questions

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPane::Input => FocusPane::QuickQuestions,
            FocusPane::QuickQuestions => FocusPane::Input,
        };
    }

    pub fn quick_next(&mut self) {
        self.quick_selected = (self.quick_selected + 1) % QUICK_QUESTIONS.len();
    }

    pub fn quick_prev(&mut self) {
        self.quick_selected = self
            .quick_selected
            .checked_sub(1)
            .unwrap_or(QUICK_QUESTIONS.len() - 1);
    }

    // Scrolling

    fn max_scroll(&self) -> u16 {
        let total = conversation_line_count(&self.chat.messages, self.wrap_width(), self.chat.error.as_deref());
        total.saturating_sub(self.visible_height())
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        self.follow_tail = self.chat_scroll >= max;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_tail = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.visible_height() / 2).max(1));
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.visible_height() / 2).max(1));
    }

    /// Scroll chat to bottom so the newest text is visible
    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
        self.follow_tail = true;
    }

    fn wrap_width(&self) -> usize {
        // Use actual chat width for wrap calculation, default to 50 if not set
        if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        }
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Rendered height of the conversation, mirroring the layout in `ui`
pub fn conversation_line_count(messages: &[Message], wrap_width: usize, error: Option<&str>) -> u16 {
    let wrap_width = wrap_width.max(1);
    let mut total_lines: u16 = 0;

    for msg in messages {
        total_lines = total_lines.saturating_add(1); // Role line ("You" or "Concierge")
        if msg.content.is_empty() {
            total_lines = total_lines.saturating_add(1); // "Processing request..." or blank
        }
        for line in msg.content.lines() {
            total_lines = total_lines.saturating_add(wrapped_lines(line, wrap_width));
        }
        total_lines = total_lines.saturating_add(1); // Blank line after message
    }

    if let Some(error) = error {
        // "✗ " prefix on the banner line
        total_lines = total_lines.saturating_add(wrapped_lines(error, wrap_width.saturating_sub(2).max(1)));
    }

    total_lines
}

fn wrapped_lines(line: &str, wrap_width: usize) -> u16 {
    // Use character count, not byte length, for proper UTF-8 handling
    let char_count = line.chars().count();
    if char_count == 0 {
        1
    } else {
        char_count.div_ceil(wrap_width) as u16
    }
}

pub fn role_label(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "You",
        ChatRole::Assistant => "Concierge",
    }
}
