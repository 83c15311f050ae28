//! UI-agnostic conversation state
//!
//! The chat session is two pieces of mutable state: the append-only
//! conversation and the input buffer. Every change goes through
//! [`ChatState::update`] so the "append user message + clear input" pair
//! happens in a single transition.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::reply::{self, BackendReply, Failure};

/// A chat message shown in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Bot,
        }
    }
}

/// Sequence number handed out when a query is submitted.
///
/// Replies are appended in the order they arrive, not in ticket order; two
/// queries in flight at once can therefore answer out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub u64);

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A request the caller must perform after a successful submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub ticket: Ticket,
    pub query: String,
}

/// Ordered, append-only list of messages for the current session
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[derive(Debug)]
pub enum Action {
    /// Replace the input buffer verbatim
    InputChanged(String),
    /// Submit the current input buffer
    SubmitStarted,
    /// The backend call for `ticket` finished
    ResponseReceived {
        ticket: Ticket,
        outcome: Result<BackendReply, Failure>,
    },
}

#[derive(Debug, Default)]
pub struct ChatState {
    conversation: Conversation,
    input: String,
    next_ticket: u64,
    pending: BTreeSet<Ticket>,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one action. Returns the request to issue when a submit was accepted.
    pub fn update(&mut self, action: Action) -> Option<Dispatch> {
        match action {
            Action::InputChanged(text) => {
                self.input = text;
                None
            }
            Action::SubmitStarted => self.submit(),
            Action::ResponseReceived { ticket, outcome } => {
                if !self.pending.remove(&ticket) {
                    tracing::warn!(%ticket, "reply for unknown ticket");
                }
                self.conversation.append(Message::bot(reply::render(&outcome)));
                None
            }
        }
    }

    fn submit(&mut self) -> Option<Dispatch> {
        if self.input.trim().is_empty() {
            return None;
        }

        let query = std::mem::take(&mut self.input);
        self.conversation.append(Message::user(query.clone()));

        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.pending.insert(ticket);

        Some(Dispatch { ticket, query })
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.update(Action::InputChanged(text.into()));
    }

    pub fn current_input(&self) -> &str {
        &self.input
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.all()
    }

    /// Number of dispatches still waiting for a reply
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_waiting(&self) -> bool {
        !self.pending.is_empty()
    }
}
