pub mod client;
pub mod config;
pub mod reply;
pub mod state;

// Re-export main types for convenience
pub use client::ChatClient;
pub use config::Config;
pub use reply::{BackendReply, Failure, Quote, FALLBACK_REPLY};
pub use state::{Action, ChatState, Conversation, Dispatch, Message, Sender, Ticket};
