//! Chat Integration Module
//!
//! The bot talks to its community through a chat transport it does not own:
//! - `traits`: the `ChatClient` seam and message types
//! - `bot`: the event loop routing commands and votes to the orchestrator
//! - `command`: chat command parsing
//! - `console`: terminal transport for local operation
//! - `mock`: in-memory transport for tests

pub mod bot;
pub mod command;
pub mod console;
pub mod mock;
pub mod traits;

pub use bot::WardenBot;
pub use command::{parse_command, Command};
pub use console::ConsoleChat;
pub use mock::MockChatClient;
pub use traits::{
    ChatClient, ChatError, ChatId, ChatResult, Message, MessageContent, PollHandle, PollId,
    PollVote, UserId,
};
