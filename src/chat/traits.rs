//! Chat Client Trait Abstractions
//!
//! The chat transport is an external collaborator: it delivers commands and
//! poll answers and renders the bot's replies. Everything the bot needs from
//! it goes through `ChatClient` so tests can swap in `MockChatClient`.

use async_trait::async_trait;
use std::fmt;

/// Chat (group or direct conversation) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Member identity as reported by the transport
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Poll identifier assigned by the transport
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PollId(pub String);

impl fmt::Display for PollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A poll as posted to a chat.
///
/// `message_id` is needed to stop and delete the poll once voting closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollHandle {
    pub poll_id: PollId,
    pub message_id: i64,
}

/// Incoming chat event
#[derive(Debug, Clone)]
pub struct Message {
    pub sender: UserId,
    pub chat: ChatId,
    pub content: MessageContent,
    pub timestamp: u64,
}

/// Message content types
#[derive(Debug, Clone)]
pub enum MessageContent {
    Text(String),
    PollAnswer(PollVote),
}

/// Poll answer carrying the chosen option indexes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollVote {
    pub poll_id: PollId,
    pub selected_options: Vec<u32>,
}

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Chat client errors
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Chat not found: {0}")]
    ChatNotFound(ChatId),

    #[error("Message not found: {0}")]
    MessageNotFound(i64),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Transport closed")]
    Closed,
}

/// Chat client abstraction
#[async_trait]
pub trait ChatClient: Clone + Send + Sync {
    /// Send a text message to a chat
    async fn send_message(&self, chat: &ChatId, text: &str) -> ChatResult<()>;

    /// Post a non-anonymous, single-choice poll
    ///
    /// # Returns
    /// * Handle with the transport's poll id and the id of the poll message
    async fn send_poll(
        &self,
        chat: &ChatId,
        question: &str,
        options: &[String],
    ) -> ChatResult<PollHandle>;

    /// Close a poll so no further answers are accepted
    async fn stop_poll(&self, chat: &ChatId, message_id: i64) -> ChatResult<()>;

    /// Remove a message (used to clear a closed poll from the chat)
    async fn delete_message(&self, chat: &ChatId, message_id: i64) -> ChatResult<()>;

    /// Drain messages received since the last call
    async fn receive_messages(&self) -> ChatResult<Vec<Message>>;
}
