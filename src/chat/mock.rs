//! Mock Chat Client for Testing
//!
//! Records everything the bot sends and lets tests inject incoming events.

use super::traits::*;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Mock chat client for testing
#[derive(Clone, Default)]
pub struct MockChatClient {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    sent_messages: Vec<SentMessage>,
    incoming_messages: Vec<Message>,
    polls: Vec<SentPoll>,
    stopped_polls: HashSet<i64>,
    deleted_messages: HashSet<i64>,
    next_message_id: i64,
    fail_sends: bool,
    disconnected: bool,
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat: ChatId,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct SentPoll {
    pub chat: ChatId,
    pub question: String,
    pub options: Vec<String>,
    pub handle: PollHandle,
}

impl MockChatClient {
    /// Create new mock client
    pub fn new() -> Self {
        Self::default()
    }

    /// Add incoming message for testing
    pub fn add_incoming_message(&self, message: Message) {
        let mut state = self.state.lock().unwrap();
        state.incoming_messages.push(message);
    }

    /// Get sent messages for assertions
    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.state.lock().unwrap().sent_messages.clone()
    }

    /// Get the text of every message sent to `chat`
    pub fn sent_texts(&self, chat: &ChatId) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .sent_messages
            .iter()
            .filter(|msg| &msg.chat == chat)
            .map(|msg| msg.content.clone())
            .collect()
    }

    /// Polls posted so far
    pub fn polls(&self) -> Vec<SentPoll> {
        self.state.lock().unwrap().polls.clone()
    }

    pub fn is_poll_stopped(&self, message_id: i64) -> bool {
        self.state.lock().unwrap().stopped_polls.contains(&message_id)
    }

    pub fn is_message_deleted(&self, message_id: i64) -> bool {
        self.state
            .lock()
            .unwrap()
            .deleted_messages
            .contains(&message_id)
    }

    /// Make every subsequent `send_message` fail with a network error
    pub fn fail_sends(&self, fail: bool) {
        self.state.lock().unwrap().fail_sends = fail;
    }

    /// Report the transport as closed once the incoming queue is drained
    pub fn disconnect(&self) {
        self.state.lock().unwrap().disconnected = true;
    }

}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn send_message(&self, chat: &ChatId, text: &str) -> ChatResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_sends {
            return Err(ChatError::Network("mock send failure".to_string()));
        }
        state.sent_messages.push(SentMessage {
            chat: *chat,
            content: text.to_string(),
        });
        Ok(())
    }

    async fn send_poll(
        &self,
        chat: &ChatId,
        question: &str,
        options: &[String],
    ) -> ChatResult<PollHandle> {
        let mut state = self.state.lock().unwrap();
        let message_id = state.next_message_id;
        state.next_message_id += 1;

        let handle = PollHandle {
            poll_id: PollId(format!("poll-{}", message_id)),
            message_id,
        };
        state.polls.push(SentPoll {
            chat: *chat,
            question: question.to_string(),
            options: options.to_vec(),
            handle: handle.clone(),
        });

        Ok(handle)
    }

    async fn stop_poll(&self, _chat: &ChatId, message_id: i64) -> ChatResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.polls.iter().any(|p| p.handle.message_id == message_id) {
            return Err(ChatError::MessageNotFound(message_id));
        }
        state.stopped_polls.insert(message_id);
        Ok(())
    }

    async fn delete_message(&self, _chat: &ChatId, message_id: i64) -> ChatResult<()> {
        let mut state = self.state.lock().unwrap();
        state.deleted_messages.insert(message_id);
        Ok(())
    }

    async fn receive_messages(&self) -> ChatResult<Vec<Message>> {
        let mut state = self.state.lock().unwrap();
        if state.incoming_messages.is_empty() && state.disconnected {
            return Err(ChatError::Closed);
        }
        let messages = state.incoming_messages.drain(..).collect();
        Ok(messages)
    }
}
