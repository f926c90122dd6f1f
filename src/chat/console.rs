//! Console chat transport.
//!
//! Lets an operator drive the bot from a terminal. Each stdin line is one
//! message from a named member:
//!
//! ```text
//! alice: /add_mod 2894412760
//! bob: /vote poll-0 agree
//! ```
//!
//! `/vote` answers a poll by option index or label. Everything the bot sends
//! is printed to stdout. End of input closes the transport.

use super::traits::*;
use crate::voting::{AGREE, DISAGREE};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// The single conversation the console represents
pub const CONSOLE_CHAT: ChatId = ChatId(0);

#[derive(Clone, Default)]
pub struct ConsoleChat {
    state: Arc<Mutex<ConsoleState>>,
}

#[derive(Default)]
struct ConsoleState {
    incoming: VecDeque<Message>,
    next_message_id: i64,
    closed: bool,
}

impl ConsoleChat {
    /// Start reading stdin in a background task
    pub fn spawn() -> Self {
        let chat = Self::default();
        let reader = chat.clone();

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => reader.push_line(&line),
                    Ok(None) => break,
                    Err(e) => {
                        warn!("stdin read failed: {}", e);
                        break;
                    }
                }
            }
            reader.close();
        });

        chat
    }

    /// Queue one input line as if it had been typed
    pub fn push_line(&self, line: &str) {
        match parse_console_line(line, CONSOLE_CHAT) {
            Some(message) => self.state().incoming.push_back(message),
            None => {
                if !line.trim().is_empty() {
                    println!("expected `<name>: <message>`");
                }
            }
        }
    }

    /// Mark input as finished; queued messages are still delivered
    pub fn close(&self) {
        self.state().closed = true;
    }

    // The state stays consistent across a panicking holder, so a poisoned
    // lock is still usable
    fn state(&self) -> MutexGuard<'_, ConsoleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Parse `<name>: <text>` into a message. `/vote <poll> <option>` becomes a
/// poll answer.
pub fn parse_console_line(line: &str, chat: ChatId) -> Option<Message> {
    let (sender, body) = line.split_once(':')?;
    let sender = sender.trim();
    let body = body.trim();
    if sender.is_empty() || sender.contains(char::is_whitespace) || body.is_empty() {
        return None;
    }

    let content = match body.strip_prefix("/vote") {
        Some(args) if args.is_empty() || args.starts_with(' ') => {
            let mut parts = args.split_whitespace();
            let poll_id = parts.next()?;
            let option = parse_option(parts.next()?)?;
            MessageContent::PollAnswer(PollVote {
                poll_id: PollId(poll_id.to_string()),
                selected_options: vec![option],
            })
        }
        _ => MessageContent::Text(body.to_string()),
    };

    Some(Message {
        sender: UserId(sender.to_string()),
        chat,
        content,
        timestamp: now_secs(),
    })
}

fn parse_option(raw: &str) -> Option<u32> {
    if let Ok(index) = raw.parse::<u32>() {
        return Some(index);
    }
    if raw.eq_ignore_ascii_case(AGREE) {
        Some(0)
    } else if raw.eq_ignore_ascii_case(DISAGREE) {
        Some(1)
    } else {
        None
    }
}

#[async_trait]
impl ChatClient for ConsoleChat {
    async fn send_message(&self, chat: &ChatId, text: &str) -> ChatResult<()> {
        println!("[{}] {}", chat, text);
        Ok(())
    }

    async fn send_poll(
        &self,
        chat: &ChatId,
        question: &str,
        options: &[String],
    ) -> ChatResult<PollHandle> {
        let message_id = {
            let mut state = self.state();
            let id = state.next_message_id;
            state.next_message_id += 1;
            id
        };
        let poll_id = PollId(format!("poll-{}", message_id));

        println!("[{}] poll {}: {}", chat, poll_id, question);
        for (index, option) in options.iter().enumerate() {
            println!("    {}) {}", index, option);
        }

        Ok(PollHandle {
            poll_id,
            message_id,
        })
    }

    async fn stop_poll(&self, chat: &ChatId, message_id: i64) -> ChatResult<()> {
        println!("[{}] poll-{} is closed", chat, message_id);
        Ok(())
    }

    async fn delete_message(&self, _chat: &ChatId, message_id: i64) -> ChatResult<()> {
        debug!(message_id, "console has nothing to delete");
        Ok(())
    }

    async fn receive_messages(&self) -> ChatResult<Vec<Message>> {
        let mut state = self.state();
        if state.incoming.is_empty() && state.closed {
            return Err(ChatError::Closed);
        }
        Ok(state.incoming.drain(..).collect())
    }
}
