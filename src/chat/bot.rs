//! Mod Warden Chat Bot
//!
//! Main bot loop that:
//! - Polls the chat transport for commands and poll answers
//! - Receives deadline events from the voting timers
//! - Routes both into the `VotingOrchestrator`
//!
//! Everything runs on the loop's task, one event at a time.

use super::command::{help_text, parse_command, Command};
use super::traits::*;
use crate::catalog::{CatalogFetcher, DependencyResolver};
use crate::graph::{GraphResult, GraphStore, ModDependencyGraph};
use crate::install::{InstallCoordinator, ServerSettings};
use crate::voting::{TimerEvent, VotingOrchestrator, VotingPolicy, VotingResult};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// How often the transport is polled for new messages
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One wake-up of the run loop
enum LoopEvent {
    Tick,
    Timer(TimerEvent),
}

/// Mod Warden bot
pub struct WardenBot<C: ChatClient, F: CatalogFetcher, S: ServerSettings> {
    client: C,
    orchestrator: VotingOrchestrator<C, F, S>,
    timer_rx: mpsc::UnboundedReceiver<TimerEvent>,
}

impl<C, F, S> WardenBot<C, F, S>
where
    C: ChatClient,
    F: CatalogFetcher,
    S: ServerSettings,
{
    pub fn new(
        client: C,
        resolver: DependencyResolver<F>,
        installer: InstallCoordinator<S>,
        graph: ModDependencyGraph,
        store: GraphStore,
        policy: VotingPolicy,
    ) -> Self {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let orchestrator = VotingOrchestrator::new(
            client.clone(),
            resolver,
            installer,
            graph,
            store,
            policy,
            timer_tx,
        );

        Self {
            client,
            orchestrator,
            timer_rx,
        }
    }

    pub fn orchestrator(&self) -> &VotingOrchestrator<C, F, S> {
        &self.orchestrator
    }

    /// Run bot event loop
    ///
    /// Returns when the transport reports it is closed.
    pub async fn run(&mut self) -> ChatResult<()> {
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        info!(
            mods = self.orchestrator.graph().node_count(),
            "bot started"
        );

        loop {
            let event = tokio::select! {
                _ = interval.tick() => LoopEvent::Tick,
                Some(event) = self.timer_rx.recv() => LoopEvent::Timer(event),
            };

            match event {
                LoopEvent::Tick => {
                    let messages = match self.client.receive_messages().await {
                        Ok(msgs) => msgs,
                        Err(ChatError::Closed) => {
                            info!("chat transport closed, stopping");
                            return Ok(());
                        }
                        Err(e) => {
                            warn!("Error receiving messages, will retry: {}", e);
                            continue;
                        }
                    };

                    for message in messages {
                        let chat = message.chat;
                        let sender = message.sender.clone();
                        if let Err(e) = self.handle_message(message).await {
                            // A failed command must not take the bot down
                            warn!("Error handling message from {}: {}", sender, e);
                            let _ = self
                                .client
                                .send_message(&chat, &format!("Error processing your command: {}", e))
                                .await;
                        }
                    }
                }
                LoopEvent::Timer(event) => {
                    let poll_id = event.poll_id.clone();
                    if let Err(e) = self.orchestrator.on_timer(event).await {
                        warn!(poll_id = %poll_id, "Error closing vote: {}", e);
                    }
                }
            }
        }
    }

    /// Handle one incoming message
    pub async fn handle_message(&mut self, message: Message) -> VotingResult<()> {
        let text = match message.content {
            MessageContent::PollAnswer(vote) => {
                return self.orchestrator.record_vote(&message.sender, &vote).await;
            }
            MessageContent::Text(text) => text,
        };

        let reply = match parse_command(&text) {
            Command::AddMod { catalog_id } => {
                self.orchestrator
                    .propose(message.chat, message.sender, &catalog_id)
                    .await?;
                return Ok(());
            }
            Command::Dependencies { identifier } => {
                let graph = self.orchestrator.graph();
                describe(graph, &identifier, "requires", graph.dependencies_of(&identifier))
            }
            Command::Dependents { identifier } => {
                let graph = self.orchestrator.graph();
                describe(graph, &identifier, "is required by", graph.dependents_of(&identifier))
            }
            Command::Help => help_text(),
            Command::Usage(usage) => usage.to_string(),
            // Ordinary chatter
            Command::Unknown(_) => return Ok(()),
        };

        self.client.send_message(&message.chat, &reply).await?;
        Ok(())
    }
}

/// Render a one-hop query result for the chat.
///
/// Lookup errors (unknown or ambiguous names) become the reply itself.
fn describe(
    graph: &ModDependencyGraph,
    identifier: &str,
    relation: &str,
    result: GraphResult<Vec<String>>,
) -> String {
    let ids = match result {
        Ok(ids) => ids,
        Err(e) => return e.to_string(),
    };

    let subject = graph
        .resolve_identifier(identifier)
        .ok()
        .and_then(|id| graph.node(id))
        .map(|node| node.label().to_string())
        .unwrap_or_else(|| identifier.to_string());

    if ids.is_empty() {
        let nothing = if relation == "requires" {
            "nothing"
        } else {
            "no installed mod"
        };
        return format!("{} {} {}.", subject, relation, nothing);
    }

    let lines: Vec<String> = ids
        .iter()
        .map(|id| match graph.node(id) {
            Some(node) if !node.is_stub() => format!("- {} ({})", node.label(), id),
            _ => format!("- {}", id),
        })
        .collect();
    format!("{} {}:\n{}", subject, relation, lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::page::item_page_html;
    use crate::catalog::types::metadata;
    use crate::catalog::{MockCatalog, ResolvedBatch};
    use crate::chat::MockChatClient;
    use crate::install::MemorySettings;
    use tempfile::TempDir;

    const GROUP: ChatId = ChatId(-42);
    const PREFIX: &str = "https://steamcommunity.com/sharedfiles/filedetails/?id=";

    fn bot_with_graph(
        client: &MockChatClient,
        catalog: &MockCatalog,
        graph: ModDependencyGraph,
        dir: &TempDir,
    ) -> WardenBot<MockChatClient, MockCatalog, MemorySettings> {
        WardenBot::new(
            client.clone(),
            DependencyResolver::new(catalog.clone(), PREFIX, 2),
            InstallCoordinator::new(MemorySettings::new()),
            graph,
            GraphStore::for_server(dir.path(), "servertest"),
            VotingPolicy::default(),
        )
    }

    fn text(sender: &str, body: &str) -> Message {
        Message {
            sender: UserId(sender.to_string()),
            chat: GROUP,
            content: MessageContent::Text(body.to_string()),
            timestamp: 1234567890,
        }
    }

    fn vote(sender: &str, poll_id: &str, option: u32) -> Message {
        Message {
            sender: UserId(sender.to_string()),
            chat: GROUP,
            content: MessageContent::PollAnswer(PollVote {
                poll_id: PollId(poll_id.to_string()),
                selected_options: vec![option],
            }),
            timestamp: 1234567890,
        }
    }

    fn sample_graph() -> ModDependencyGraph {
        let batch: ResolvedBatch = [
            metadata("123", "Root", &["456"]),
            metadata("456", "Lib", &[]),
            metadata("777", "lib", &[]),
        ]
        .into_iter()
        .collect();
        let mut graph = ModDependencyGraph::new();
        graph.merge(&batch);
        graph
    }

    #[tokio::test]
    async fn test_help_command() {
        let dir = TempDir::new().unwrap();
        let client = MockChatClient::new();
        let mut bot = bot_with_graph(&client, &MockCatalog::new(), sample_graph(), &dir);

        bot.handle_message(text("alice", "/help")).await.unwrap();

        let sent = client.sent_texts(&GROUP);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("/add_mod"));
    }

    #[tokio::test]
    async fn test_plain_text_ignored() {
        let dir = TempDir::new().unwrap();
        let client = MockChatClient::new();
        let mut bot = bot_with_graph(&client, &MockCatalog::new(), sample_graph(), &dir);

        bot.handle_message(text("alice", "good morning")).await.unwrap();

        assert!(client.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn test_dependency_queries() {
        let dir = TempDir::new().unwrap();
        let client = MockChatClient::new();
        let mut bot = bot_with_graph(&client, &MockCatalog::new(), sample_graph(), &dir);

        bot.handle_message(text("alice", "/dependencies Root"))
            .await
            .unwrap();
        bot.handle_message(text("alice", "/dependents 456"))
            .await
            .unwrap();
        bot.handle_message(text("alice", "/dependencies 456"))
            .await
            .unwrap();

        let sent = client.sent_texts(&GROUP);
        assert_eq!(sent[0], "Root requires:\n- Lib (456)");
        assert_eq!(sent[1], "Lib is required by:\n- Root (123)");
        assert_eq!(sent[2], "Lib requires nothing.");
    }

    #[tokio::test]
    async fn test_query_errors_are_reported() {
        let dir = TempDir::new().unwrap();
        let client = MockChatClient::new();
        let mut bot = bot_with_graph(&client, &MockCatalog::new(), sample_graph(), &dir);

        bot.handle_message(text("alice", "/dependents LIB"))
            .await
            .unwrap();
        bot.handle_message(text("alice", "/dependencies Nope"))
            .await
            .unwrap();

        let sent = client.sent_texts(&GROUP);
        assert!(sent[0].starts_with("Ambiguous mod name 'LIB'"));
        assert!(sent[1].starts_with("No mod found with name or ID 'Nope'"));
    }

    #[tokio::test]
    async fn test_add_mod_usage() {
        let dir = TempDir::new().unwrap();
        let client = MockChatClient::new();
        let mut bot = bot_with_graph(&client, &MockCatalog::new(), sample_graph(), &dir);

        bot.handle_message(text("alice", "/add_mod abc")).await.unwrap();

        assert_eq!(
            client.sent_texts(&GROUP),
            vec![crate::chat::command::ADD_MOD_USAGE.to_string()]
        );
        assert!(client.polls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_transport_closes() {
        let dir = TempDir::new().unwrap();
        let client = MockChatClient::new();
        let catalog = MockCatalog::new();
        catalog.add_page("900", item_page_html("Solo", &["SoloMod"], &[]));
        let mut bot = bot_with_graph(&client, &catalog, ModDependencyGraph::new(), &dir);

        client.add_incoming_message(text("alice", "/add_mod 900"));
        for name in ["a", "b", "c", "d", "e"] {
            client.add_incoming_message(vote(name, "poll-0", 0));
        }
        client.disconnect();

        bot.run().await.unwrap();

        assert_eq!(bot.orchestrator().live_sessions(), 0);
        assert!(bot.orchestrator().graph().contains("900"));
        assert!(client
            .sent_texts(&GROUP)
            .iter()
            .any(|t| t.contains("closed: approved")));
    }
}
