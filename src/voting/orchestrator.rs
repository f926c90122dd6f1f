//! Voting Orchestrator
//!
//! Owns every live `VotingSession`, keyed by poll id, plus one deadline timer
//! per session. Timers run as spawned tasks that only post a `TimerEvent`
//! back to the bot loop; all session mutation happens on the loop's task.
//!
//! On approval the orchestrator resolves the proposal's dependency chain,
//! merges it into the dependency graph, persists the graph and hands the
//! batch to the installer.

use super::session::{
    ModProposal, Outcome, VoteEffect, VotingPolicy, VotingSession, AGREE, DISAGREE,
};
use super::{VotingError, VotingResult};
use crate::catalog::{CatalogFetcher, DependencyResolver};
use crate::chat::{ChatClient, ChatId, PollId, PollVote, UserId};
use crate::graph::{GraphStore, ModDependencyGraph};
use crate::install::{InstallCoordinator, ServerSettings};
use std::collections::HashMap;
use std::time::SystemTime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Posted by a deadline timer when it fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerEvent {
    pub poll_id: PollId,
    /// Generation the timer was armed for; stale generations are ignored
    pub generation: u64,
}

pub struct VotingOrchestrator<C: ChatClient, F: CatalogFetcher, S: ServerSettings> {
    chat: C,
    resolver: DependencyResolver<F>,
    installer: InstallCoordinator<S>,
    graph: ModDependencyGraph,
    store: GraphStore,
    policy: VotingPolicy,
    sessions: HashMap<PollId, VotingSession>,
    timers: HashMap<PollId, JoinHandle<()>>,
    timer_tx: mpsc::UnboundedSender<TimerEvent>,
}

impl<C, F, S> VotingOrchestrator<C, F, S>
where
    C: ChatClient,
    F: CatalogFetcher,
    S: ServerSettings,
{
    pub fn new(
        chat: C,
        resolver: DependencyResolver<F>,
        installer: InstallCoordinator<S>,
        graph: ModDependencyGraph,
        store: GraphStore,
        policy: VotingPolicy,
        timer_tx: mpsc::UnboundedSender<TimerEvent>,
    ) -> Self {
        Self {
            chat,
            resolver,
            installer,
            graph,
            store,
            policy,
            sessions: HashMap::new(),
            timers: HashMap::new(),
            timer_tx,
        }
    }

    pub fn graph(&self) -> &ModDependencyGraph {
        &self.graph
    }

    pub fn policy(&self) -> &VotingPolicy {
        &self.policy
    }

    pub fn session(&self, poll_id: &PollId) -> Option<&VotingSession> {
        self.sessions.get(poll_id)
    }

    /// Number of sessions still accepting votes
    pub fn live_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Open a vote on adding `catalog_id`.
    ///
    /// Returns the poll id, or `None` when the proposal was turned down
    /// (the proposer has already been told why).
    pub async fn propose(
        &mut self,
        chat: ChatId,
        proposer: UserId,
        catalog_id: &str,
    ) -> VotingResult<Option<PollId>> {
        if catalog_id.is_empty() || !catalog_id.chars().all(|c| c.is_ascii_digit()) {
            self.chat
                .send_message(&chat, crate::chat::command::ADD_MOD_USAGE)
                .await?;
            return Ok(None);
        }

        if self
            .sessions
            .values()
            .any(|s| s.proposal().catalog_id == catalog_id)
        {
            self.chat
                .send_message(
                    &chat,
                    &format!("A vote on mod {} is already running.", catalog_id),
                )
                .await?;
            return Ok(None);
        }

        if self.installer.is_installed(catalog_id).await? {
            self.chat
                .send_message(&chat, &format!("Mod {} is already installed.", catalog_id))
                .await?;
            return Ok(None);
        }

        match self.resolver.item_exists(catalog_id).await {
            Ok(true) => {}
            Ok(false) => {
                self.chat
                    .send_message(
                        &chat,
                        &format!("Mod {} does not exist in the catalog.", catalog_id),
                    )
                    .await?;
                return Ok(None);
            }
            Err(e) => {
                warn!(catalog_id = %catalog_id, "catalog lookup failed: {}", e);
                self.chat
                    .send_message(
                        &chat,
                        &format!(
                            "Could not check mod {} in the catalog right now, try again later.",
                            catalog_id
                        ),
                    )
                    .await?;
                return Ok(None);
            }
        }

        let url = self.resolver.url_for(catalog_id);
        self.chat
            .send_message(
                &chat,
                &format!(
                    "{} wants to add mod {}. Vote whether it should be added:\n{}",
                    proposer, catalog_id, url
                ),
            )
            .await?;

        let options = [AGREE.to_string(), DISAGREE.to_string()];
        let poll = self
            .chat
            .send_poll(&chat, &format!("Add mod {}?", catalog_id), &options)
            .await?;
        let poll_id = poll.poll_id.clone();

        let proposal = ModProposal {
            catalog_id: catalog_id.to_string(),
            url,
            chat,
            proposer,
            created_at: SystemTime::now(),
        };
        let deadline = Instant::now() + self.policy.voting_window;
        self.sessions
            .insert(poll_id.clone(), VotingSession::new(poll, proposal, deadline));
        self.arm_timer(&poll_id);

        info!(poll_id = %poll_id, catalog_id = %catalog_id, "vote opened");
        Ok(Some(poll_id))
    }

    /// Apply a poll answer.
    ///
    /// Answers for unknown or closed polls are ignored.
    pub async fn record_vote(&mut self, voter: &UserId, vote: &PollVote) -> VotingResult<()> {
        let Some(session) = self.sessions.get_mut(&vote.poll_id) else {
            debug!(poll_id = %vote.poll_id, "answer for unknown poll ignored");
            return Ok(());
        };

        let effect = session.cast(voter, &vote.selected_options, &self.policy, Instant::now());
        let chat = session.proposal().chat;

        let echo = if vote.selected_options.contains(&0) {
            format!("{} agrees", voter)
        } else {
            format!("{} disagrees", voter)
        };

        match effect {
            VoteEffect::Ignored(reason) => {
                debug!(poll_id = %vote.poll_id, voter = %voter, ?reason, "vote ignored");
            }
            VoteEffect::Counted { voters } => {
                debug!(poll_id = %vote.poll_id, voters, "vote counted");
                self.notify(&chat, &echo).await;
            }
            VoteEffect::QuorumReached { voters, deadline } => {
                info!(poll_id = %vote.poll_id, voters, "quorum reached, shortening vote");
                self.arm_timer(&vote.poll_id);
                self.notify(&chat, &echo).await;

                let minutes = deadline
                    .saturating_duration_since(Instant::now())
                    .as_secs()
                    .div_ceil(60);
                self.notify(
                    &chat,
                    &format!("Quorum reached. Voting ends in {} minutes.", minutes),
                )
                .await;
            }
            VoteEffect::CapReached { voters } => {
                info!(poll_id = %vote.poll_id, voters, "vote cap reached, closing");
                self.notify(&chat, &echo).await;
                self.close(&vote.poll_id).await?;
            }
        }

        Ok(())
    }

    /// Handle a fired deadline timer.
    ///
    /// Events from replaced timers or for sessions that already closed are
    /// dropped.
    pub async fn on_timer(&mut self, event: TimerEvent) -> VotingResult<Option<Outcome>> {
        let due = match self.sessions.get(&event.poll_id) {
            Some(session) => {
                session.timer_generation() == event.generation && session.is_due(Instant::now())
            }
            None => false,
        };
        if !due {
            debug!(
                poll_id = %event.poll_id,
                generation = event.generation,
                "stale deadline timer ignored"
            );
            return Ok(None);
        }

        self.timers.remove(&event.poll_id);
        self.close(&event.poll_id).await
    }

    /// Close a session now, announce the outcome and, on approval, resolve
    /// and install.
    ///
    /// The session leaves the live set before anything else happens, so no
    /// further votes are counted and the outcome is announced once.
    pub async fn close(&mut self, poll_id: &PollId) -> VotingResult<Option<Outcome>> {
        let Some(mut session) = self.sessions.remove(poll_id) else {
            return Ok(None);
        };
        if let Some(timer) = self.timers.remove(poll_id) {
            timer.abort();
        }

        let outcome = session.close();
        let tally = session.tally();
        let proposal = session.proposal().clone();
        let chat = proposal.chat;
        info!(
            poll_id = %poll_id,
            catalog_id = %proposal.catalog_id,
            agree = tally.agree,
            disagree = tally.disagree,
            ?outcome,
            "vote closed"
        );

        let message_id = session.poll().message_id;
        if let Err(e) = self.chat.stop_poll(&chat, message_id).await {
            warn!(poll_id = %poll_id, "failed to stop poll: {}", e);
        }
        if let Err(e) = self.chat.delete_message(&chat, message_id).await {
            warn!(poll_id = %poll_id, "failed to delete poll: {}", e);
        }

        let verdict = match outcome {
            Outcome::Approved => "approved",
            Outcome::Rejected => "rejected",
        };
        let text = format!(
            "Vote on mod {} closed: {} ({} agree, {} disagree).",
            proposal.catalog_id, verdict, tally.agree, tally.disagree
        );
        if let Err(e) = self.chat.send_message(&chat, &text).await {
            warn!(poll_id = %poll_id, "failed to announce outcome: {}", e);
        }

        if outcome == Outcome::Approved {
            if let Err(e) = self.apply_approval(&proposal).await {
                warn!(catalog_id = %proposal.catalog_id, "install failed: {}", e);
                let text = format!("Failed to install mod {}: {}", proposal.catalog_id, e);
                if let Err(e) = self.chat.send_message(&chat, &text).await {
                    warn!("failed to report install failure: {}", e);
                }
            }
        }

        Ok(Some(outcome))
    }

    /// Resolve, merge, persist, install
    async fn apply_approval(&mut self, proposal: &ModProposal) -> VotingResult<Vec<String>> {
        let resolution = self.resolver.resolve(&proposal.url).await;
        if resolution.batch.is_empty() {
            return Err(VotingError::NothingResolved(proposal.catalog_id.clone()));
        }
        if !resolution.is_complete() {
            warn!(
                catalog_id = %proposal.catalog_id,
                unresolved = ?resolution.unresolved,
                failed = resolution.failed.len(),
                "installing a partial dependency set"
            );
        }

        let batch = resolution.batch;
        self.notify(
            &proposal.chat,
            &format!("Mods to install: {}", batch.catalog_ids().join(", ")),
        )
        .await;

        // The live graph only changes once both artifacts are on disk
        let mut merged = self.graph.clone();
        let report = merged.merge(&batch);
        debug!(
            nodes_added = report.nodes_added,
            edges_added = report.edges_added,
            "merged resolution into graph"
        );
        self.store.save(&merged)?;
        self.graph = merged;

        let added = self.installer.install(batch.as_slice()).await?;
        self.notify(
            &proposal.chat,
            &format!(
                "Mod {} is installed ({} new items). Restart the server to load it.",
                proposal.catalog_id,
                added.len()
            ),
        )
        .await;

        Ok(added)
    }

    /// Send a notice; a transport failure is logged and does not undo the
    /// state change it reports on
    async fn notify(&self, chat: &ChatId, text: &str) {
        if let Err(e) = self.chat.send_message(chat, text).await {
            warn!(chat = %chat, "failed to send notice: {}", e);
        }
    }

    /// Arm (or re-arm) the deadline timer for a session, cancelling any
    /// previous one.
    fn arm_timer(&mut self, poll_id: &PollId) {
        let Some(session) = self.sessions.get_mut(poll_id) else {
            return;
        };
        let generation = session.next_timer_generation();
        let deadline = session.deadline();

        if let Some(previous) = self.timers.remove(poll_id) {
            previous.abort();
        }

        let tx = self.timer_tx.clone();
        let event = TimerEvent {
            poll_id: poll_id.clone(),
            generation,
        };
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            // Receiver gone means the bot is shutting down
            let _ = tx.send(event);
        });
        self.timers.insert(poll_id.clone(), handle);
    }
}

impl<C: ChatClient, F: CatalogFetcher, S: ServerSettings> Drop for VotingOrchestrator<C, F, S> {
    fn drop(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
    }
}
