//! Voting session state machine.
//!
//! States: `Open -> ExtendedWindow -> Closed`, `Open -> Closed` on deadline,
//! or straight to `Closed` from either live state when the hard cap is hit.
//! Timer mechanics live in the orchestrator; this type only decides.

use crate::chat::{ChatId, PollHandle, PollId, UserId};
use std::collections::HashSet;
use std::time::{Duration, SystemTime};
use tokio::time::Instant;

/// Poll options, in option-index order
pub const AGREE: &str = "Agree";
pub const DISAGREE: &str = "Disagree";

/// Thresholds and windows governing every session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotingPolicy {
    /// Distinct voters that shorten the deadline
    pub quorum: u32,
    /// Distinct voters that close the session immediately
    pub hard_cap: u32,
    /// Initial voting window
    pub voting_window: Duration,
    /// Window left for late voters once quorum is reached
    pub extended_window: Duration,
}

impl Default for VotingPolicy {
    fn default() -> Self {
        Self {
            quorum: 3,
            hard_cap: 5,
            voting_window: Duration::from_secs(3600),
            extended_window: Duration::from_secs(1800),
        }
    }
}

impl VotingPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.quorum == 0 {
            return Err("quorum must be at least 1".to_string());
        }
        if self.hard_cap == 0 {
            return Err("hard_cap must be at least 1".to_string());
        }
        if self.extended_window > self.voting_window {
            return Err("extended_window must not exceed voting_window".to_string());
        }
        Ok(())
    }
}

/// A request to add one catalog item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModProposal {
    pub catalog_id: String,
    pub url: String,
    pub chat: ChatId,
    pub proposer: UserId,
    pub created_at: SystemTime,
}

/// Final decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Approved,
    Rejected,
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    ExtendedWindow,
    Closed(Outcome),
}

/// Vote counts per option
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub agree: u32,
    pub disagree: u32,
}

impl Tally {
    /// Approved only on a strict majority; ties reject
    pub fn outcome(&self) -> Outcome {
        if self.agree > self.disagree {
            Outcome::Approved
        } else {
            Outcome::Rejected
        }
    }
}

/// Why a vote event did not change the tally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredVote {
    AlreadyVoted,
    SessionClosed,
    NoValidOption,
}

/// What a vote event did to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteEffect {
    Ignored(IgnoredVote),
    Counted { voters: u32 },
    /// Quorum reached: the deadline moved to `deadline`
    QuorumReached { voters: u32, deadline: Instant },
    /// Hard cap reached: the session must close now
    CapReached { voters: u32 },
}

/// Per-proposal voting state
#[derive(Debug, Clone)]
pub struct VotingSession {
    poll: PollHandle,
    proposal: ModProposal,
    tally: Tally,
    voters: HashSet<UserId>,
    deadline: Instant,
    state: SessionState,
    /// Bumped whenever the deadline timer is replaced
    timer_generation: u64,
}

impl VotingSession {
    pub fn new(poll: PollHandle, proposal: ModProposal, deadline: Instant) -> Self {
        Self {
            poll,
            proposal,
            tally: Tally::default(),
            voters: HashSet::new(),
            deadline,
            state: SessionState::Open,
            timer_generation: 0,
        }
    }

    pub fn poll_id(&self) -> &PollId {
        &self.poll.poll_id
    }

    pub fn poll(&self) -> &PollHandle {
        &self.poll
    }

    pub fn proposal(&self) -> &ModProposal {
        &self.proposal
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn timer_generation(&self) -> u64 {
        self.timer_generation
    }

    /// Distinct voters counted so far
    pub fn voter_count(&self) -> u32 {
        self.voters.len() as u32
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, SessionState::Closed(_))
    }

    /// Deadline has passed and the session is still live
    pub fn is_due(&self, now: Instant) -> bool {
        !self.is_closed() && now >= self.deadline
    }

    /// Start a new timer generation; older timers become stale
    pub fn next_timer_generation(&mut self) -> u64 {
        self.timer_generation += 1;
        self.timer_generation
    }

    /// Apply one vote event.
    ///
    /// A voter counts once per session; later events from the same voter are
    /// ignored even if they pick a different option. Every valid option index
    /// in the event is tallied.
    pub fn cast(
        &mut self,
        voter: &UserId,
        options: &[u32],
        policy: &VotingPolicy,
        now: Instant,
    ) -> VoteEffect {
        if self.is_closed() {
            return VoteEffect::Ignored(IgnoredVote::SessionClosed);
        }
        if self.voters.contains(voter) {
            return VoteEffect::Ignored(IgnoredVote::AlreadyVoted);
        }

        let mut counted = false;
        for option in options {
            match *option {
                0 => {
                    self.tally.agree += 1;
                    counted = true;
                }
                1 => {
                    self.tally.disagree += 1;
                    counted = true;
                }
                _ => {}
            }
        }
        if !counted {
            return VoteEffect::Ignored(IgnoredVote::NoValidOption);
        }

        self.voters.insert(voter.clone());
        let voters = self.voter_count();

        if voters >= policy.hard_cap {
            return VoteEffect::CapReached { voters };
        }

        if voters == policy.quorum && self.state == SessionState::Open {
            // Never push the deadline past the original one
            let shortened = now + policy.extended_window;
            if shortened < self.deadline {
                self.deadline = shortened;
            }
            self.state = SessionState::ExtendedWindow;
            return VoteEffect::QuorumReached {
                voters,
                deadline: self.deadline,
            };
        }

        VoteEffect::Counted { voters }
    }

    /// Close the session with the current tally. Closing twice keeps the
    /// first outcome.
    pub fn close(&mut self) -> Outcome {
        if let SessionState::Closed(outcome) = self.state {
            return outcome;
        }
        let outcome = self.tally.outcome();
        self.state = SessionState::Closed(outcome);
        outcome
    }
}
