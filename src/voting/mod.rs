//! Timed group votes on catalog additions.
//!
//! - `session`: per-proposal state machine (tally, voters, deadline)
//! - `orchestrator`: live sessions, deadline timers, approval pipeline

pub mod orchestrator;
pub mod session;

pub use orchestrator::{TimerEvent, VotingOrchestrator};
pub use session::{
    IgnoredVote, ModProposal, Outcome, SessionState, Tally, VoteEffect, VotingPolicy,
    VotingSession, AGREE, DISAGREE,
};

use crate::catalog::CatalogError;
use crate::chat::ChatError;
use crate::graph::GraphError;
use crate::install::InstallError;

/// Result type for voting operations
pub type VotingResult<T> = Result<T, VotingError>;

/// Errors raised while running a vote or applying its outcome
#[derive(Debug, thiserror::Error)]
pub enum VotingError {
    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Install error: {0}")]
    Install(#[from] InstallError),

    #[error("Nothing could be resolved for mod {0}")]
    NothingResolved(String),
}
