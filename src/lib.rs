//! Mod Warden - Community-Voted Mod Management
//!
//! A chat bot that lets a game server's community vote on new mods:
//! - `/add_mod <id>` opens a timed poll (quorum shortens it, a hard cap ends it)
//! - Approved items are resolved with their full requirement chain
//! - Results are merged into a persistent dependency graph
//! - The server's mod lists are updated for the next restart

pub mod catalog;
pub mod chat;
pub mod graph;
pub mod install;
pub mod voting;
