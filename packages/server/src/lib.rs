//! Chat/presence core for the kairanban bulletin board.
//!
//! This library tracks live WebSocket sessions, multiplexes them into named
//! rooms, enforces per-session rate limits, keeps a bounded message history
//! per room and fans out chat events to the right subset of connections.
//! Persistence and authentication are external collaborators reached through
//! trait seams in the `domain` layer.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
