//! Shared utilities for the kairanban chat/presence core.
//!
//! Cross-cutting concerns used by the server binary and its tests:
//! time handling with an injectable clock, and logging setup.

pub mod logger;
pub mod time;
