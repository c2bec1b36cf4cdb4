//! WebSocket/HTTP surface of the chat core.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
