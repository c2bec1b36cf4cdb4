//! Real-time chat/presence server for the kairanban bulletin board.
//!
//! Accepts WebSocket connections, multiplexes them into named rooms and
//! fans out chat events with bounded history and per-session rate limits.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kairanban-server
//! cargo run --bin kairanban-server -- --host 0.0.0.0 --port 3000
//! ```

use std::sync::Arc;

use clap::Parser;
use kairanban_server::{
    config::ChatConfig,
    infrastructure::{DurabilityBridge, FlushWorker, WebSocketMessagePusher},
    infrastructure::store::InMemoryMessageStore,
    ui::Server,
    usecase::{ChatRouter, IdleReaper},
};
use kairanban_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "kairanban-server")]
#[command(about = "Real-time chat server for the kairanban bulletin board", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Messages a session may send per rate-limit window
    #[arg(long, default_value_t = kairanban_server::config::DEFAULT_RATE_CAP)]
    rate_cap: u32,

    /// Chat messages kept per room
    #[arg(long, default_value_t = kairanban_server::config::DEFAULT_HISTORY_SIZE)]
    history_size: usize,

    /// Seconds of inactivity before a session is reaped
    #[arg(long, default_value_t = 1800)]
    idle_timeout_secs: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    let config = ChatConfig {
        rate_cap: args.rate_cap,
        history_size: args.history_size,
        idle_timeout_ms: (args.idle_timeout_secs as i64) * 1000,
        ..ChatConfig::default()
    };

    // Initialize dependencies in order:
    // 1. MessageStore
    // 2. MessagePusher
    // 3. DurabilityBridge + FlushWorker
    // 4. ChatRouter
    // 5. Background tasks (FlushWorker, IdleReaper)
    // 6. Server

    // 1. Create MessageStore (in-memory database)
    let store = Arc::new(InMemoryMessageStore::new());

    // 2. Create MessagePusher (WebSocket implementation)
    let pusher = Arc::new(WebSocketMessagePusher::new());

    // 3. Create DurabilityBridge and its FlushWorker
    let (bridge, flush_rx) = DurabilityBridge::new();
    let flush_worker = FlushWorker::new(
        flush_rx,
        store.clone(),
        config.flush_batch_size,
        config.flush_max_retries,
    );

    // 4. Create the ChatRouter (single writer over the chat core state)
    let clock = Arc::new(SystemClock);
    let router = Arc::new(ChatRouter::new(config.clone(), pusher, bridge, clock));

    // 5. Spawn background tasks
    tokio::spawn(flush_worker.run(config.flush_interval_ms));
    tokio::spawn(IdleReaper::new(router.clone(), config.reaper_interval_ms).run());

    // 6. Create and run the server
    let server = Server::new(router);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
