//! Runtime configuration for the chat core.

/// Default number of chat messages kept per room (ring buffer length).
pub const DEFAULT_HISTORY_SIZE: usize = 50;
/// Default number of history entries replayed to a joining session.
pub const DEFAULT_HISTORY_REPLAY: usize = 20;
/// Default rate-limit window length in milliseconds.
pub const DEFAULT_RATE_WINDOW_MS: i64 = 60_000;
/// Default number of messages a session may send per window.
pub const DEFAULT_RATE_CAP: u32 = 20;
/// Default maximum chat message length in characters (after trimming).
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 500;
/// Default idle timeout before a session is reaped (30 minutes).
pub const DEFAULT_IDLE_TIMEOUT_MS: i64 = 1_800_000;
/// Default interval between reaper sweeps.
pub const DEFAULT_REAPER_INTERVAL_MS: u64 = 60_000;
/// Default interval between durability flushes.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 5_000;
/// Pending-buffer size that triggers an early durability flush.
pub const DEFAULT_FLUSH_BATCH_SIZE: usize = 64;
/// Flush attempts for one batch before it is dropped as permanently failed.
pub const DEFAULT_FLUSH_MAX_RETRIES: u32 = 5;
/// Default grace period for empty rooms (0 = delete immediately).
pub const DEFAULT_ROOM_GRACE_MS: i64 = 0;

/// Tunables for the connection/room management core.
///
/// Every knob has a production default; tests and the server binary override
/// individual fields through struct update syntax.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Chat messages kept per room before oldest-first eviction
    pub history_size: usize,
    /// History entries replayed to a joining session
    pub history_replay: usize,
    /// Rate-limit window length (milliseconds)
    pub rate_window_ms: i64,
    /// Messages allowed per session per window
    pub rate_cap: u32,
    /// Maximum message length in characters
    pub max_message_chars: usize,
    /// Idle timeout before a session is reaped (milliseconds)
    pub idle_timeout_ms: i64,
    /// Reaper sweep interval (milliseconds)
    pub reaper_interval_ms: u64,
    /// Durability flush interval (milliseconds)
    pub flush_interval_ms: u64,
    /// Pending-buffer size that triggers an early flush
    pub flush_batch_size: usize,
    /// Flush attempts per batch before giving up
    pub flush_max_retries: u32,
    /// How long an emptied room keeps its live entry (0 = none)
    pub room_grace_ms: i64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_size: DEFAULT_HISTORY_SIZE,
            history_replay: DEFAULT_HISTORY_REPLAY,
            rate_window_ms: DEFAULT_RATE_WINDOW_MS,
            rate_cap: DEFAULT_RATE_CAP,
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            reaper_interval_ms: DEFAULT_REAPER_INTERVAL_MS,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            flush_batch_size: DEFAULT_FLUSH_BATCH_SIZE,
            flush_max_retries: DEFAULT_FLUSH_MAX_RETRIES,
            room_grace_ms: DEFAULT_ROOM_GRACE_MS,
        }
    }
}
