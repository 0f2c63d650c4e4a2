//! Protocol-wide limits and timing constants.

/// Maximum number of fresh active participants in one room.
pub const ROOM_CAPACITY: usize = 10;

/// Display name length bounds, in characters, after trimming.
pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 20;

/// Interval between presence heartbeats.
pub const HEARTBEAT_INTERVAL_MS: i64 = 10_000;

/// A participant whose last heartbeat is older than this is hidden from the roster.
pub const PRESENCE_FRESHNESS_MS: i64 = 30_000;

/// A live edit older than this is not rendered as ghost text.
pub const LIVE_EDIT_TTL_MS: i64 = 4_000;

/// Coalescing window for live-edit broadcasts (one rendered frame).
pub const LIVE_EDIT_FRAME_MS: u64 = 16;

/// Participant ids and room ids are opaque, but bounded.
pub const ID_MAX_CHARS: usize = 64;

/// Reserved author of seeded onboarding tasks.
pub const SYSTEM_AUTHOR: &str = "system";
