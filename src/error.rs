//! Error types for the matchmaking engine
//!
//! The queueing taxonomy is a `thiserror` enum so the command surface can
//! match on outcomes; plumbing code uses anyhow like the rest of the crate.

use crate::types::{ChannelId, EventId};
use chrono::{DateTime, Utc};

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Recoverable failures of queue operations, reported to the originating
/// caller as a structured outcome. None of these ever crash the process.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueueError {
    #[error("event is not open; players cannot join or drop right now")]
    NotJoinable,

    #[error("{name} is already in a squad for this event")]
    AlreadyInSquad { name: String },

    #[error("expected {expected} partners for this format, got {actual}")]
    WrongPartnerCount { expected: usize, actual: usize },

    #[error("duplicate players are not allowed in a squad")]
    DuplicatePlayer,

    #[error("{name} already belongs to another squad for this event")]
    PartnerAlreadyInSquad { name: String },

    #[error("no rating on record for: {}", names.join(", "))]
    RatingNotFound { names: Vec<String> },

    #[error("{name} has already confirmed for this event")]
    AlreadyConfirmed { name: String },

    #[error("{name} is not in a squad for this event")]
    NotInSquad { name: String },

    #[error("not enough confirmed squads to fill a room; need at least {required}")]
    InsufficientSquads { required: usize },

    #[error("room open minute must be between 0 and 59, got {minute}")]
    InvalidOffset { minute: u32 },

    #[error("channel {channel} already has an active event gathering players")]
    ConflictingActiveEvent { channel: ChannelId },

    #[error("room capacity {room_capacity} is not a multiple of squad size {format_size}")]
    IncompatibleFormat {
        format_size: usize,
        room_capacity: usize,
    },

    #[error("substitutions are not available in a free-for-all event")]
    SubstituteUnavailable,

    #[error("no active event in channel {channel}")]
    NoActiveEvent { channel: ChannelId },

    #[error("no scheduled event with id {event_id}")]
    UnknownScheduledEvent { event_id: EventId },

    #[error("the intake window for this event would already be closed ({end})")]
    ScheduleWindowClosed { end: DateTime<Utc> },

    #[error("rating lookup failed: {message}")]
    LookupFailed { message: String },
}
