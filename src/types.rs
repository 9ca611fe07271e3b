//! Common types used throughout the matchmaking engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable platform identifier for a user
pub type UserId = u64;

/// Stable platform identifier for a text channel hosting an event
pub type ChannelId = u64;

/// Stable platform identifier for a room sub-channel (thread)
pub type SubChannelId = u64;

/// Stable platform identifier for a community (server/guild)
pub type CommunityId = u64;

/// Operator-assigned identifier for an event
pub type EventId = u32;

/// Opaque externally-supplied skill rating
pub type Rating = i64;

/// Reference to an external-platform user. The platform owns the account;
/// squads and players only hold this reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub display_name: String,
}

impl Identity {
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

/// A resolved rating-lookup result for one identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatedPlayer {
    pub identity: Identity,
    /// Name the player goes by on the rating leaderboard
    pub rating_name: String,
    pub rating: Rating,
}

/// One squad as seen in a ranked listing: rank within its list, member
/// names, and the squad's average rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadSummary {
    pub rank: usize,
    pub players: Vec<String>,
    pub average_rating: f64,
}

/// Progress toward filling the next room when the confirmed count is not an
/// exact room multiple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomProgress {
    /// Confirmed squads counting toward the next room
    pub have: usize,
    /// Squads per room
    pub need: usize,
    /// Room count if the next room fills
    pub rooms: usize,
}

/// Ranked view of all confirmed squads in an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterView {
    pub event_id: EventId,
    pub squads: Vec<SquadSummary>,
    pub progress: Option<RoomProgress>,
}

/// One member of a squad, as shown to its own members
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberView {
    pub name: String,
    pub rating: Rating,
    pub confirmed: bool,
}

/// A caller's own squad with per-member confirmation state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadView {
    pub members: Vec<MemberView>,
    pub confirmed_count: usize,
    pub format_size: usize,
    pub complete: bool,
}

/// Human-coordination clocks derived from the room open minute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockOffsets {
    /// Minute rooms open
    pub open: u32,
    /// Minute the no-show penalty applies
    pub penalty: u32,
    /// Minute play must start by
    pub start: u32,
}

/// One partitioned room: its slice of squads in rank order, plus the
/// sub-channel it was provisioned (or the provisioning error)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomOutcome {
    /// 1-based room number; room 1 holds the highest-rated squads
    pub index: usize,
    pub channel: Option<SubChannelId>,
    pub provision_error: Option<String>,
    pub squads: Vec<SquadSummary>,
}

/// Structured result of partitioning an event into rooms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionOutcome {
    pub event_id: EventId,
    pub rooms: Vec<RoomOutcome>,
    /// Confirmed squads past the cutoff; reported, never auto-assigned
    pub late: Vec<SquadSummary>,
    pub offsets: ClockOffsets,
}

/// Result of a successful confirm (or a join that was a bare confirm)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmOutcome {
    pub name: String,
    pub confirmed_count: usize,
    pub format_size: usize,
    /// Members still unconfirmed, empty when the squad is complete
    pub missing: Vec<String>,
    pub squad_complete: bool,
    /// Complete squads in the event after this confirm
    pub registered_count: usize,
}

/// Result of a successful join
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JoinOutcome {
    /// A new squad was formed; the joiner is pre-confirmed, partners must
    /// still confirm
    SquadFormed {
        members: Vec<String>,
        format_size: usize,
        registered_count: usize,
    },
    /// The caller was already squadded and this was a bare confirm
    Confirmed(ConfirmOutcome),
}

/// Result of a drop or forced removal: the whole squad leaves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropOutcome {
    pub members: Vec<String>,
    /// Whether the removed squad had fully confirmed
    pub was_complete: bool,
}

/// Result of a successful substitution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstituteOutcome {
    pub out_name: String,
    pub in_name: String,
    /// Squad membership after the swap
    pub members: Vec<String>,
}

/// A pending scheduled event, as listed by the schedule view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledSummary {
    pub event_id: EventId,
    pub channel: ChannelId,
    pub format_size: usize,
    pub room_capacity: usize,
    pub start: DateTime<Utc>,
}
