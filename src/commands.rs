//! Command surface
//!
//! The platform-neutral request/reply types the service dispatches on. A
//! front end (chat bot, HTTP handler, test harness) builds a `Command` and
//! receives either a `CommandReply` or a `QueueError`; nothing here touches
//! engine state.

use crate::types::{
    ChannelId, CommunityId, DropOutcome, EventId, Identity, JoinOutcome, PartitionOutcome,
    RosterView, ScheduledSummary, SquadView, SubChannelId, SubstituteOutcome, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One request against the matchmaking service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Form a squad (with partners) or confirm for an existing one (bare)
    Join {
        channel: ChannelId,
        identity: Identity,
        #[serde(default)]
        partners: Vec<Identity>,
    },
    /// Remove the caller's entire squad
    Drop {
        channel: ChannelId,
        identity: Identity,
    },
    /// Swap a member of the caller's squad for a new player
    Substitute {
        channel: ChannelId,
        caller: Identity,
        out: Identity,
        incoming: Identity,
    },
    /// Operator: remove any member's squad, even after intake closed
    ForcedRemoval {
        channel: ChannelId,
        target: Identity,
    },
    /// Operator: start an event immediately, outside the scheduler
    Begin {
        event_id: EventId,
        format_size: usize,
        room_capacity: usize,
        channel: ChannelId,
    },
    /// Operator: discard the channel's active event
    End { channel: ChannelId },
    /// Operator: reopen intake and detach the event from automation
    OpenIntake { channel: ChannelId },
    /// Operator: close intake and detach the event from automation
    CloseIntake { channel: ChannelId },
    /// Operator: partition now, rooms opening at the given wall-clock minute
    MakeRooms {
        channel: ChannelId,
        open_minute: u32,
    },
    /// Add an event to the community's waiting list
    Schedule {
        community: CommunityId,
        event_id: EventId,
        format_size: usize,
        room_capacity: usize,
        channel: ChannelId,
        start: DateTime<Utc>,
    },
    /// Remove a pending event from the waiting list
    Unschedule {
        community: CommunityId,
        event_id: EventId,
    },
    /// List the community's pending events
    ViewSchedule { community: CommunityId },
    /// Ranked list of confirmed squads
    Roster { channel: ChannelId },
    /// The caller's own squad with confirmation state
    SquadInfo {
        channel: ChannelId,
        identity: Identity,
    },
    /// Record a score reported inside a room sub-channel
    ReportScore {
        channel: ChannelId,
        sub_channel: SubChannelId,
        user: UserId,
        score: u32,
    },
}

/// Successful outcome of a command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandReply {
    Joined(JoinOutcome),
    Dropped(DropOutcome),
    Substituted(SubstituteOutcome),
    Removed(DropOutcome),
    Started,
    Ended,
    IntakeOpened,
    IntakeClosed,
    RoomsMade(PartitionOutcome),
    Scheduled(ScheduledSummary),
    Unscheduled(ScheduledSummary),
    Schedule(Vec<ScheduledSummary>),
    Roster(RosterView),
    Squad(SquadView),
    /// Whether the score matched a player in one of the event's rooms
    ScoreRecorded { matched: bool },
}
