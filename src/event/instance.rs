//! Event instance: one matchmaking session scoped to a channel
//!
//! Holds the squads gathered during the intake window and the rooms they
//! are partitioned into. Constructing an event enforces the capacity
//! invariant; everything else here is pure roster bookkeeping.

use crate::config::ScheduleSettings;
use crate::error::QueueError;
use crate::event::squad::Squad;
use crate::types::{
    ChannelId, EventId, MemberView, RoomProgress, RosterView, SquadSummary, SquadView,
    SubChannelId, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Ranking comparator for squads: descending by average rating. Ties keep
/// their relative order because callers use a stable sort, which makes the
/// partition deterministic for identical ratings and join order.
pub fn rating_order(a: &Squad, b: &Squad) -> Ordering {
    b.average_rating()
        .partial_cmp(&a.average_rating())
        .unwrap_or(Ordering::Equal)
}

/// A capacity-bounded subset of confirmed squads assigned to play together.
///
/// Created when the partitioner runs (or pre-provisioned while gathering);
/// the squad slice is fixed at assignment time, only `finished` and player
/// scores change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// 1-based room number
    pub index: usize,
    pub channel: Option<SubChannelId>,
    pub squads: Vec<Squad>,
    pub finished: bool,
}

impl Room {
    pub fn new(index: usize, channel: Option<SubChannelId>) -> Self {
        Self {
            index,
            channel,
            squads: Vec::new(),
            finished: false,
        }
    }
}

/// One matchmaking session scoped to a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    /// Players per squad
    pub format_size: usize,
    /// Players per room; always an integer multiple of `format_size`
    pub room_capacity: usize,
    pub channel: ChannelId,
    pub started: bool,
    pub gathering: bool,
    /// Whether the scheduling loop drives open/close/partition transitions
    pub auto_managed: bool,
    /// Set once the partitioner has run; monotonic, there is no reset path
    pub rooms_locked: bool,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub squads: Vec<Squad>,
    pub rooms: Vec<Room>,
}

impl Event {
    /// Create an event, rejecting configurations where the room capacity is
    /// not an integer multiple of the squad size.
    pub fn new(
        id: EventId,
        format_size: usize,
        room_capacity: usize,
        channel: ChannelId,
    ) -> Result<Self, QueueError> {
        if format_size == 0 || room_capacity == 0 || room_capacity % format_size != 0 {
            return Err(QueueError::IncompatibleFormat {
                format_size,
                room_capacity,
            });
        }
        Ok(Self {
            id,
            format_size,
            room_capacity,
            channel,
            started: false,
            gathering: false,
            auto_managed: false,
            rooms_locked: false,
            scheduled_start: None,
            squads: Vec::new(),
            rooms: Vec::new(),
        })
    }

    /// Create an auto-managed event held in the waiting list until the
    /// scheduler promotes it at `start - queue_open`.
    pub fn scheduled(
        id: EventId,
        format_size: usize,
        room_capacity: usize,
        channel: ChannelId,
        start: DateTime<Utc>,
    ) -> Result<Self, QueueError> {
        let mut event = Self::new(id, format_size, room_capacity, channel)?;
        event.auto_managed = true;
        event.scheduled_start = Some(start);
        Ok(event)
    }

    pub fn squads_per_room(&self) -> usize {
        self.room_capacity / self.format_size
    }

    /// The squad containing `user`, if any. Linear scan.
    pub fn squad_of(&self, user: UserId) -> Option<&Squad> {
        self.squads.iter().find(|s| s.has_player(user))
    }

    pub fn squad_of_mut(&mut self, user: UserId) -> Option<&mut Squad> {
        self.squads.iter_mut().find(|s| s.has_player(user))
    }

    /// Remove the entire squad containing `user`
    pub fn remove_squad_of(&mut self, user: UserId) -> Option<Squad> {
        let index = self.squads.iter().position(|s| s.has_player(user))?;
        Some(self.squads.remove(index))
    }

    /// Count of complete squads
    pub fn registered_count(&self) -> usize {
        self.squads.iter().filter(|s| s.is_complete()).count()
    }

    /// Complete squads in insertion order
    pub fn confirmed_squads(&self) -> Vec<&Squad> {
        self.squads.iter().filter(|s| s.is_complete()).collect()
    }

    /// Complete squads ranked by descending average rating, ties in
    /// insertion order
    pub fn ranked_confirmed(&self) -> Vec<&Squad> {
        let mut ranked = self.confirmed_squads();
        ranked.sort_by(|a, b| rating_order(a, b));
        ranked
    }

    /// Room count the current confirmed squads can fully fill
    pub fn fillable_rooms(&self) -> usize {
        self.registered_count() / self.squads_per_room()
    }

    pub fn room_for_subchannel_mut(&mut self, sub: SubChannelId) -> Option<&mut Room> {
        self.rooms.iter_mut().find(|r| r.channel == Some(sub))
    }

    /// When intake opened (or will open) for an automated event
    pub fn intake_open_time(&self, schedule: &ScheduleSettings) -> Option<DateTime<Utc>> {
        Some(self.scheduled_start? - schedule.queue_open())
    }

    /// Deadline after which intake closes as soon as squads divide evenly
    /// into rooms
    pub fn join_deadline(&self, schedule: &ScheduleSettings) -> Option<DateTime<Utc>> {
        Some(self.intake_open_time(schedule)? + schedule.joining())
    }

    /// Deadline after which the scheduler partitions unconditionally
    pub fn force_deadline(&self, schedule: &ScheduleSettings) -> Option<DateTime<Utc>> {
        Some(self.join_deadline(schedule)? + schedule.extension())
    }

    /// Ranked view of confirmed squads, with fill progress toward the next
    /// room when the count is not an exact multiple
    pub fn roster_view(&self) -> RosterView {
        let squads = self
            .ranked_confirmed()
            .iter()
            .enumerate()
            .map(|(i, squad)| SquadSummary {
                rank: i + 1,
                players: squad.member_names(),
                average_rating: squad.average_rating(),
            })
            .collect::<Vec<_>>();
        let per_room = self.squads_per_room();
        let leftover = squads.len() % per_room;
        let progress = (leftover != 0).then(|| RoomProgress {
            have: leftover,
            need: per_room,
            rooms: squads.len() / per_room + 1,
        });
        RosterView {
            event_id: self.id,
            squads,
            progress,
        }
    }

    /// The caller's own squad with per-member confirmation state
    pub fn squad_view(&self, user: UserId) -> Option<SquadView> {
        let squad = self.squad_of(user)?;
        Some(SquadView {
            members: squad
                .players()
                .iter()
                .map(|p| MemberView {
                    name: p.rating_name.clone(),
                    rating: p.rating,
                    confirmed: p.confirmed,
                })
                .collect(),
            confirmed_count: squad.confirmed_count(),
            format_size: self.format_size,
            complete: squad.is_complete(),
        })
    }
}
