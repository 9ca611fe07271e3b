//! Room partitioner
//!
//! Converts the ranked list of confirmed squads into fixed-capacity rooms
//! plus a late/overflow remainder. Runs either from the scheduler (deadline
//! policy) or from an explicit operator command; callers hold the event's
//! lock for the duration so the slice is atomic with respect to roster
//! changes.

use crate::error::QueueError;
use crate::event::instance::{Event, Room};
use crate::event::squad::Squad;
use crate::gateway::provisioner::SubChannelProvisioner;
use crate::types::{ClockOffsets, PartitionOutcome, RoomOutcome, SquadSummary};
use std::sync::Arc;
use tracing::{info, warn};

/// Derive the human-coordination clocks from the room open minute:
/// penalty at `(t + 6) % 60`, start by `(t + 10) % 60`.
pub fn clock_offsets(open_minute: u32) -> Result<ClockOffsets, QueueError> {
    if open_minute > 59 {
        return Err(QueueError::InvalidOffset {
            minute: open_minute,
        });
    }
    Ok(ClockOffsets {
        open: open_minute,
        penalty: (open_minute + 6) % 60,
        start: (open_minute + 10) % 60,
    })
}

/// Partitions events into rooms and provisions their sub-channels
pub struct RoomPartitioner {
    provisioner: Arc<dyn SubChannelProvisioner>,
}

impl RoomPartitioner {
    pub fn new(provisioner: Arc<dyn SubChannelProvisioner>) -> Self {
        Self { provisioner }
    }

    /// Pre-provision one sub-channel per already-fillable room while the
    /// event is still gathering, so partition time does not run into
    /// platform channel-creation rate limits. Stops at the first creation
    /// failure; the partitioner fills in whatever is still missing.
    pub async fn provision_fillable_rooms(&self, event: &mut Event) -> crate::error::Result<()> {
        let needed = event.fillable_rooms();
        while event.rooms.len() < needed {
            let index = event.rooms.len() + 1;
            let name = room_name(event, index);
            let sub = self
                .provisioner
                .create_sub_channel(event.channel, &name)
                .await?;
            event.rooms.push(Room::new(index, Some(sub)));
            info!("Pre-provisioned {} for event {}", name, event.id);
        }
        Ok(())
    }

    /// Slice the ranked confirmed squads into rooms.
    ///
    /// Closes intake and locks rooms as a side effect. An automated
    /// retrigger of an already-partitioned event is a no-op (`Ok(None)`);
    /// an explicit operator call re-slices from scratch, reusing already
    /// provisioned sub-channels. A sub-channel creation failure is reported
    /// on that room's outcome and never aborts the remaining rooms.
    pub async fn partition(
        &self,
        event: &mut Event,
        open_minute: u32,
        automated: bool,
    ) -> Result<Option<PartitionOutcome>, QueueError> {
        let offsets = clock_offsets(open_minute)?;

        if event.rooms_locked && automated {
            return Ok(None);
        }

        let per_room = event.squads_per_room();
        let target_rooms = event.registered_count() / per_room;
        if target_rooms == 0 {
            return Err(QueueError::InsufficientSquads { required: per_room });
        }

        event.gathering = false;
        event.rooms_locked = true;

        let ranked: Vec<Squad> = event.ranked_confirmed().into_iter().cloned().collect();
        let assigned_count = target_rooms * per_room;
        let (assigned, late) = ranked.split_at(assigned_count);

        if !automated {
            // operator re-slice: drop stale assignments but keep channels
            for room in &mut event.rooms {
                room.squads.clear();
            }
        }
        event.rooms.truncate(target_rooms);

        let mut rooms = Vec::with_capacity(target_rooms);
        for i in 0..target_rooms {
            let mut provision_error = None;
            if event.rooms.len() <= i {
                let name = room_name(event, i + 1);
                match self
                    .provisioner
                    .create_sub_channel(event.channel, &name)
                    .await
                {
                    Ok(sub) => event.rooms.push(Room::new(i + 1, Some(sub))),
                    Err(e) => {
                        warn!("Failed to provision {} for event {}: {}", name, event.id, e);
                        provision_error = Some(e.to_string());
                        event.rooms.push(Room::new(i + 1, None));
                    }
                }
            }

            let room = &mut event.rooms[i];
            room.squads = assigned[i * per_room..(i + 1) * per_room].to_vec();
            rooms.push(RoomOutcome {
                index: i + 1,
                channel: room.channel,
                provision_error,
                squads: summaries(&room.squads),
            });
        }

        info!(
            "Partitioned event {}: {} rooms, {} late squads",
            event.id,
            rooms.len(),
            late.len()
        );
        Ok(Some(PartitionOutcome {
            event_id: event.id,
            rooms,
            late: summaries(late),
            offsets,
        }))
    }
}

fn room_name(event: &Event, index: usize) -> String {
    format!("SQ{} Room {}", event.id, index)
}

fn summaries(squads: &[Squad]) -> Vec<SquadSummary> {
    squads
        .iter()
        .enumerate()
        .map(|(i, squad)| SquadSummary {
            rank: i + 1,
            players: squad.member_names(),
            average_rating: squad.average_rating(),
        })
        .collect()
}
