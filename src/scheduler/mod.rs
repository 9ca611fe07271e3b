//! Scheduling loop
//!
//! Holds the waiting list of scheduled events and drives automated
//! lifecycle transitions on a fixed tick: promoting events whose intake
//! window has arrived, closing intake at the join deadline when squads
//! divide evenly into rooms, and forcing a partition at the extension
//! deadline. Each tick runs two passes, and a failure in either pass (or
//! for one event) never stops the loop or the other events.

use crate::config::ScheduleSettings;
use crate::engine::partition::RoomPartitioner;
use crate::error::QueueError;
use crate::event::instance::Event;
use crate::event::registry::EventRegistry;
use crate::gateway::batcher::MessageBatcher;
use crate::types::{ChannelId, CommunityId, EventId, PartitionOutcome, ScheduledSummary};
use crate::utils::{join_names, minute_of};
use chrono::{DateTime, Timelike, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Status notices repeat at most once per minute even though the loop
/// ticks more often; only ticks landing in the first such window speak.
const NOTICE_WINDOW_SECONDS: u32 = 20;

/// Drives scheduled events through their lifecycle
pub struct Scheduler {
    registry: Arc<EventRegistry>,
    waitlist: Mutex<HashMap<CommunityId, Vec<Event>>>,
    partitioner: Arc<RoomPartitioner>,
    batcher: Arc<MessageBatcher>,
    schedule: ScheduleSettings,
}

impl Scheduler {
    pub fn new(
        registry: Arc<EventRegistry>,
        partitioner: Arc<RoomPartitioner>,
        batcher: Arc<MessageBatcher>,
        schedule: ScheduleSettings,
    ) -> Self {
        Self {
            registry,
            waitlist: Mutex::new(HashMap::new()),
            partitioner,
            batcher,
            schedule,
        }
    }

    /// Add an event to a community's waiting list. Re-scheduling an id
    /// replaces the previous entry.
    pub async fn schedule(
        &self,
        community: CommunityId,
        id: EventId,
        format_size: usize,
        room_capacity: usize,
        channel: ChannelId,
        start: DateTime<Utc>,
    ) -> Result<ScheduledSummary, QueueError> {
        let event = Event::scheduled(id, format_size, room_capacity, channel, start)?;
        let end = event
            .force_deadline(&self.schedule)
            .unwrap_or(start);
        if Utc::now() >= end {
            return Err(QueueError::ScheduleWindowClosed { end });
        }

        let summary = summarize(&event);
        let mut waitlist = self.waitlist.lock().await;
        let entries = waitlist.entry(community).or_default();
        entries.retain(|e| e.id != id);
        entries.push(event);
        info!(
            "Scheduled event {} in community {} for {}",
            id, community, start
        );
        Ok(summary)
    }

    /// Remove a pending event from the waiting list
    pub async fn unschedule(
        &self,
        community: CommunityId,
        event_id: EventId,
    ) -> Result<ScheduledSummary, QueueError> {
        let mut waitlist = self.waitlist.lock().await;
        let entries = waitlist
            .get_mut(&community)
            .ok_or(QueueError::UnknownScheduledEvent { event_id })?;
        let index = entries
            .iter()
            .position(|e| e.id == event_id)
            .ok_or(QueueError::UnknownScheduledEvent { event_id })?;
        let removed = entries.remove(index);
        info!("Unscheduled event {} in community {}", event_id, community);
        Ok(summarize(&removed))
    }

    /// Pending events for a community, sorted by event id
    pub async fn schedule_view(&self, community: CommunityId) -> Vec<ScheduledSummary> {
        let waitlist = self.waitlist.lock().await;
        let mut entries: Vec<ScheduledSummary> = waitlist
            .get(&community)
            .map(|events| events.iter().map(summarize).collect())
            .unwrap_or_default();
        entries.sort_by_key(|e| e.event_id);
        entries
    }

    /// Operator-started event, active immediately and not driven by the
    /// deadline passes.
    pub async fn begin_event(
        &self,
        id: EventId,
        format_size: usize,
        room_capacity: usize,
        channel: ChannelId,
    ) -> Result<(), QueueError> {
        if self.registry.get(channel).is_some() {
            return Err(QueueError::ConflictingActiveEvent { channel });
        }
        let mut event = Event::new(id, format_size, room_capacity, channel)?;
        event.started = true;
        event.gathering = true;
        self.registry.insert(event);
        info!("Event {} started in channel {}", id, channel);
        Ok(())
    }

    /// Discard the channel's active event
    pub async fn end_event(&self, channel: ChannelId) -> Result<(), QueueError> {
        self.registry
            .remove(channel)
            .ok_or(QueueError::NoActiveEvent { channel })?;
        info!("Event in channel {} ended", channel);
        Ok(())
    }

    /// Operator override: reopen intake and take the event off automated
    /// management.
    pub async fn open_intake(&self, channel: ChannelId) -> Result<(), QueueError> {
        let handle = self
            .registry
            .get(channel)
            .ok_or(QueueError::NoActiveEvent { channel })?;
        let mut event = handle.lock().await;
        event.gathering = true;
        event.auto_managed = false;
        info!("Intake reopened for event {} by operator", event.id);
        Ok(())
    }

    /// Operator override: close intake and take the event off automated
    /// management.
    pub async fn close_intake(&self, channel: ChannelId) -> Result<(), QueueError> {
        let handle = self
            .registry
            .get(channel)
            .ok_or(QueueError::NoActiveEvent { channel })?;
        let mut event = handle.lock().await;
        event.gathering = false;
        event.auto_managed = false;
        info!("Intake closed for event {} by operator", event.id);
        Ok(())
    }

    /// One scheduler tick. Takes the wall clock as a parameter so tests can
    /// drive transitions deterministically. Each pass runs in its own
    /// supervised task; a fault in one pass is logged and reaches neither
    /// the other pass nor the tick loop.
    pub async fn tick(self: Arc<Self>, now: DateTime<Utc>) {
        let scheduler = self.clone();
        if let Err(e) = tokio::spawn(async move { scheduler.promotion_pass(now).await }).await {
            error!("Promotion pass fault: {}", e);
        }
        let scheduler = self;
        if let Err(e) = tokio::spawn(async move { scheduler.deadline_pass(now).await }).await {
            error!("Deadline pass fault: {}", e);
        }
    }

    /// Move waitlisted events whose intake window has arrived into the
    /// active registry.
    async fn promotion_pass(&self, now: DateTime<Utc>) {
        let mut waitlist = self.waitlist.lock().await;
        for events in waitlist.values_mut() {
            let mut due = Vec::new();
            events.retain_mut(|event| {
                let Some(open) = event.intake_open_time(&self.schedule) else {
                    return true;
                };
                if now < open {
                    return true;
                }
                // never promote an event whose whole window already passed
                if event
                    .force_deadline(&self.schedule)
                    .is_some_and(|end| now >= end)
                {
                    warn!(
                        "Discarding scheduled event {}: its intake window ended before promotion",
                        event.id
                    );
                    return false;
                }
                due.push(event.clone());
                false
            });

            for mut event in due {
                if let Some(existing) = self.registry.get(event.channel) {
                    let active = existing.lock().await;
                    if active.gathering {
                        warn!(
                            "Discarding scheduled event {}: channel {} still gathering for event {}",
                            event.id, event.channel, active.id
                        );
                        self.batcher.enqueue(
                            event.channel,
                            QueueError::ConflictingActiveEvent {
                                channel: event.channel,
                            }
                            .to_string(),
                        );
                        continue;
                    }
                    info!(
                        "Ending finished event {} to make room for event {}",
                        active.id, event.id
                    );
                    drop(active);
                    self.registry.remove(event.channel);
                }

                event.started = true;
                event.gathering = true;
                let deadline = event.join_deadline(&self.schedule);
                info!("Promoted event {} in channel {}", event.id, event.channel);
                self.batcher.enqueue(
                    event.channel,
                    match deadline {
                        Some(deadline) => format!(
                            "Squad Queue #{} is open! Use `!c` to queue your squad. \
                             Intake closes at {}.",
                            event.id,
                            deadline.format("%H:%M UTC")
                        ),
                        None => format!("Squad Queue #{} is open! Use `!c` to queue your squad.", event.id),
                    },
                );
                self.registry.insert(event);
            }
        }
    }

    /// Apply the join and force deadlines to every automated active event
    async fn deadline_pass(&self, now: DateTime<Utc>) {
        for (channel, handle) in self.registry.handles() {
            let mut event = handle.lock().await;
            if !event.auto_managed || !event.started || event.rooms_locked {
                continue;
            }
            let (Some(start), Some(join_deadline), Some(force_deadline)) = (
                event.scheduled_start,
                event.join_deadline(&self.schedule),
                event.force_deadline(&self.schedule),
            ) else {
                continue;
            };

            if now >= force_deadline {
                match self
                    .partitioner
                    .partition(&mut event, minute_of(start), true)
                    .await
                {
                    Ok(Some(outcome)) => self.render_partition(channel, &outcome),
                    Ok(None) => {}
                    Err(e) => {
                        error!("Forced partition of event {} failed: {}", event.id, e);
                        if now.second() < NOTICE_WINDOW_SECONDS {
                            self.batcher.enqueue(channel, e.to_string());
                        }
                    }
                }
                continue;
            }

            if now < join_deadline {
                continue;
            }
            let per_room = event.squads_per_room();
            let registered = event.registered_count();
            if registered > 0 && registered % per_room == 0 {
                // intake may already be closed by the early-close check
                // without rooms having been made; partition on this tick
                if event.gathering {
                    event.gathering = false;
                    self.batcher.enqueue(
                        channel,
                        "A sufficient number of squads has been reached, so the event has been \
                         closed to extra squads. Rooms will be made shortly.",
                    );
                }
                match self
                    .partitioner
                    .partition(&mut event, minute_of(start), true)
                    .await
                {
                    Ok(Some(outcome)) => self.render_partition(channel, &outcome),
                    Ok(None) => {}
                    Err(e) => error!("Partition of event {} failed: {}", event.id, e),
                }
            } else if event.gathering && now.second() < NOTICE_WINDOW_SECONDS {
                let needed = per_room - registered % per_room;
                let minutes_left = ((force_deadline - now).num_seconds() + 59) / 60;
                self.batcher.enqueue(
                    channel,
                    format!(
                        "Need {} more squad(s) to fill the next room! \
                         Rooms will be made in {} minute(s) regardless.",
                        needed, minutes_left
                    ),
                );
            }
        }
    }

    /// Queue the room assignment notices for a partitioned event
    pub(crate) fn render_partition(&self, channel: ChannelId, outcome: &PartitionOutcome) {
        let offsets = outcome.offsets;
        self.batcher.enqueue(
            channel,
            format!(
                "Rooms are up! Rooms open at :{:02}, +1 penalty from :{:02}, \
                 and all rooms must start by :{:02}.",
                offsets.open, offsets.penalty, offsets.start
            ),
        );
        for room in &outcome.rooms {
            let squads = room
                .squads
                .iter()
                .map(|s| format!("{} ({:.0})", s.players.join(", "), s.average_rating))
                .collect::<Vec<_>>()
                .join(" | ");
            let line = match (&room.channel, &room.provision_error) {
                (Some(sub), _) => format!("Room {} (<#{}>): {}", room.index, sub, squads),
                (None, Some(e)) => format!(
                    "Room {}: {}; the room channel could not be created ({})",
                    room.index, squads, e
                ),
                (None, None) => format!("Room {}: {}", room.index, squads),
            };
            self.batcher.enqueue(channel, line);
        }
        if !outcome.late.is_empty() {
            let late_players: Vec<&str> = outcome
                .late
                .iter()
                .flat_map(|s| s.players.iter().map(String::as_str))
                .collect();
            let names = join_names(&late_players);
            self.batcher.enqueue(
                channel,
                format!("Sorry, these players did not make it into a room: {}", names),
            );
        }
    }

    /// Spawn the periodic tick task
    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.clone().tick(Utc::now()).await;
            }
        })
    }
}

fn summarize(event: &Event) -> ScheduledSummary {
    ScheduledSummary {
        event_id: event.id,
        channel: event.channel,
        format_size: event.format_size,
        room_capacity: event.room_capacity,
        // scheduled events always carry a start time
        start: event.scheduled_start.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::squad::{Player, Squad};
    use crate::gateway::provisioner::InMemorySubChannelProvisioner;
    use crate::gateway::sink::RecordingSink;
    use crate::types::{Identity, RatedPlayer, Rating, UserId};
    use chrono::{Duration as ChronoDuration, TimeZone};

    const COMMUNITY: CommunityId = 1;
    const CHANNEL: ChannelId = 100;

    struct Fixture {
        scheduler: Arc<Scheduler>,
        registry: Arc<EventRegistry>,
        sink: Arc<RecordingSink>,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(EventRegistry::new());
        let sink = Arc::new(RecordingSink::new());
        let batcher = Arc::new(MessageBatcher::new(sink.clone(), 1500));
        let partitioner = Arc::new(RoomPartitioner::new(Arc::new(
            InMemorySubChannelProvisioner::new(),
        )));
        let scheduler = Arc::new(Scheduler::new(
            registry.clone(),
            partitioner,
            batcher,
            ScheduleSettings::default(),
        ));
        Fixture {
            scheduler,
            registry,
            sink,
        }
    }

    fn complete_squad(base_id: UserId, size: usize, rating: Rating) -> Squad {
        Squad::new(
            (0..size as u64)
                .map(|i| {
                    let id = base_id + i;
                    Player::from_rated(
                        RatedPlayer {
                            identity: Identity::new(id, format!("p{id}")),
                            rating_name: format!("p{id}"),
                            rating,
                        },
                        true,
                    )
                })
                .collect(),
        )
    }

    /// A wall clock landing inside the notice window (second 5)
    fn at_second_5(base: DateTime<Utc>) -> DateTime<Utc> {
        base.with_second(5).unwrap()
    }

    #[tokio::test]
    async fn test_schedule_and_view_sorted_by_id() {
        let f = fixture();
        let later = Utc::now() + ChronoDuration::hours(3);
        let sooner = Utc::now() + ChronoDuration::hours(2);
        f.scheduler
            .schedule(COMMUNITY, 2, 2, 4, CHANNEL, later)
            .await
            .unwrap();
        f.scheduler
            .schedule(COMMUNITY, 1, 2, 4, CHANNEL, sooner)
            .await
            .unwrap();

        let view = f.scheduler.schedule_view(COMMUNITY).await;
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].event_id, 1);
        assert_eq!(view[1].event_id, 2);
        assert!(f.scheduler.schedule_view(999).await.is_empty());
    }

    #[tokio::test]
    async fn test_reschedule_replaces_entry() {
        let f = fixture();
        let first = Utc::now() + ChronoDuration::hours(2);
        let moved = Utc::now() + ChronoDuration::hours(4);
        f.scheduler
            .schedule(COMMUNITY, 1, 2, 4, CHANNEL, first)
            .await
            .unwrap();
        f.scheduler
            .schedule(COMMUNITY, 1, 2, 4, CHANNEL, moved)
            .await
            .unwrap();

        let view = f.scheduler.schedule_view(COMMUNITY).await;
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].start, moved);
    }

    #[tokio::test]
    async fn test_schedule_rejects_closed_window() {
        let f = fixture();
        let past = Utc::now() - ChronoDuration::hours(1);
        let err = f
            .scheduler
            .schedule(COMMUNITY, 1, 2, 4, CHANNEL, past)
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::ScheduleWindowClosed { .. }));
    }

    #[tokio::test]
    async fn test_unschedule() {
        let f = fixture();
        let start = Utc::now() + ChronoDuration::hours(2);
        f.scheduler
            .schedule(COMMUNITY, 1, 2, 4, CHANNEL, start)
            .await
            .unwrap();

        let removed = f.scheduler.unschedule(COMMUNITY, 1).await.unwrap();
        assert_eq!(removed.event_id, 1);
        assert!(f.scheduler.schedule_view(COMMUNITY).await.is_empty());

        let err = f.scheduler.unschedule(COMMUNITY, 1).await.unwrap_err();
        assert_eq!(err, QueueError::UnknownScheduledEvent { event_id: 1 });
    }

    #[tokio::test]
    async fn test_promotion_activates_due_event() {
        let f = fixture();
        let now = Utc::now();
        // intake opens 30 minutes before start; this one is due now
        let start = now + ChronoDuration::minutes(10);
        f.scheduler
            .schedule(COMMUNITY, 1, 2, 4, CHANNEL, start)
            .await
            .unwrap();

        f.scheduler.clone().tick(now).await;

        assert!(f.scheduler.schedule_view(COMMUNITY).await.is_empty());
        let handle = f.registry.get(CHANNEL).unwrap();
        let event = handle.lock().await;
        assert!(event.started && event.gathering && event.auto_managed);
    }

    #[tokio::test]
    async fn test_promotion_waits_for_its_window() {
        let f = fixture();
        let now = Utc::now();
        let start = now + ChronoDuration::hours(2);
        f.scheduler
            .schedule(COMMUNITY, 1, 2, 4, CHANNEL, start)
            .await
            .unwrap();

        f.scheduler.clone().tick(now).await;

        assert_eq!(f.scheduler.schedule_view(COMMUNITY).await.len(), 1);
        assert!(f.registry.get(CHANNEL).is_none());
    }

    #[tokio::test]
    async fn test_promotion_conflict_discards_with_notice() {
        let f = fixture();
        let now = Utc::now();
        let mut active = Event::new(9, 2, 4, CHANNEL).unwrap();
        active.started = true;
        active.gathering = true;
        f.registry.insert(active);

        let start = now + ChronoDuration::minutes(10);
        f.scheduler
            .schedule(COMMUNITY, 1, 2, 4, CHANNEL, start)
            .await
            .unwrap();
        f.scheduler.clone().tick(now).await;

        // the old event stays active and the scheduled one is dropped
        assert_eq!(f.registry.get(CHANNEL).unwrap().lock().await.id, 9);
        assert!(f.scheduler.schedule_view(COMMUNITY).await.is_empty());

        f.scheduler.batcher.flush().await.unwrap();
        let sent = f.sink.sent_to(CHANNEL);
        assert!(sent.iter().any(|m| m.contains("already has an active event")));
    }

    #[tokio::test]
    async fn test_promotion_replaces_finished_event() {
        let f = fixture();
        let now = Utc::now();
        let mut stale = Event::new(9, 2, 4, CHANNEL).unwrap();
        stale.started = true;
        stale.gathering = false;
        f.registry.insert(stale);

        let start = now + ChronoDuration::minutes(10);
        f.scheduler
            .schedule(COMMUNITY, 1, 2, 4, CHANNEL, start)
            .await
            .unwrap();
        f.scheduler.clone().tick(now).await;

        assert_eq!(f.registry.get(CHANNEL).unwrap().lock().await.id, 1);
    }

    #[tokio::test]
    async fn test_force_deadline_partitions() {
        let f = fixture();
        // start at a fixed minute so the clock offsets are predictable
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 19, 20, 0).unwrap();
        let mut event = Event::scheduled(1, 2, 4, CHANNEL, start).unwrap();
        event.started = true;
        event.gathering = true;
        event.squads.push(complete_squad(10, 2, 1500));
        event.squads.push(complete_squad(20, 2, 1400));
        event.squads.push(complete_squad(30, 2, 1300));
        f.registry.insert(event);

        // past start - 30 + 25 + 5, the forced partition time
        f.scheduler.clone().tick(start).await;

        let handle = f.registry.get(CHANNEL).unwrap();
        let event = handle.lock().await;
        assert!(event.rooms_locked);
        assert!(!event.gathering);
        assert_eq!(event.rooms.len(), 1);
        assert_eq!(event.rooms[0].squads.len(), 2);
        drop(event);

        f.scheduler.clone().tick(start + ChronoDuration::seconds(20)).await;
        let event = f.registry.get(CHANNEL).unwrap();
        // a second tick never re-partitions
        assert_eq!(event.lock().await.rooms.len(), 1);
    }

    #[tokio::test]
    async fn test_join_deadline_closes_on_exact_multiple() {
        let f = fixture();
        let now = at_second_5(Utc::now());
        // join deadline (start - 5 minutes) just passed, force deadline not
        let start = now + ChronoDuration::minutes(4);
        let mut event = Event::scheduled(1, 2, 4, CHANNEL, start).unwrap();
        event.started = true;
        event.gathering = true;
        event.squads.push(complete_squad(10, 2, 1500));
        event.squads.push(complete_squad(20, 2, 1400));
        f.registry.insert(event);

        f.scheduler.clone().tick(now).await;

        let handle = f.registry.get(CHANNEL).unwrap();
        let event = handle.lock().await;
        assert!(!event.gathering);
        assert!(event.rooms_locked);
        assert_eq!(event.rooms.len(), 1);
    }

    #[tokio::test]
    async fn test_join_deadline_with_partial_room_keeps_gathering() {
        let f = fixture();
        let now = at_second_5(Utc::now());
        let start = now + ChronoDuration::minutes(4);
        let mut event = Event::scheduled(1, 2, 4, CHANNEL, start).unwrap();
        event.started = true;
        event.gathering = true;
        event.squads.push(complete_squad(10, 2, 1500));
        f.registry.insert(event);

        f.scheduler.clone().tick(now).await;

        let handle = f.registry.get(CHANNEL).unwrap();
        let event = handle.lock().await;
        assert!(event.gathering);
        assert!(!event.rooms_locked);
        drop(event);

        f.scheduler
            .batcher
            .flush()
            .await
            .unwrap();
        let sent = f.sink.sent_to(CHANNEL);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Need 1 more squad(s)"));
    }

    #[tokio::test]
    async fn test_deadline_pass_skips_manual_events() {
        let f = fixture();
        f.scheduler.begin_event(1, 2, 4, CHANNEL).await.unwrap();
        {
            let handle = f.registry.get(CHANNEL).unwrap();
            let mut event = handle.lock().await;
            event.squads.push(complete_squad(10, 2, 1500));
            event.squads.push(complete_squad(20, 2, 1400));
        }

        f.scheduler.clone().tick(Utc::now()).await;

        let handle = f.registry.get(CHANNEL).unwrap();
        let event = handle.lock().await;
        assert!(event.gathering);
        assert!(!event.rooms_locked);
    }

    #[tokio::test]
    async fn test_begin_event_rejects_conflict() {
        let f = fixture();
        f.scheduler.begin_event(1, 2, 4, CHANNEL).await.unwrap();
        let err = f.scheduler.begin_event(2, 2, 4, CHANNEL).await.unwrap_err();
        assert_eq!(err, QueueError::ConflictingActiveEvent { channel: CHANNEL });
    }

    #[tokio::test]
    async fn test_intake_overrides_detach_automation() {
        let f = fixture();
        let start = Utc::now() + ChronoDuration::minutes(10);
        let mut event = Event::scheduled(1, 2, 4, CHANNEL, start).unwrap();
        event.started = true;
        event.gathering = true;
        f.registry.insert(event);

        f.scheduler.close_intake(CHANNEL).await.unwrap();
        {
            let handle = f.registry.get(CHANNEL).unwrap();
            let event = handle.lock().await;
            assert!(!event.gathering);
            assert!(!event.auto_managed);
        }

        f.scheduler.open_intake(CHANNEL).await.unwrap();
        let handle = f.registry.get(CHANNEL).unwrap();
        let event = handle.lock().await;
        assert!(event.gathering);
        assert!(!event.auto_managed);
    }

    #[tokio::test]
    async fn test_end_event() {
        let f = fixture();
        f.scheduler.begin_event(1, 2, 4, CHANNEL).await.unwrap();
        f.scheduler.end_event(CHANNEL).await.unwrap();
        assert!(f.registry.get(CHANNEL).is_none());
        assert_eq!(
            f.scheduler.end_event(CHANNEL).await.unwrap_err(),
            QueueError::NoActiveEvent { channel: CHANNEL }
        );
    }

    #[tokio::test]
    async fn test_closed_intake_partitions_without_waiting_for_force_deadline() {
        let f = fixture();
        let now = at_second_5(Utc::now());
        // join deadline passed, force deadline still four minutes out
        let start = now + ChronoDuration::minutes(4);
        let mut event = Event::scheduled(1, 2, 4, CHANNEL, start).unwrap();
        event.started = true;
        // intake was closed early on an exact multiple, rooms not yet made
        event.gathering = false;
        event.squads.push(complete_squad(10, 2, 1500));
        event.squads.push(complete_squad(20, 2, 1400));
        f.registry.insert(event);

        f.scheduler.clone().tick(now).await;

        let handle = f.registry.get(CHANNEL).unwrap();
        let event = handle.lock().await;
        assert!(event.rooms_locked);
        assert_eq!(event.rooms.len(), 1);
        assert_eq!(event.rooms[0].squads.len(), 2);
        drop(event);

        f.scheduler.batcher.flush().await.unwrap();
        let sent = f.sink.sent_to(CHANNEL);
        // the closure notice went out when intake closed; only room
        // assignments are sent now
        assert!(!sent.iter().any(|m| m.contains("sufficient number")));
        assert!(sent.iter().any(|m| m.contains("Room 1")));
    }

    #[tokio::test]
    async fn test_pass_fault_does_not_escape_tick() {
        struct PanickingProvisioner;

        #[async_trait::async_trait]
        impl crate::gateway::provisioner::SubChannelProvisioner for PanickingProvisioner {
            async fn create_sub_channel(
                &self,
                _parent: ChannelId,
                _name: &str,
            ) -> crate::error::Result<crate::types::SubChannelId> {
                panic!("sub-channel backend crashed");
            }
        }

        let registry = Arc::new(EventRegistry::new());
        let sink = Arc::new(RecordingSink::new());
        let batcher = Arc::new(MessageBatcher::new(sink.clone(), 1500));
        let partitioner = Arc::new(RoomPartitioner::new(Arc::new(PanickingProvisioner)));
        let scheduler = Arc::new(Scheduler::new(
            registry.clone(),
            partitioner,
            batcher,
            ScheduleSettings::default(),
        ));

        // past the force deadline, so the deadline pass will provision
        let start = Utc::now() - ChronoDuration::minutes(1);
        let mut event = Event::scheduled(1, 2, 4, CHANNEL, start).unwrap();
        event.started = true;
        event.gathering = true;
        event.squads.push(complete_squad(10, 2, 1500));
        event.squads.push(complete_squad(20, 2, 1400));
        registry.insert(event);

        // neither tick may unwind into the caller
        scheduler.clone().tick(Utc::now()).await;
        scheduler.tick(Utc::now()).await;

        let handle = registry.get(CHANNEL).unwrap();
        assert!(handle.lock().await.rooms_locked);
    }

    #[tokio::test]
    async fn test_stale_waitlist_entry_is_discarded() {
        let f = fixture();
        let start = Utc::now() + ChronoDuration::hours(2);
        f.scheduler
            .schedule(COMMUNITY, 1, 2, 4, CHANNEL, start)
            .await
            .unwrap();

        // tick far past the whole intake window
        f.scheduler.clone().tick(start + ChronoDuration::hours(1)).await;

        assert!(f.scheduler.schedule_view(COMMUNITY).await.is_empty());
        assert!(f.registry.get(CHANNEL).is_none());
    }
}
