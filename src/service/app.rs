//! Application assembly and command dispatch
//!
//! Builds the engine, scheduler, and batcher around caller-supplied gateway
//! implementations, owns the background tasks, and routes commands to the
//! component that handles them.

use crate::commands::{Command, CommandReply};
use crate::config::AppConfig;
use crate::engine::{ConfirmationEngine, RoomPartitioner};
use crate::error::QueueError;
use crate::event::registry::EventRegistry;
use crate::gateway::batcher::MessageBatcher;
use crate::gateway::provisioner::SubChannelProvisioner;
use crate::gateway::sink::NotificationSink;
use crate::rating::provider::RatingProvider;
use crate::scheduler::Scheduler;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::info;

/// The assembled matchmaking service
pub struct App {
    config: AppConfig,
    registry: Arc<EventRegistry>,
    engine: ConfirmationEngine,
    scheduler: Arc<Scheduler>,
    batcher: Arc<MessageBatcher>,
    partitioner: Arc<RoomPartitioner>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl App {
    pub fn new(
        config: AppConfig,
        sink: Arc<dyn NotificationSink>,
        provisioner: Arc<dyn SubChannelProvisioner>,
        ratings: Arc<dyn RatingProvider>,
    ) -> Self {
        let registry = Arc::new(EventRegistry::new());
        let batcher = Arc::new(MessageBatcher::new(
            sink,
            config.messaging.max_chunk_chars,
        ));
        let partitioner = Arc::new(RoomPartitioner::new(provisioner));
        let engine = ConfirmationEngine::new(
            registry.clone(),
            ratings,
            partitioner.clone(),
            batcher.clone(),
            config.schedule.clone(),
        );
        let scheduler = Arc::new(Scheduler::new(
            registry.clone(),
            partitioner.clone(),
            batcher.clone(),
            config.schedule.clone(),
        ));
        Self {
            config,
            registry,
            engine,
            scheduler,
            batcher,
            partitioner,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn registry(&self) -> &Arc<EventRegistry> {
        &self.registry
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn batcher(&self) -> &Arc<MessageBatcher> {
        &self.batcher
    }

    /// Spawn the scheduler tick loop and the notification flush loop
    pub fn start(&self) {
        let mut tasks = self.tasks.lock().expect("task list lock poisoned");
        tasks.push(
            self.scheduler
                .clone()
                .spawn(self.config.schedule.tick_interval()),
        );
        tasks.push(
            self.batcher
                .clone()
                .spawn_flush_task(self.config.messaging.flush_interval()),
        );
        info!(
            "Service started: tick every {}s, flush every {}s",
            self.config.schedule.tick_seconds, self.config.messaging.flush_interval_seconds
        );
    }

    /// Stop the background tasks and deliver anything still queued
    pub async fn shutdown(&self) {
        let tasks: Vec<JoinHandle<()>> = {
            let mut held = self.tasks.lock().expect("task list lock poisoned");
            held.drain(..).collect()
        };
        for task in tasks {
            task.abort();
        }
        if let Err(e) = self.batcher.flush().await {
            tracing::warn!("Final notification flush failed: {}", e);
        }
        info!("Service stopped");
    }

    /// Route one command to its handler
    pub async fn dispatch(&self, command: Command) -> Result<CommandReply, QueueError> {
        match command {
            Command::Join {
                channel,
                identity,
                partners,
            } => self
                .engine
                .join(channel, identity, partners)
                .await
                .map(CommandReply::Joined),
            Command::Drop { channel, identity } => self
                .engine
                .drop_squad(channel, identity)
                .await
                .map(CommandReply::Dropped),
            Command::Substitute {
                channel,
                caller,
                out,
                incoming,
            } => self
                .engine
                .substitute(channel, caller, out, incoming)
                .await
                .map(CommandReply::Substituted),
            Command::ForcedRemoval { channel, target } => self
                .engine
                .forced_removal(channel, target)
                .await
                .map(CommandReply::Removed),
            Command::Begin {
                event_id,
                format_size,
                room_capacity,
                channel,
            } => self
                .scheduler
                .begin_event(event_id, format_size, room_capacity, channel)
                .await
                .map(|_| CommandReply::Started),
            Command::End { channel } => self
                .scheduler
                .end_event(channel)
                .await
                .map(|_| CommandReply::Ended),
            Command::OpenIntake { channel } => self
                .scheduler
                .open_intake(channel)
                .await
                .map(|_| CommandReply::IntakeOpened),
            Command::CloseIntake { channel } => self
                .scheduler
                .close_intake(channel)
                .await
                .map(|_| CommandReply::IntakeClosed),
            Command::MakeRooms {
                channel,
                open_minute,
            } => self.make_rooms(channel, open_minute).await,
            Command::Schedule {
                community,
                event_id,
                format_size,
                room_capacity,
                channel,
                start,
            } => self
                .scheduler
                .schedule(community, event_id, format_size, room_capacity, channel, start)
                .await
                .map(CommandReply::Scheduled),
            Command::Unschedule {
                community,
                event_id,
            } => self
                .scheduler
                .unschedule(community, event_id)
                .await
                .map(CommandReply::Unscheduled),
            Command::ViewSchedule { community } => Ok(CommandReply::Schedule(
                self.scheduler.schedule_view(community).await,
            )),
            Command::Roster { channel } => {
                self.engine.roster(channel).await.map(CommandReply::Roster)
            }
            Command::SquadInfo { channel, identity } => self
                .engine
                .squad_info(channel, identity)
                .await
                .map(CommandReply::Squad),
            Command::ReportScore {
                channel,
                sub_channel,
                user,
                score,
            } => self
                .engine
                .report_score(channel, sub_channel, user, score)
                .await
                .map(|matched| CommandReply::ScoreRecorded { matched }),
        }
    }

    async fn make_rooms(
        &self,
        channel: crate::types::ChannelId,
        open_minute: u32,
    ) -> Result<CommandReply, QueueError> {
        let handle = self
            .registry
            .get(channel)
            .ok_or(QueueError::NoActiveEvent { channel })?;
        let mut event = handle.lock().await;
        let outcome = self
            .partitioner
            .partition(&mut event, open_minute, false)
            .await?
            // an operator call is never the automated re-trigger no-op
            .ok_or(QueueError::NotJoinable)?;
        drop(event);
        self.scheduler.render_partition(channel, &outcome);
        Ok(CommandReply::RoomsMade(outcome))
    }
}
