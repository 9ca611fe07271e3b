//! Confirmation engine
//!
//! Squad formation and the confirm/drop/substitute/forced-removal
//! operations on an event's roster. Every mutation runs under the event's
//! FIFO lock from the registry, so concurrent calls against one event apply
//! one at a time in arrival order. Rating lookups happen between two lock
//! scopes: membership is validated, the lock is released for the external
//! call, then the result is re-validated and committed atomically.

use crate::config::ScheduleSettings;
use crate::engine::partition::RoomPartitioner;
use crate::error::QueueError;
use crate::event::instance::Event;
use crate::event::registry::{EventHandle, EventRegistry};
use crate::event::squad::{Player, Squad};
use crate::gateway::batcher::MessageBatcher;
use crate::rating::provider::RatingProvider;
use crate::types::{
    ChannelId, ConfirmOutcome, DropOutcome, Identity, JoinOutcome, RosterView, SquadView,
    SubChannelId, SubstituteOutcome, UserId,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Applies roster mutations to active events
pub struct ConfirmationEngine {
    registry: Arc<EventRegistry>,
    ratings: Arc<dyn RatingProvider>,
    partitioner: Arc<RoomPartitioner>,
    batcher: Arc<MessageBatcher>,
    schedule: ScheduleSettings,
}

impl ConfirmationEngine {
    pub fn new(
        registry: Arc<EventRegistry>,
        ratings: Arc<dyn RatingProvider>,
        partitioner: Arc<RoomPartitioner>,
        batcher: Arc<MessageBatcher>,
        schedule: ScheduleSettings,
    ) -> Self {
        Self {
            registry,
            ratings,
            partitioner,
            batcher,
            schedule,
        }
    }

    fn handle(&self, channel: ChannelId) -> Result<EventHandle, QueueError> {
        self.registry
            .get(channel)
            .ok_or(QueueError::NoActiveEvent { channel })
    }

    fn ensure_open(event: &Event) -> Result<(), QueueError> {
        if !event.started || !event.gathering {
            return Err(QueueError::NotJoinable);
        }
        Ok(())
    }

    /// Form a squad with `partners`, or confirm for an existing squad when
    /// called with no partners.
    pub async fn join(
        &self,
        channel: ChannelId,
        identity: Identity,
        partners: Vec<Identity>,
    ) -> Result<JoinOutcome, QueueError> {
        let handle = self.handle(channel)?;

        {
            let mut event = handle.lock().await;
            Self::ensure_open(&event)?;

            if let Some(squad) = event.squad_of(identity.id) {
                if !partners.is_empty() {
                    return Err(QueueError::AlreadyInSquad {
                        name: member_name(squad, identity.id),
                    });
                }
                let outcome = Self::confirm_member(&mut event, identity.id)?;
                let newly_complete = outcome.squad_complete;
                drop(event);
                if newly_complete {
                    self.post_registration(&handle).await;
                }
                return Ok(JoinOutcome::Confirmed(outcome));
            }

            let expected = event.format_size - 1;
            if partners.len() != expected {
                return Err(QueueError::WrongPartnerCount {
                    expected,
                    actual: partners.len(),
                });
            }
            let mut seen: HashSet<UserId> = HashSet::from([identity.id]);
            for partner in &partners {
                if !seen.insert(partner.id) {
                    return Err(QueueError::DuplicatePlayer);
                }
            }
            for partner in &partners {
                if let Some(squad) = event.squad_of(partner.id) {
                    return Err(QueueError::PartnerAlreadyInSquad {
                        name: member_name(squad, partner.id),
                    });
                }
            }
        }

        // resolve ratings with the event unlocked; nothing is committed yet
        let mut candidates = vec![identity.clone()];
        candidates.extend(partners);
        let resolved = self
            .ratings
            .resolve(&candidates)
            .await
            .map_err(|e| QueueError::LookupFailed {
                message: e.to_string(),
            })?;

        let mut not_found = Vec::new();
        let mut players = Vec::new();
        for (i, slot) in resolved.into_iter().enumerate() {
            match slot {
                // the joining player is pre-confirmed, partners are not
                Some(rated) => players.push(Player::from_rated(rated, i == 0)),
                None => not_found.push(candidates[i].display_name.clone()),
            }
        }
        if !not_found.is_empty() {
            return Err(QueueError::RatingNotFound { names: not_found });
        }

        let (outcome, instantly_complete) = {
            let mut event = handle.lock().await;
            Self::ensure_open(&event)?;
            // roster may have changed while the lookup ran
            for candidate in &candidates {
                if let Some(squad) = event.squad_of(candidate.id) {
                    let name = member_name(squad, candidate.id);
                    return Err(if candidate.id == identity.id {
                        QueueError::AlreadyInSquad { name }
                    } else {
                        QueueError::PartnerAlreadyInSquad { name }
                    });
                }
            }

            let squad = Squad::new(players);
            let members = squad.member_names();
            let instantly_complete = squad.is_complete();
            event.squads.push(squad);
            info!(
                "Formed squad [{}] in event {}",
                members.join(", "),
                event.id
            );
            (
                JoinOutcome::SquadFormed {
                    members,
                    format_size: event.format_size,
                    registered_count: event.registered_count(),
                },
                instantly_complete,
            )
        };

        // a solo-format squad registers the moment it forms
        if instantly_complete {
            self.post_registration(&handle).await;
        }
        Ok(outcome)
    }

    fn confirm_member(event: &mut Event, user: UserId) -> Result<ConfirmOutcome, QueueError> {
        let format_size = event.format_size;
        let outcome = {
            let squad = event
                .squad_of_mut(user)
                .expect("confirm_member caller verified membership");
            let player = squad
                .player_mut(user)
                .expect("squad_of_mut returned a squad without the member");
            if player.confirmed {
                return Err(QueueError::AlreadyConfirmed {
                    name: player.rating_name.clone(),
                });
            }
            player.confirmed = true;
            let name = player.rating_name.clone();
            ConfirmOutcome {
                name,
                confirmed_count: squad.confirmed_count(),
                format_size,
                missing: squad.unconfirmed_names(),
                squad_complete: squad.is_complete(),
                registered_count: 0,
            }
        };
        Ok(ConfirmOutcome {
            registered_count: event.registered_count(),
            ..outcome
        })
    }

    /// After a squad registers: pre-provision room sub-channels and close
    /// an exactly-full intake early.
    async fn post_registration(&self, handle: &EventHandle) {
        let mut event = handle.lock().await;
        if !event.gathering {
            return;
        }
        if let Err(e) = self.partitioner.provision_fillable_rooms(&mut event).await {
            warn!(
                "Room pre-provisioning failed for event {}: {}",
                event.id, e
            );
            self.batcher.enqueue(
                event.channel,
                format!("An error occurred while creating a room channel: {e}"),
            );
        }
        self.check_num_teams(&mut event, crate::utils::current_timestamp());
    }

    /// Close intake the moment the join deadline has passed and the
    /// confirmed count divides evenly into rooms, without waiting for the
    /// next scheduler tick.
    pub fn check_num_teams(&self, event: &mut Event, now: DateTime<Utc>) {
        if !event.gathering || !event.auto_managed {
            return;
        }
        let Some(join_deadline) = event.join_deadline(&self.schedule) else {
            return;
        };
        if now < join_deadline {
            return;
        }
        let registered = event.registered_count();
        if registered > 0 && registered % event.squads_per_room() == 0 {
            event.gathering = false;
            info!(
                "Event {} reached an exact room multiple ({} squads); intake closed",
                event.id, registered
            );
            self.batcher.enqueue(
                event.channel,
                "A sufficient number of squads has been reached, so the event has been \
                 closed to extra squads. Rooms will be made shortly.",
            );
        }
    }

    /// Remove the caller's entire squad from the event
    pub async fn drop_squad(
        &self,
        channel: ChannelId,
        identity: Identity,
    ) -> Result<DropOutcome, QueueError> {
        let handle = self.handle(channel)?;
        let mut event = handle.lock().await;
        Self::ensure_open(&event)?;
        let squad = event
            .remove_squad_of(identity.id)
            .ok_or(QueueError::NotInSquad {
                name: identity.display_name,
            })?;
        info!(
            "Squad [{}] dropped from event {}",
            squad.member_names().join(", "),
            event.id
        );
        Ok(DropOutcome {
            members: squad.member_names(),
            was_complete: squad.is_complete(),
        })
    }

    /// Operator-privileged removal of any member's squad; allowed even
    /// after intake has closed, for correcting a no-show.
    pub async fn forced_removal(
        &self,
        channel: ChannelId,
        target: Identity,
    ) -> Result<DropOutcome, QueueError> {
        let handle = self.handle(channel)?;
        let mut event = handle.lock().await;
        if !event.started {
            return Err(QueueError::NotJoinable);
        }
        let squad = event
            .remove_squad_of(target.id)
            .ok_or(QueueError::NotInSquad {
                name: target.display_name,
            })?;
        info!(
            "Operator removed squad [{}] from event {}",
            squad.member_names().join(", "),
            event.id
        );
        Ok(DropOutcome {
            members: squad.member_names(),
            was_complete: squad.is_complete(),
        })
    }

    /// Swap `out` for `incoming` in the caller's squad. The incoming
    /// player must re-confirm.
    pub async fn substitute(
        &self,
        channel: ChannelId,
        caller: Identity,
        out: Identity,
        incoming: Identity,
    ) -> Result<SubstituteOutcome, QueueError> {
        let handle = self.handle(channel)?;

        {
            let event = handle.lock().await;
            Self::ensure_open(&event)?;
            if event.format_size == 1 {
                return Err(QueueError::SubstituteUnavailable);
            }
            let squad = event.squad_of(caller.id).ok_or(QueueError::NotInSquad {
                name: caller.display_name.clone(),
            })?;
            if !squad.has_player(out.id) {
                return Err(QueueError::NotInSquad {
                    name: out.display_name.clone(),
                });
            }
            if let Some(other) = event.squad_of(incoming.id) {
                return Err(QueueError::AlreadyInSquad {
                    name: member_name(other, incoming.id),
                });
            }
        }

        let resolved = self
            .ratings
            .resolve(std::slice::from_ref(&incoming))
            .await
            .map_err(|e| QueueError::LookupFailed {
                message: e.to_string(),
            })?;
        let rated = resolved
            .into_iter()
            .next()
            .flatten()
            .ok_or(QueueError::RatingNotFound {
                names: vec![incoming.display_name.clone()],
            })?;

        let mut event = handle.lock().await;
        Self::ensure_open(&event)?;
        if let Some(other) = event.squad_of(incoming.id) {
            return Err(QueueError::AlreadyInSquad {
                name: member_name(other, incoming.id),
            });
        }
        let event_id = event.id;
        let squad = event.squad_of_mut(caller.id).ok_or(QueueError::NotInSquad {
            name: caller.display_name.clone(),
        })?;
        let outgoing = squad
            .substitute(out.id, Player::from_rated(rated, false))
            .ok_or(QueueError::NotInSquad {
                name: out.display_name.clone(),
            })?;
        let outcome = SubstituteOutcome {
            out_name: outgoing.rating_name,
            in_name: squad
                .player(incoming.id)
                .map(|p| p.rating_name.clone())
                .unwrap_or(incoming.display_name),
            members: squad.member_names(),
        };
        info!(
            "Substitution in event {}: {} replaced {}",
            event_id, outcome.in_name, outcome.out_name
        );
        Ok(outcome)
    }

    /// Out-of-band score reporting into a partitioned room. Returns whether
    /// a matching player was found.
    pub async fn report_score(
        &self,
        channel: ChannelId,
        sub_channel: SubChannelId,
        user: UserId,
        score: u32,
    ) -> Result<bool, QueueError> {
        let handle = self.handle(channel)?;
        let mut event = handle.lock().await;
        let Some(room) = event.room_for_subchannel_mut(sub_channel) else {
            return Ok(false);
        };
        for squad in &mut room.squads {
            if let Some(player) = squad.player_mut(user) {
                player.score = score;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Ranked list of confirmed squads
    pub async fn roster(&self, channel: ChannelId) -> Result<RosterView, QueueError> {
        let handle = self.handle(channel)?;
        let event = handle.lock().await;
        if !event.started {
            return Err(QueueError::NotJoinable);
        }
        Ok(event.roster_view())
    }

    /// The caller's squad with per-member confirmation state
    pub async fn squad_info(
        &self,
        channel: ChannelId,
        identity: Identity,
    ) -> Result<SquadView, QueueError> {
        let handle = self.handle(channel)?;
        let event = handle.lock().await;
        if !event.started {
            return Err(QueueError::NotJoinable);
        }
        event.squad_view(identity.id).ok_or(QueueError::NotInSquad {
            name: identity.display_name,
        })
    }
}

fn member_name(squad: &Squad, user: UserId) -> String {
    squad
        .player(user)
        .map(|p| p.rating_name.clone())
        .unwrap_or_default()
}
