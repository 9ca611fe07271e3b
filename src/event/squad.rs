//! Players and squads
//!
//! A squad is an ordered list of players with a derived average rating.
//! The average is recomputed on every roster change so it is never stale.

use crate::types::{Identity, RatedPlayer, Rating, UserId};
use serde::{Deserialize, Serialize};

/// One queued player inside a squad
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub identity: Identity,
    /// Name the player goes by on the rating leaderboard
    pub rating_name: String,
    pub rating: Rating,
    pub confirmed: bool,
    /// Written once per room by the out-of-band score reporting path
    pub score: u32,
}

impl Player {
    pub fn from_rated(rated: RatedPlayer, confirmed: bool) -> Self {
        Self {
            identity: rated.identity,
            rating_name: rated.rating_name,
            rating: rated.rating,
            confirmed,
            score: 0,
        }
    }
}

/// A fixed-size group of players queued together.
///
/// Complete ("registered") once every member has confirmed. Exclusively
/// owned by one event; rooms receive their own copies at partition time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Squad {
    players: Vec<Player>,
    average_rating: f64,
}

impl Squad {
    pub fn new(players: Vec<Player>) -> Self {
        let mut squad = Self {
            players,
            average_rating: 0.0,
        };
        squad.recalc_average();
        squad
    }

    fn recalc_average(&mut self) {
        if self.players.is_empty() {
            self.average_rating = 0.0;
            return;
        }
        let total: Rating = self.players.iter().map(|p| p.rating).sum();
        self.average_rating = total as f64 / self.players.len() as f64;
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn average_rating(&self) -> f64 {
        self.average_rating
    }

    /// Every member has confirmed
    pub fn is_complete(&self) -> bool {
        self.players.iter().all(|p| p.confirmed)
    }

    pub fn has_player(&self, user: UserId) -> bool {
        self.players.iter().any(|p| p.identity.id == user)
    }

    pub fn player(&self, user: UserId) -> Option<&Player> {
        self.players.iter().find(|p| p.identity.id == user)
    }

    pub fn player_mut(&mut self, user: UserId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.identity.id == user)
    }

    pub fn confirmed_count(&self) -> usize {
        self.players.iter().filter(|p| p.confirmed).count()
    }

    pub fn unconfirmed_names(&self) -> Vec<String> {
        self.players
            .iter()
            .filter(|p| !p.confirmed)
            .map(|p| p.rating_name.clone())
            .collect()
    }

    pub fn member_names(&self) -> Vec<String> {
        self.players.iter().map(|p| p.rating_name.clone()).collect()
    }

    /// Swap one member out for an incoming player, preserving position.
    /// Returns the outgoing player, or None if `out` is not a member.
    pub fn substitute(&mut self, out: UserId, incoming: Player) -> Option<Player> {
        let index = self.players.iter().position(|p| p.identity.id == out)?;
        let outgoing = std::mem::replace(&mut self.players[index], incoming);
        self.recalc_average();
        Some(outgoing)
    }
}
