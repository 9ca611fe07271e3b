//! Rating provider interface and in-memory implementation

use crate::error::Result;
use crate::types::{Identity, RatedPlayer, Rating, UserId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for resolving skill ratings from an external lookup service.
///
/// Implementations must preserve input order and cardinality exactly: one
/// output slot per queried identity, `None` meaning no rating on record.
/// Implementations are expected to fail fast on transport problems rather
/// than hang; the engine imposes no timeout of its own.
#[async_trait]
pub trait RatingProvider: Send + Sync {
    async fn resolve(&self, identities: &[Identity]) -> Result<Vec<Option<RatedPlayer>>>;
}

/// In-memory rating table for tests and standalone runs
#[derive(Debug, Default)]
pub struct InMemoryRatingProvider {
    ratings: RwLock<HashMap<UserId, (String, Rating)>>,
}

impl InMemoryRatingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: UserId, rating_name: impl Into<String>, rating: Rating) {
        self.ratings
            .write()
            .expect("rating table lock poisoned")
            .insert(user, (rating_name.into(), rating));
    }

    pub fn remove(&self, user: UserId) {
        self.ratings
            .write()
            .expect("rating table lock poisoned")
            .remove(&user);
    }
}

#[async_trait]
impl RatingProvider for InMemoryRatingProvider {
    async fn resolve(&self, identities: &[Identity]) -> Result<Vec<Option<RatedPlayer>>> {
        let ratings = self.ratings.read().expect("rating table lock poisoned");
        Ok(identities
            .iter()
            .map(|identity| {
                ratings
                    .get(&identity.id)
                    .map(|(rating_name, rating)| RatedPlayer {
                        identity: identity.clone(),
                        rating_name: rating_name.clone(),
                        rating: *rating,
                    })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_preserves_order_and_cardinality() {
        let provider = InMemoryRatingProvider::new();
        provider.insert(1, "alice", 1500);
        provider.insert(3, "carol", 1300);

        let identities = vec![
            Identity::new(3, "carol"),
            Identity::new(2, "bob"),
            Identity::new(1, "alice"),
        ];
        let resolved = provider.resolve(&identities).await.unwrap();

        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0].as_ref().unwrap().rating, 1300);
        assert!(resolved[1].is_none());
        assert_eq!(resolved[2].as_ref().unwrap().rating_name, "alice");
    }
}
