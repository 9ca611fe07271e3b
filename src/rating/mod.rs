//! Skill-rating lookup interface
//!
//! Rating computation is external; the engine only consumes an opaque
//! number per identity, or "no rating on record."

pub mod provider;

pub use provider::{InMemoryRatingProvider, RatingProvider};
