//! Matchmaking engine: confirmation operations and room partitioning

pub mod confirmation;
pub mod partition;

pub use confirmation::ConfirmationEngine;
pub use partition::{clock_offsets, RoomPartitioner};
