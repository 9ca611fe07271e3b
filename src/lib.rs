//! Squad Queue - matchmaking engine for time-boxed squad events
//!
//! This crate coordinates capacity-limited matchmaking sessions: players
//! register into fixed-size squads, squads confirm participation, and
//! confirmed squads are partitioned into skill-ranked rooms either on
//! operator command or by a background scheduler driven by configured time
//! offsets.

pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod gateway;
pub mod rating;
pub mod scheduler;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{QueueError, Result};
pub use types::*;

// Re-export key components
pub use engine::{ConfirmationEngine, RoomPartitioner};
pub use event::{Event, EventRegistry};
pub use gateway::{MessageBatcher, NotificationSink, SubChannelProvisioner};
pub use rating::RatingProvider;
pub use scheduler::Scheduler;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
