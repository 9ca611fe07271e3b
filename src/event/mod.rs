//! Roster model: players, squads, rooms, and the event that owns them
//!
//! Pure data plus invariant-preserving mutators; no I/O lives here.

pub mod instance;
pub mod registry;
pub mod squad;

pub use instance::{rating_order, Event, Room};
pub use registry::EventRegistry;
pub use squad::{Player, Squad};
