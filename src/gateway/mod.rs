//! Chat-platform gateway seams
//!
//! The engine never talks to the platform directly; it goes through these
//! capability traits. Outbound text flows through the batcher so message
//! production is decoupled from delivery cadence.

pub mod batcher;
pub mod provisioner;
pub mod sink;

pub use batcher::MessageBatcher;
pub use provisioner::{InMemorySubChannelProvisioner, SubChannelProvisioner};
pub use sink::{LogSink, NotificationSink, RecordingSink};
