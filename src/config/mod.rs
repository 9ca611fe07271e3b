//! Configuration for the matchmaking engine

pub mod app;

pub use app::{AppConfig, MessagingSettings, ScheduleSettings, ServiceSettings};
