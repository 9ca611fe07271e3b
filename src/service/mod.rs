//! Service wiring: component construction, background tasks, dispatch

pub mod app;

pub use app::App;
