//! Database access layer

pub mod menu;
pub mod notification_prefs;
pub mod orders;
pub mod profiles;
pub mod settings;
pub mod webhook_events;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
