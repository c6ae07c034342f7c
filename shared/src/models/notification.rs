//! Notification Preference Model

use serde::{Deserialize, Serialize};

/// Per-user notification switches
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct NotificationPreferences {
    pub push_enabled: bool,
    pub email_enabled: bool,
    pub sms_enabled: bool,
    pub order_updates_enabled: bool,
    pub promotional_enabled: bool,
    pub event_announcements_enabled: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            push_enabled: true,
            email_enabled: true,
            sms_enabled: false,
            order_updates_enabled: true,
            promotional_enabled: true,
            event_announcements_enabled: true,
        }
    }
}

/// Partial update; unset fields keep their current value
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NotificationPreferencesUpdate {
    pub push_enabled: Option<bool>,
    pub email_enabled: Option<bool>,
    pub sms_enabled: Option<bool>,
    pub order_updates_enabled: Option<bool>,
    pub promotional_enabled: Option<bool>,
    pub event_announcements_enabled: Option<bool>,
}

impl NotificationPreferences {
    pub fn merge(self, update: &NotificationPreferencesUpdate) -> Self {
        Self {
            push_enabled: update.push_enabled.unwrap_or(self.push_enabled),
            email_enabled: update.email_enabled.unwrap_or(self.email_enabled),
            sms_enabled: update.sms_enabled.unwrap_or(self.sms_enabled),
            order_updates_enabled: update
                .order_updates_enabled
                .unwrap_or(self.order_updates_enabled),
            promotional_enabled: update
                .promotional_enabled
                .unwrap_or(self.promotional_enabled),
            event_announcements_enabled: update
                .event_announcements_enabled
                .unwrap_or(self.event_announcements_enabled),
        }
    }
}
