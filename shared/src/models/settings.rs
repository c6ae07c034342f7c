//! Theme Setting Model (visual editor key/value store)

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scope shared by every page
pub const GLOBAL_SCOPE: &str = "global";

/// Theme setting entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ThemeSetting {
    pub id: Uuid,
    pub setting_key: String,
    pub setting_value: Option<String>,
    pub page_scope: String,
    pub category: Option<String>,
    pub updated_by: Option<Uuid>,
    pub updated_at: i64,
}

/// Upsert payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingUpsert {
    pub setting_key: String,
    pub setting_value: Option<String>,
    #[serde(default = "default_scope")]
    pub page_scope: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingBatch {
    pub settings: Vec<SettingUpsert>,
}

/// Filter for listing settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingQuery {
    pub page_scope: Option<String>,
    pub category: Option<String>,
}

fn default_scope() -> String {
    GLOBAL_SCOPE.to_string()
}
