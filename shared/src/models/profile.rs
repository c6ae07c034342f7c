//! Profile Model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Customer/staff profile; `id` equals the auth provider's user id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Profile {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub is_admin: bool,
    pub is_staff: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Profile {
    /// Admins count as staff
    pub fn is_staff_member(&self) -> bool {
        self.is_staff || self.is_admin
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
}
