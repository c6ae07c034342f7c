use shared::models::{Profile, ProfileUpdate};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM profiles WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Update the editable fields; `None` keeps the stored value
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    data: &ProfileUpdate,
    now: i64,
) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE profiles SET
            full_name = COALESCE($2, full_name),
            phone_number = COALESCE($3, phone_number),
            updated_at = $4
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(&data.full_name)
    .bind(&data.phone_number)
    .bind(now)
    .fetch_optional(pool)
    .await
}
