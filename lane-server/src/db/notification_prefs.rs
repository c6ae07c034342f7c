use shared::models::NotificationPreferences;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn find(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<NotificationPreferences>, sqlx::Error> {
    sqlx::query_as(
        "SELECT push_enabled, email_enabled, sms_enabled, order_updates_enabled,
                promotional_enabled, event_announcements_enabled
         FROM notification_preferences WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn upsert(
    pool: &PgPool,
    user_id: Uuid,
    prefs: &NotificationPreferences,
    now: i64,
) -> Result<NotificationPreferences, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO notification_preferences (
            user_id, push_enabled, email_enabled, sms_enabled, order_updates_enabled,
            promotional_enabled, event_announcements_enabled, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (user_id)
        DO UPDATE SET
            push_enabled = EXCLUDED.push_enabled,
            email_enabled = EXCLUDED.email_enabled,
            sms_enabled = EXCLUDED.sms_enabled,
            order_updates_enabled = EXCLUDED.order_updates_enabled,
            promotional_enabled = EXCLUDED.promotional_enabled,
            event_announcements_enabled = EXCLUDED.event_announcements_enabled,
            updated_at = EXCLUDED.updated_at
        RETURNING push_enabled, email_enabled, sms_enabled, order_updates_enabled,
                  promotional_enabled, event_announcements_enabled
        "#,
    )
    .bind(user_id)
    .bind(prefs.push_enabled)
    .bind(prefs.email_enabled)
    .bind(prefs.sms_enabled)
    .bind(prefs.order_updates_enabled)
    .bind(prefs.promotional_enabled)
    .bind(prefs.event_announcements_enabled)
    .bind(now)
    .fetch_one(pool)
    .await
}
