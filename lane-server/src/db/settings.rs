//! Theme settings (visual editor + closure flags)

use shared::models::{SettingQuery, SettingUpsert, ThemeSetting};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

pub async fn list(pool: &PgPool, query: &SettingQuery) -> Result<Vec<ThemeSetting>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM theme_settings
         WHERE ($1::text IS NULL OR page_scope = $1)
           AND ($2::text IS NULL OR category = $2)
         ORDER BY setting_key, page_scope",
    )
    .bind(&query.page_scope)
    .bind(&query.category)
    .fetch_all(pool)
    .await
}

pub async fn find(
    pool: &PgPool,
    page_scope: &str,
    key: &str,
) -> Result<Option<ThemeSetting>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM theme_settings WHERE page_scope = $1 AND setting_key = $2")
        .bind(page_scope)
        .bind(key)
        .fetch_optional(pool)
        .await
}

/// Values of several keys in one scope, as (key, value) pairs
pub async fn values(
    pool: &PgPool,
    page_scope: &str,
    keys: &[&str],
) -> Result<Vec<(String, Option<String>)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT setting_key, setting_value FROM theme_settings
         WHERE page_scope = $1 AND setting_key = ANY($2)",
    )
    .bind(page_scope)
    .bind(keys)
    .fetch_all(pool)
    .await
}

/// Insert or replace one setting on (setting_key, page_scope)
pub async fn upsert(
    conn: &mut PgConnection,
    data: &SettingUpsert,
    updated_by: Option<Uuid>,
    now: i64,
) -> Result<ThemeSetting, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO theme_settings (
            id, setting_key, setting_value, page_scope, category, updated_by, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (setting_key, page_scope)
        DO UPDATE SET
            setting_value = EXCLUDED.setting_value,
            category = COALESCE(EXCLUDED.category, theme_settings.category),
            updated_by = EXCLUDED.updated_by,
            updated_at = EXCLUDED.updated_at
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&data.setting_key)
    .bind(&data.setting_value)
    .bind(&data.page_scope)
    .bind(&data.category)
    .bind(updated_by)
    .bind(now)
    .fetch_one(conn)
    .await
}

/// Returns `true` if a row was deleted
pub async fn delete(pool: &PgPool, page_scope: &str, key: &str) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM theme_settings WHERE page_scope = $1 AND setting_key = $2")
            .bind(page_scope)
            .bind(key)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete several keys of one scope
pub async fn delete_keys(
    conn: &mut PgConnection,
    page_scope: &str,
    keys: &[&str],
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM theme_settings WHERE page_scope = $1 AND setting_key = ANY($2)",
    )
    .bind(page_scope)
    .bind(keys)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
