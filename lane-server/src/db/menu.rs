//! Menu database operations

use shared::models::{MenuCategory, MenuItem, MenuItemCreate, MenuItemUpdate};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

// ── Public reads ──

pub async fn list_active_categories(pool: &PgPool) -> Result<Vec<MenuCategory>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM menu_categories WHERE is_active = TRUE ORDER BY display_order, name",
    )
    .fetch_all(pool)
    .await
}

pub async fn find_active_category(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<MenuCategory>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM menu_categories WHERE id = $1 AND is_active = TRUE")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Available items, optionally restricted to one category
pub async fn list_available_items(
    pool: &PgPool,
    category_id: Option<Uuid>,
) -> Result<Vec<MenuItem>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM menu_items
         WHERE is_available = TRUE AND ($1::uuid IS NULL OR category_id = $1)
         ORDER BY display_order, name",
    )
    .bind(category_id)
    .fetch_all(pool)
    .await
}

pub async fn find_item(pool: &PgPool, id: Uuid) -> Result<Option<MenuItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM menu_items WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Items referenced by a cart, in one round trip
pub async fn find_items(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<MenuItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM menu_items WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
}

pub async fn category_exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM menu_categories WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

// ── Admin writes ──

pub async fn create_item(
    pool: &PgPool,
    data: &MenuItemCreate,
    now: i64,
) -> Result<MenuItem, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO menu_items (
            id, category_id, name, description, price, image_url, is_available,
            is_featured, allergens, preparation_time, display_order, stock,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(data.category_id)
    .bind(data.name.trim())
    .bind(&data.description)
    .bind(data.price)
    .bind(&data.image_url)
    .bind(data.is_available.unwrap_or(true))
    .bind(data.is_featured.unwrap_or(false))
    .bind(data.allergens.clone().unwrap_or_default())
    .bind(data.preparation_time)
    .bind(data.display_order.unwrap_or(0))
    .bind(data.stock)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn update_item(
    pool: &PgPool,
    id: Uuid,
    data: &MenuItemUpdate,
    now: i64,
) -> Result<Option<MenuItem>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE menu_items SET
            category_id = COALESCE($2, category_id),
            name = COALESCE($3, name),
            description = COALESCE($4, description),
            price = COALESCE($5, price),
            image_url = COALESCE($6, image_url),
            is_available = COALESCE($7, is_available),
            is_featured = COALESCE($8, is_featured),
            allergens = COALESCE($9, allergens),
            preparation_time = COALESCE($10, preparation_time),
            display_order = COALESCE($11, display_order),
            updated_at = $12
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(data.category_id)
    .bind(data.name.as_deref().map(str::trim))
    .bind(&data.description)
    .bind(data.price)
    .bind(&data.image_url)
    .bind(data.is_available)
    .bind(data.is_featured)
    .bind(&data.allergens)
    .bind(data.preparation_time)
    .bind(data.display_order)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub async fn set_availability(
    pool: &PgPool,
    id: Uuid,
    is_available: bool,
    now: i64,
) -> Result<Option<MenuItem>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE menu_items SET is_available = $2, updated_at = $3 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(is_available)
    .bind(now)
    .fetch_optional(pool)
    .await
}

/// Set tracked stock; `None` stops tracking
pub async fn set_stock(
    pool: &PgPool,
    id: Uuid,
    stock: Option<i32>,
    now: i64,
) -> Result<Option<MenuItem>, sqlx::Error> {
    sqlx::query_as("UPDATE menu_items SET stock = $2, updated_at = $3 WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(stock)
        .bind(now)
        .fetch_optional(pool)
        .await
}

/// Decrement tracked stock, never below zero; untracked items are left alone
pub async fn decrement_stock(
    conn: &mut PgConnection,
    id: Uuid,
    quantity: i32,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE menu_items SET stock = GREATEST(stock - $2, 0), updated_at = $3
         WHERE id = $1 AND stock IS NOT NULL",
    )
    .bind(id)
    .bind(quantity)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}
