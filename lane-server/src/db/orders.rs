//! Order database operations

use rust_decimal::Decimal;
use serde_json::Value;
use shared::models::{
    KitchenAnalytics, Order, OrderItem, OrderStatus, OrderType, PaymentProvider, PaymentStatus,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Order header as priced by checkout
#[derive(Debug)]
pub struct NewOrder<'a> {
    pub user_id: Uuid,
    pub customer_name: Option<&'a str>,
    pub customer_email: Option<&'a str>,
    pub customer_phone: &'a str,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total_amount: Decimal,
    pub order_type: OrderType,
    pub delivery_address: Option<&'a str>,
    pub delivery_zone: Option<&'a str>,
    pub special_instructions: Option<&'a str>,
}

/// Priced order line
#[derive(Debug)]
pub struct NewOrderItem {
    pub menu_item_id: Option<Uuid>,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub customizations: Option<Value>,
    pub special_requests: Option<String>,
}

// ── Checkout ──

/// `LL` + zero-padded value of `order_number_seq`
pub async fn next_order_number(conn: &mut PgConnection) -> Result<String, sqlx::Error> {
    let (seq,): (i64,) = sqlx::query_as("SELECT nextval('order_number_seq')")
        .fetch_one(conn)
        .await?;
    Ok(format_order_number(seq))
}

pub fn format_order_number(seq: i64) -> String {
    format!("LL{seq:06}")
}

pub async fn insert_order(
    conn: &mut PgConnection,
    order_number: &str,
    data: &NewOrder<'_>,
    now: i64,
) -> Result<Order, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO orders (
            id, user_id, order_number, customer_name, customer_email, customer_phone,
            subtotal, delivery_fee, total_amount, status, payment_status, order_type,
            delivery_address, delivery_zone, special_instructions, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $16)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(data.user_id)
    .bind(order_number)
    .bind(data.customer_name)
    .bind(data.customer_email)
    .bind(data.customer_phone)
    .bind(data.subtotal)
    .bind(data.delivery_fee)
    .bind(data.total_amount)
    .bind(OrderStatus::Draft.as_db())
    .bind(PaymentStatus::Pending.as_db())
    .bind(data.order_type.as_db())
    .bind(data.delivery_address)
    .bind(data.delivery_zone)
    .bind(data.special_instructions)
    .bind(now)
    .fetch_one(conn)
    .await
}

pub async fn insert_item(
    conn: &mut PgConnection,
    order_id: Uuid,
    item: &NewOrderItem,
    now: i64,
) -> Result<OrderItem, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO order_items (
            id, order_id, menu_item_id, name, quantity, unit_price, total_price,
            customizations, special_requests, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(order_id)
    .bind(item.menu_item_id)
    .bind(&item.name)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.total_price)
    .bind(&item.customizations)
    .bind(&item.special_requests)
    .bind(now)
    .fetch_one(conn)
    .await
}

// ── Reads ──

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Row-lock an order for the rest of the transaction
pub async fn lock_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn find_by_payment_reference(
    pool: &PgPool,
    reference: &str,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE payment_reference = $1")
        .bind(reference)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_order_number(
    pool: &PgPool,
    order_number: &str,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE order_number = $1")
        .bind(order_number)
        .fetch_optional(pool)
        .await
}

pub async fn items_for_order(
    conn: &mut PgConnection,
    order_id: Uuid,
) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY created_at, name")
        .bind(order_id)
        .fetch_all(conn)
        .await
}

pub async fn items_for_orders(
    pool: &PgPool,
    order_ids: &[Uuid],
) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM order_items WHERE order_id = ANY($1) ORDER BY created_at, name",
    )
    .bind(order_ids)
    .fetch_all(pool)
    .await
}

/// A customer's orders, newest first
pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM orders
         WHERE user_id = $1
         ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Kitchen board: orders in any of `statuses`, oldest first. Drafts never show.
pub async fn list_by_statuses(
    pool: &PgPool,
    statuses: &[OrderStatus],
) -> Result<Vec<Order>, sqlx::Error> {
    let statuses: Vec<&str> = statuses
        .iter()
        .filter(|s| **s != OrderStatus::Draft)
        .map(OrderStatus::as_db)
        .collect();
    sqlx::query_as("SELECT * FROM orders WHERE status = ANY($1) ORDER BY created_at ASC")
        .bind(statuses)
        .fetch_all(pool)
        .await
}

/// Active orders of one customer (live socket snapshot)
pub async fn list_active_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<Order>, sqlx::Error> {
    let statuses: Vec<&str> = OrderStatus::ACTIVE.iter().map(OrderStatus::as_db).collect();
    sqlx::query_as(
        "SELECT * FROM orders WHERE user_id = $1 AND status = ANY($2) ORDER BY created_at ASC",
    )
    .bind(user_id)
    .bind(statuses)
    .fetch_all(pool)
    .await
}

// ── Status and payment ──

/// Apply a kitchen/customer status change
pub async fn update_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: OrderStatus,
    estimated_ready_time: Option<i64>,
    now: i64,
) -> Result<Order, sqlx::Error> {
    let completed_at = (status == OrderStatus::Completed).then_some(now);
    sqlx::query_as(
        "UPDATE orders SET
            status = $2,
            estimated_ready_time = COALESCE($3, estimated_ready_time),
            completed_at = COALESCE($4, completed_at),
            updated_at = $5
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(status.as_db())
    .bind(estimated_ready_time)
    .bind(completed_at)
    .bind(now)
    .fetch_one(conn)
    .await
}

/// Remember which gateway session belongs to the order
pub async fn set_payment_reference(
    pool: &PgPool,
    id: Uuid,
    provider: PaymentProvider,
    reference: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE orders SET payment_provider = $2, payment_reference = $3, updated_at = $4
         WHERE id = $1",
    )
    .bind(id)
    .bind(provider.as_db())
    .bind(reference)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_paid(
    conn: &mut PgConnection,
    id: Uuid,
    provider: PaymentProvider,
    reference: Option<&str>,
    now: i64,
) -> Result<Order, sqlx::Error> {
    sqlx::query_as(
        "UPDATE orders SET
            status = 'confirmed',
            payment_status = 'paid',
            payment_provider = $2,
            payment_reference = COALESCE($3, payment_reference),
            paid_at = $4,
            updated_at = $4
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(provider.as_db())
    .bind(reference)
    .bind(now)
    .fetch_one(conn)
    .await
}

/// Record a failed/cancelled/expired payment on an unpaid draft or pending order
pub async fn mark_payment_outcome(
    conn: &mut PgConnection,
    id: Uuid,
    status: OrderStatus,
    payment_status: PaymentStatus,
    provider: PaymentProvider,
    now: i64,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE orders SET
            status = $2,
            payment_status = $3,
            payment_provider = $4,
            updated_at = $5
         WHERE id = $1
           AND payment_status <> 'paid'
           AND status IN ('draft', 'pending')
         RETURNING *",
    )
    .bind(id)
    .bind(status.as_db())
    .bind(payment_status.as_db())
    .bind(provider.as_db())
    .bind(now)
    .fetch_optional(conn)
    .await
}

/// Delete unpaid drafts created before `cutoff`, returning their ids
pub async fn delete_stale_drafts(pool: &PgPool, cutoff: i64) -> Result<Vec<Uuid>, sqlx::Error> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        "DELETE FROM orders
         WHERE status = 'draft' AND payment_status = 'pending' AND created_at < $1
         RETURNING id",
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Counters for orders created in `[day_start, day_end)`
pub async fn analytics_between(
    pool: &PgPool,
    day_start: i64,
    day_end: i64,
) -> Result<KitchenAnalytics, sqlx::Error> {
    let (orders_today, revenue_today, awaiting_preparation): (i64, Decimal, i64) =
        sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status <> 'draft'),
                COALESCE(SUM(total_amount) FILTER (WHERE status NOT IN ('draft', 'cancelled')), 0),
                COUNT(*) FILTER (WHERE status = 'confirmed')
            FROM orders
            WHERE created_at >= $1 AND created_at < $2
            "#,
        )
        .bind(day_start)
        .bind(day_end)
        .fetch_one(pool)
        .await?;

    Ok(KitchenAnalytics {
        orders_today,
        revenue_today,
        awaiting_preparation,
    })
}
