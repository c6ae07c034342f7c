//! Settlement of gateway notifications
//!
//! Both gateways funnel into `confirm_payment` / `record_unsuccessful`. The
//! order row is locked for the whole confirmation, so concurrent deliveries
//! of the same payment settle it once.

use shared::error::{AppError, ErrorCode};
use shared::models::{Order, OrderDetail, OrderItem, OrderStatus, PaymentProvider};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::db;
use crate::error::ServiceResult;
use crate::payments::PaymentOutcome;
use crate::state::AppState;

/// Result of a confirmation attempt
#[derive(Debug)]
pub struct Confirmation {
    pub order: Order,
    /// `false` when the order was already paid or no longer payable
    pub applied: bool,
}

/// Whether a payment notification may still settle an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settleable {
    AlreadyPaid,
    /// Past checkout (in the kitchen, completed or cancelled)
    NotPayable,
    Open,
}

pub fn settleable(order: &Order) -> Settleable {
    if order.is_paid() {
        Settleable::AlreadyPaid
    } else if !order.status.is_payable() {
        Settleable::NotPayable
    } else {
        Settleable::Open
    }
}

/// Units to draw per tracked menu item, merged across lines and ordered by id
pub fn stock_draws(items: &[OrderItem]) -> Vec<(Uuid, i32)> {
    let mut draws: BTreeMap<Uuid, i32> = BTreeMap::new();
    for item in items {
        if let Some(menu_item_id) = item.menu_item_id {
            *draws.entry(menu_item_id).or_default() += item.quantity;
        }
    }
    draws.into_iter().collect()
}

/// Load a customer's own order that can still start a gateway session.
///
/// Orders of other customers read as not found.
pub async fn payable_order_for(
    state: &AppState,
    order_id: Uuid,
    user_id: Uuid,
) -> ServiceResult<Order> {
    let order = db::orders::find_by_id(&state.pool, order_id)
        .await?
        .filter(|o| o.user_id == Some(user_id))
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

    if settleable(&order) != Settleable::Open {
        return Err(AppError::new(ErrorCode::OrderNotPayable)
            .with_detail("status", order.status.as_db())
            .with_detail("payment_status", order.payment_status.as_db())
            .into());
    }
    if order.total_amount <= rust_decimal::Decimal::ZERO {
        return Err(AppError::new(ErrorCode::PaymentAmountOutOfRange)
            .with_detail("total_amount", order.total_amount.to_string())
            .into());
    }
    Ok(order)
}

/// Mark an order paid and draw down tracked stock
pub async fn confirm_payment(
    state: &AppState,
    order_id: Uuid,
    provider: PaymentProvider,
    reference: Option<&str>,
) -> ServiceResult<Confirmation> {
    let now = shared::util::now_millis();
    let mut tx = state.pool.begin().await?;

    let order = db::orders::lock_by_id(&mut tx, order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

    match settleable(&order) {
        Settleable::Open => {}
        Settleable::AlreadyPaid => {
            tracing::info!(order_id = %order_id, "Payment already confirmed, skipping");
            return Ok(Confirmation {
                order,
                applied: false,
            });
        }
        Settleable::NotPayable => {
            tracing::warn!(
                order_id = %order_id,
                status = %order.status,
                provider = %provider,
                "Payment received for an order that is no longer payable"
            );
            return Ok(Confirmation {
                order,
                applied: false,
            });
        }
    }

    // The reference stored when the session was created stays authoritative
    let reference = reference.filter(|_| order.payment_reference.is_none());
    let order = db::orders::mark_paid(&mut tx, order_id, provider, reference, now).await?;
    let items = db::orders::items_for_order(&mut tx, order_id).await?;
    for (menu_item_id, quantity) in stock_draws(&items) {
        db::menu::decrement_stock(&mut tx, menu_item_id, quantity, now).await?;
    }
    tx.commit().await?;

    tracing::info!(
        order_id = %order_id,
        order_number = %order.order_number,
        provider = %provider,
        total = %order.total_amount,
        "Payment confirmed"
    );

    state.live_orders.publish_update(OrderDetail {
        order: order.clone(),
        items,
    });
    Ok(Confirmation {
        order,
        applied: true,
    })
}

/// Cancel an unpaid order after a failed, cancelled or expired payment.
///
/// Returns `None` when the order is paid or already past checkout; it is
/// left untouched.
pub async fn record_unsuccessful(
    state: &AppState,
    order_id: Uuid,
    outcome: PaymentOutcome,
    provider: PaymentProvider,
) -> ServiceResult<Option<Order>> {
    let now = shared::util::now_millis();
    let mut tx = state.pool.begin().await?;

    let order = db::orders::lock_by_id(&mut tx, order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    if settleable(&order) != Settleable::Open {
        tracing::warn!(
            order_id = %order_id,
            status = %order.status,
            payment_status = %order.payment_status,
            outcome = ?outcome,
            "Ignoring payment failure for an order past checkout"
        );
        return Ok(None);
    }

    let updated = db::orders::mark_payment_outcome(
        &mut tx,
        order_id,
        OrderStatus::Cancelled,
        outcome.payment_status(),
        provider,
        now,
    )
    .await?;
    let items = db::orders::items_for_order(&mut tx, order_id).await?;
    tx.commit().await?;

    if let Some(order) = &updated {
        tracing::info!(
            order_id = %order_id,
            payment_status = %order.payment_status,
            provider = %provider,
            "Unsuccessful payment recorded"
        );
        state.live_orders.publish_update(OrderDetail {
            order: order.clone(),
            items,
        });
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::{OrderType, PaymentStatus};

    fn order(status: OrderStatus, payment_status: PaymentStatus) -> Order {
        Order {
            id: Uuid::from_u128(1),
            user_id: Some(Uuid::from_u128(2)),
            order_number: "LL000001".into(),
            customer_name: None,
            customer_email: None,
            customer_phone: Some("0821234567".into()),
            subtotal: Decimal::new(4250, 2),
            delivery_fee: Decimal::ZERO,
            total_amount: Decimal::new(4250, 2),
            status,
            payment_status,
            payment_provider: None,
            payment_reference: None,
            order_type: OrderType::Pickup,
            delivery_address: None,
            delivery_zone: None,
            special_instructions: None,
            estimated_ready_time: None,
            paid_at: None,
            completed_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn line(menu_item: Option<u128>, quantity: i32) -> OrderItem {
        OrderItem {
            id: Uuid::new_v4(),
            order_id: Uuid::from_u128(1),
            menu_item_id: menu_item.map(Uuid::from_u128),
            name: "Flat white".into(),
            quantity,
            unit_price: Decimal::ONE,
            total_price: Decimal::from(quantity),
            customizations: None,
            special_requests: None,
            created_at: 0,
        }
    }

    #[test]
    fn unpaid_drafts_and_pending_orders_settle() {
        for status in [OrderStatus::Draft, OrderStatus::Pending] {
            assert_eq!(
                settleable(&order(status, PaymentStatus::Pending)),
                Settleable::Open
            );
        }
    }

    #[test]
    fn paid_orders_are_left_alone() {
        assert_eq!(
            settleable(&order(OrderStatus::Confirmed, PaymentStatus::Paid)),
            Settleable::AlreadyPaid
        );
        assert_eq!(
            settleable(&order(OrderStatus::Completed, PaymentStatus::Paid)),
            Settleable::AlreadyPaid
        );
    }

    #[test]
    fn orders_past_checkout_ignore_late_notifications() {
        for status in [
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(
                settleable(&order(status, PaymentStatus::Pending)),
                Settleable::NotPayable,
                "{status}"
            );
        }
    }

    #[test]
    fn stock_draws_merge_lines_and_skip_custom_items() {
        let draws = stock_draws(&[
            line(Some(5), 2),
            line(None, 4),
            line(Some(3), 1),
            line(Some(5), 3),
        ]);
        assert_eq!(
            draws,
            vec![(Uuid::from_u128(3), 1), (Uuid::from_u128(5), 5)]
        );
        assert!(stock_draws(&[line(None, 1)]).is_empty());
    }
}
