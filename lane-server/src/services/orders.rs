//! Order reads and status transitions (kitchen + customer cancel)

use shared::error::{AppError, ErrorCode};
use shared::models::{Order, OrderDetail, OrderItem, OrderStatus, StatusUpdate};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

/// Upper bound for a kitchen ready-time estimate
pub const MAX_ESTIMATE_MINUTES: i64 = 240;

/// Pair orders with their lines, keeping the order of `orders`
pub fn attach_items(orders: Vec<Order>, items: Vec<OrderItem>) -> Vec<OrderDetail> {
    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }
    orders
        .into_iter()
        .map(|order| {
            let items = by_order.remove(&order.id).unwrap_or_default();
            OrderDetail { order, items }
        })
        .collect()
}

pub async fn load_details(
    pool: &PgPool,
    orders: Vec<Order>,
) -> Result<Vec<OrderDetail>, sqlx::Error> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items = db::orders::items_for_orders(pool, &ids).await?;
    Ok(attach_items(orders, items))
}

pub async fn load_detail(pool: &PgPool, id: Uuid) -> Result<Option<OrderDetail>, sqlx::Error> {
    let Some(order) = db::orders::find_by_id(pool, id).await? else {
        return Ok(None);
    };
    Ok(load_details(pool, vec![order]).await?.pop())
}

/// Owners and staff may see an order
pub fn can_view(order: &Order, user_id: Uuid, is_staff: bool) -> bool {
    is_staff || order.user_id == Some(user_id)
}

/// Check a requested status change against the order lifecycle
pub fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<(), AppError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(AppError::invalid_transition(from.as_db(), to.as_db()))
    }
}

/// Status change requested from the kitchen dashboard.
///
/// A draft is still at checkout: only payment confirmation moves it forward,
/// so staff may cancel it but nothing else.
pub fn check_kitchen_transition(from: OrderStatus, to: OrderStatus) -> Result<(), AppError> {
    if from == OrderStatus::Draft && to != OrderStatus::Cancelled {
        return Err(AppError::invalid_transition(from.as_db(), to.as_db()));
    }
    check_transition(from, to)
}

/// Estimated ready time for a `ready` update carrying an estimate
fn estimated_ready_time(update: &StatusUpdate, now: i64) -> Result<Option<i64>, AppError> {
    let Some(minutes) = update.estimated_ready_minutes else {
        return Ok(None);
    };
    if !(0..=MAX_ESTIMATE_MINUTES).contains(&minutes) {
        return Err(AppError::with_message(
            ErrorCode::ValueOutOfRange,
            format!("estimated_ready_minutes must be between 0 and {MAX_ESTIMATE_MINUTES}"),
        ));
    }
    Ok((update.status == OrderStatus::Ready).then_some(now + minutes * 60_000))
}

/// Kitchen status change
pub async fn change_status(
    state: &AppState,
    order_id: Uuid,
    update: &StatusUpdate,
    changed_by: Uuid,
) -> ServiceResult<OrderDetail> {
    let now = shared::util::now_millis();
    let estimate = estimated_ready_time(update, now)?;

    let mut tx = state.pool.begin().await?;
    let order = db::orders::lock_by_id(&mut tx, order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    check_kitchen_transition(order.status, update.status)?;

    let order = db::orders::update_status(&mut tx, order_id, update.status, estimate, now).await?;
    let items = db::orders::items_for_order(&mut tx, order_id).await?;
    tx.commit().await?;

    tracing::info!(
        order_id = %order_id,
        status = %update.status,
        staff_id = %changed_by,
        "Order status changed"
    );

    let detail = OrderDetail { order, items };
    state.live_orders.publish_update(detail.clone());
    Ok(detail)
}

/// Customer cancellation of an unpaid order
pub async fn cancel_for_customer(
    state: &AppState,
    order_id: Uuid,
    user_id: Uuid,
) -> ServiceResult<OrderDetail> {
    let now = shared::util::now_millis();

    let mut tx = state.pool.begin().await?;
    let order = db::orders::lock_by_id(&mut tx, order_id)
        .await?
        .filter(|o| o.user_id == Some(user_id))
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    if !order.status.is_payable() || order.is_paid() {
        return Err(AppError::invalid_transition(
            order.status.as_db(),
            OrderStatus::Cancelled.as_db(),
        )
        .into());
    }

    let order =
        db::orders::update_status(&mut tx, order_id, OrderStatus::Cancelled, None, now).await?;
    let items = db::orders::items_for_order(&mut tx, order_id).await?;
    tx.commit().await?;

    tracing::info!(order_id = %order_id, user_id = %user_id, "Order cancelled by customer");

    let detail = OrderDetail { order, items };
    state.live_orders.publish_update(detail.clone());
    Ok(detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::{OrderType, PaymentStatus};

    fn order(id: u128, user: Option<Uuid>) -> Order {
        Order {
            id: Uuid::from_u128(id),
            user_id: user,
            order_number: format!("LL{id:06}"),
            customer_name: None,
            customer_email: None,
            customer_phone: None,
            subtotal: Decimal::TEN,
            delivery_fee: Decimal::ZERO,
            total_amount: Decimal::TEN,
            status: OrderStatus::Confirmed,
            payment_status: PaymentStatus::Paid,
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

    fn item(order_id: u128, name: &str) -> OrderItem {
        OrderItem {
            id: Uuid::new_v4(),
            order_id: Uuid::from_u128(order_id),
            menu_item_id: None,
            name: name.into(),
            quantity: 1,
            unit_price: Decimal::ONE,
            total_price: Decimal::ONE,
            customizations: None,
            special_requests: None,
            created_at: 0,
        }
    }

    #[test]
    fn items_are_grouped_by_order() {
        let details = attach_items(
            vec![order(2, None), order(1, None), order(3, None)],
            vec![item(1, "Latte"), item(2, "Scone"), item(1, "Muffin")],
        );
        let names: Vec<Vec<&str>> = details
            .iter()
            .map(|d| d.items.iter().map(|i| i.name.as_str()).collect())
            .collect();
        assert_eq!(names, vec![vec!["Scone"], vec!["Latte", "Muffin"], vec![]]);
        assert_eq!(details[0].order.id, Uuid::from_u128(2));
    }

    #[test]
    fn visibility_is_owner_or_staff() {
        let owner = Uuid::from_u128(9);
        let o = order(1, Some(owner));
        assert!(can_view(&o, owner, false));
        assert!(!can_view(&o, Uuid::from_u128(10), false));
        assert!(can_view(&o, Uuid::from_u128(10), true));
        assert!(!can_view(&order(2, None), owner, false));
    }

    #[test]
    fn illegal_transitions_are_conflicts() {
        assert!(check_transition(OrderStatus::Confirmed, OrderStatus::Preparing).is_ok());

        let err = check_transition(OrderStatus::Ready, OrderStatus::Ready).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
        assert_eq!(err.http_status(), http::StatusCode::CONFLICT);

        let err = check_transition(OrderStatus::Completed, OrderStatus::Cancelled).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
    }

    #[test]
    fn kitchen_cannot_move_drafts_forward() {
        for to in [OrderStatus::Confirmed, OrderStatus::Pending, OrderStatus::Preparing] {
            let err = check_kitchen_transition(OrderStatus::Draft, to).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
            assert_eq!(err.details.unwrap()["from"], "draft");
        }
        assert!(check_kitchen_transition(OrderStatus::Draft, OrderStatus::Cancelled).is_ok());

        assert!(check_kitchen_transition(OrderStatus::Pending, OrderStatus::Confirmed).is_ok());
        assert!(check_kitchen_transition(OrderStatus::Ready, OrderStatus::Completed).is_ok());
        assert!(check_kitchen_transition(OrderStatus::Completed, OrderStatus::Preparing).is_err());
    }

    #[test]
    fn ready_estimate_only_applies_to_ready() {
        let ready = StatusUpdate {
            status: OrderStatus::Ready,
            estimated_ready_minutes: Some(15),
        };
        assert_eq!(estimated_ready_time(&ready, 1_000).unwrap(), Some(901_000));

        let preparing = StatusUpdate {
            status: OrderStatus::Preparing,
            estimated_ready_minutes: Some(15),
        };
        assert_eq!(estimated_ready_time(&preparing, 1_000).unwrap(), None);

        let absurd = StatusUpdate {
            status: OrderStatus::Ready,
            estimated_ready_minutes: Some(600),
        };
        assert_eq!(
            estimated_ready_time(&absurd, 0).unwrap_err().code,
            ErrorCode::ValueOutOfRange
        );
    }
}
