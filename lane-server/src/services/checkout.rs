//! Checkout: validate the cart, price it from the menu and persist a draft order

use rust_decimal::Decimal;
use serde_json::json;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    CheckoutItem, CheckoutRequest, DeliveryZone, MenuItem, OrderDetail, OrderType,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::UserIdentity;
use crate::db;
use crate::db::orders::{NewOrder, NewOrderItem};
use crate::delivery;
use crate::error::ServiceResult;
use crate::services::closure;
use crate::state::AppState;

pub const MAX_LINES: usize = 50;
pub const MAX_QUANTITY: i32 = 20;
/// Largest amount a `NUMERIC(10,2)` money column holds
pub const MAX_MONEY: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Cart after validation and pricing, ready to insert
#[derive(Debug)]
pub struct PricedCart {
    pub items: Vec<NewOrderItem>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub delivery_zone: Option<DeliveryZone>,
}

/// Line count, quantities and contact details
pub fn validate_request(req: &CheckoutRequest) -> Result<(), AppError> {
    if req.items.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty));
    }
    if req.items.len() > MAX_LINES {
        return Err(AppError::with_message(
            ErrorCode::OrderTooLarge,
            format!("An order may contain at most {MAX_LINES} lines"),
        ));
    }
    for (index, item) in req.items.iter().enumerate() {
        if !(1..=MAX_QUANTITY).contains(&item.quantity) {
            return Err(AppError::with_message(
                ErrorCode::ValueOutOfRange,
                format!("Quantity must be between 1 and {MAX_QUANTITY}"),
            )
            .with_detail("line", index)
            .with_detail("quantity", item.quantity));
        }
    }
    let has_phone = req
        .customer
        .phone
        .as_deref()
        .is_some_and(|p| !p.trim().is_empty());
    if !has_phone {
        return Err(
            AppError::with_message(ErrorCode::RequiredField, "A contact phone number is required")
                .with_detail("field", "customer.phone"),
        );
    }
    Ok(())
}

/// Price every line from `menu` and add the delivery fee.
///
/// `menu` holds the rows of every referenced menu item; client prices for
/// regular lines are ignored.
pub fn price_cart(
    req: &CheckoutRequest,
    menu: &HashMap<Uuid, MenuItem>,
) -> Result<PricedCart, AppError> {
    let mut requested: HashMap<Uuid, i32> = HashMap::new();
    let mut items = Vec::with_capacity(req.items.len());

    for line in &req.items {
        let item = match line.menu_item_id {
            Some(id) => {
                let menu_item = menu.get(&id).ok_or_else(|| {
                    AppError::new(ErrorCode::MenuItemNotFound).with_detail("menu_item_id", id.to_string())
                })?;
                *requested.entry(id).or_default() += line.quantity;
                regular_line(line, menu_item)?
            }
            None => custom_line(line)?,
        };
        items.push(item);
    }

    for (id, quantity) in &requested {
        let Some(menu_item) = menu.get(id) else {
            continue;
        };
        if !menu_item.can_fulfil(*quantity) {
            return Err(AppError::with_message(
                ErrorCode::InsufficientStock,
                format!("Only {} of {} left", menu_item.stock.unwrap_or(0), menu_item.name),
            )
            .with_detail("menu_item_id", id.to_string())
            .with_detail("available", menu_item.stock.unwrap_or(0))
            .with_detail("requested", *quantity));
        }
    }

    let (delivery_fee, delivery_zone) = delivery_charge(req)?;
    let subtotal = items
        .iter()
        .try_fold(Decimal::ZERO, |acc, i| acc.checked_add(i.total_price));
    let subtotal = bounded_money(subtotal, "subtotal")?;
    let total = bounded_money(subtotal.checked_add(delivery_fee), "total")?;

    Ok(PricedCart {
        items,
        subtotal,
        delivery_fee,
        total,
        delivery_zone,
    })
}

fn regular_line(line: &CheckoutItem, menu_item: &MenuItem) -> Result<NewOrderItem, AppError> {
    if !menu_item.is_available {
        return Err(AppError::with_message(
            ErrorCode::MenuItemUnavailable,
            format!("{} is currently unavailable", menu_item.name),
        )
        .with_detail("menu_item_id", menu_item.id.to_string()));
    }
    let unit_price = menu_item.price;
    Ok(NewOrderItem {
        menu_item_id: Some(menu_item.id),
        name: menu_item.name.clone(),
        quantity: line.quantity,
        unit_price,
        total_price: line_total(unit_price, line.quantity)?,
        customizations: line.customization.clone(),
        special_requests: trimmed(line.special_requests.as_deref()),
    })
}

fn custom_line(line: &CheckoutItem) -> Result<NewOrderItem, AppError> {
    let name = trimmed(line.name.as_deref()).ok_or_else(|| {
        AppError::with_message(ErrorCode::RequiredField, "Custom items need a name")
            .with_detail("field", "name")
    })?;
    let unit_price = line.unit_price.ok_or_else(|| {
        AppError::with_message(ErrorCode::RequiredField, "Custom items need a unit price")
            .with_detail("field", "unit_price")
    })?;
    if unit_price.is_sign_negative() || unit_price > MAX_MONEY {
        return Err(AppError::new(ErrorCode::MenuItemInvalidPrice).with_detail("name", name));
    }
    let unit_price = shared::util::round_money(unit_price);
    let total_price = line_total(unit_price, line.quantity)?;

    Ok(NewOrderItem {
        menu_item_id: None,
        customizations: Some(json!({
            "type": "custom",
            "name": name,
            "details": line.customization.clone(),
        })),
        name,
        quantity: line.quantity,
        unit_price,
        total_price,
        special_requests: trimmed(line.special_requests.as_deref()),
    })
}

fn line_total(unit_price: Decimal, quantity: i32) -> Result<Decimal, AppError> {
    bounded_money(unit_price.checked_mul(Decimal::from(quantity)), "total_price")
}

/// Rounded amount, or `ValueOutOfRange` when it overflowed or will not fit the column
fn bounded_money(value: Option<Decimal>, field: &str) -> Result<Decimal, AppError> {
    match value.map(shared::util::round_money) {
        Some(amount) if amount <= MAX_MONEY => Ok(amount),
        _ => Err(AppError::with_message(
            ErrorCode::ValueOutOfRange,
            format!("{field} exceeds the largest accepted amount"),
        )
        .with_detail("field", field)),
    }
}

fn delivery_charge(req: &CheckoutRequest) -> Result<(Decimal, Option<DeliveryZone>), AppError> {
    if req.order_type != OrderType::Delivery {
        return Ok((Decimal::ZERO, None));
    }
    if trimmed(req.delivery_address.as_deref()).is_none() {
        return Err(AppError::with_message(
            ErrorCode::DeliveryUnavailable,
            "A delivery address is required",
        )
        .with_detail("field", "delivery_address"));
    }
    let point = req.delivery_location.ok_or_else(|| {
        AppError::with_message(ErrorCode::DeliveryUnavailable, "A delivery location is required")
            .with_detail("field", "delivery_location")
    })?;
    let quote = delivery::quote(point)?;
    if !quote.available {
        return Err(AppError::new(ErrorCode::DeliveryUnavailable)
            .with_detail("distance_km", quote.distance_km));
    }
    Ok((quote.fee, Some(quote.zone)))
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Create a draft order for `user` and publish it
pub async fn create_order(
    state: &AppState,
    user: &UserIdentity,
    req: CheckoutRequest,
) -> ServiceResult<OrderDetail> {
    closure::ensure_open(&state.pool).await?;
    validate_request(&req)?;

    let ids: Vec<Uuid> = req.items.iter().filter_map(|i| i.menu_item_id).collect();
    let menu: HashMap<Uuid, MenuItem> = db::menu::find_items(&state.pool, &ids)
        .await?
        .into_iter()
        .map(|item| (item.id, item))
        .collect();
    let cart = price_cart(&req, &menu)?;

    let customer_email = trimmed(req.customer.email.as_deref()).or_else(|| user.email.clone());
    let customer_name = trimmed(req.customer.name.as_deref());
    let customer_phone = trimmed(req.customer.phone.as_deref()).unwrap_or_default();
    let delivery_address = trimmed(req.delivery_address.as_deref())
        .filter(|_| req.order_type == OrderType::Delivery);
    let special_instructions = trimmed(req.special_instructions.as_deref());

    let new_order = NewOrder {
        user_id: user.user_id,
        customer_name: customer_name.as_deref(),
        customer_email: customer_email.as_deref(),
        customer_phone: &customer_phone,
        subtotal: cart.subtotal,
        delivery_fee: cart.delivery_fee,
        total_amount: cart.total,
        order_type: req.order_type,
        delivery_address: delivery_address.as_deref(),
        delivery_zone: cart.delivery_zone.as_ref().map(DeliveryZone::as_db),
        special_instructions: special_instructions.as_deref(),
    };

    let now = shared::util::now_millis();
    let mut tx = state.pool.begin().await?;
    let order_number = db::orders::next_order_number(&mut tx).await?;
    let order = db::orders::insert_order(&mut tx, &order_number, &new_order, now).await?;
    let mut items = Vec::with_capacity(cart.items.len());
    for item in &cart.items {
        items.push(db::orders::insert_item(&mut tx, order.id, item, now).await?);
    }
    tx.commit().await?;

    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        user_id = %user.user_id,
        total = %order.total_amount,
        lines = items.len(),
        "Draft order created"
    );

    let detail = OrderDetail { order, items };
    state.live_orders.publish_update(detail.clone());
    Ok(detail)
}
