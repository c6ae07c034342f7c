//! Menu endpoints: public browsing + admin maintenance

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    AvailabilityUpdate, MenuItem, MenuItemCreate, MenuItemUpdate, MenuSection, StockUpdate,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::StaffIdentity;
use crate::db;
use crate::error::internal;
use crate::state::AppState;

use super::ApiResult;

const MAX_NAME_LEN: usize = 120;
const MAX_PREPARATION_MINUTES: i32 = 240;

/// GET /api/menu
pub async fn get_menu(State(state): State<AppState>) -> ApiResult<Vec<MenuSection>> {
    let categories = db::menu::list_active_categories(&state.pool)
        .await
        .map_err(internal)?;
    let items = db::menu::list_available_items(&state.pool, None)
        .await
        .map_err(internal)?;

    let mut by_category: HashMap<Uuid, Vec<MenuItem>> = HashMap::new();
    for item in items {
        if let Some(category_id) = item.category_id {
            by_category.entry(category_id).or_default().push(item);
        }
    }

    let sections = categories
        .into_iter()
        .map(|category| MenuSection {
            items: by_category.remove(&category.id).unwrap_or_default(),
            category,
        })
        .collect();
    Ok(Json(sections))
}

/// GET /api/menu/categories/{id}
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<MenuSection> {
    let category = db::menu::find_active_category(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::CategoryNotFound))?;
    let items = db::menu::list_available_items(&state.pool, Some(id))
        .await
        .map_err(internal)?;
    Ok(Json(MenuSection { category, items }))
}

/// GET /api/menu/items/{id}
pub async fn get_item(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<MenuItem> {
    let item = db::menu::find_item(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::MenuItemNotFound))?;
    Ok(Json(item))
}

fn validate_name(name: &str) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation(format!(
            "name must be 1-{MAX_NAME_LEN} characters"
        ))
        .with_detail("field", "name"));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<(), AppError> {
    if price.is_sign_negative() {
        return Err(AppError::new(ErrorCode::MenuItemInvalidPrice).with_detail("field", "price"));
    }
    Ok(())
}

fn validate_preparation_time(minutes: Option<i32>) -> Result<(), AppError> {
    match minutes {
        Some(m) if !(0..=MAX_PREPARATION_MINUTES).contains(&m) => Err(AppError::with_message(
            ErrorCode::ValueOutOfRange,
            format!("preparation_time must be between 0 and {MAX_PREPARATION_MINUTES}"),
        )
        .with_detail("field", "preparation_time")),
        _ => Ok(()),
    }
}

fn validate_stock(stock: Option<i32>) -> Result<(), AppError> {
    match stock {
        Some(s) if s < 0 => Err(AppError::with_message(
            ErrorCode::ValueOutOfRange,
            "stock must not be negative",
        )
        .with_detail("field", "stock")),
        _ => Ok(()),
    }
}

fn validate_create(data: &MenuItemCreate) -> Result<(), AppError> {
    validate_name(&data.name)?;
    validate_price(data.price)?;
    validate_preparation_time(data.preparation_time)?;
    validate_stock(data.stock)
}

fn validate_update(data: &MenuItemUpdate) -> Result<(), AppError> {
    if let Some(name) = &data.name {
        validate_name(name)?;
    }
    if let Some(price) = data.price {
        validate_price(price)?;
    }
    validate_preparation_time(data.preparation_time)
}

async fn ensure_category(state: &AppState, category_id: Option<Uuid>) -> Result<(), AppError> {
    let Some(id) = category_id else {
        return Ok(());
    };
    if db::menu::category_exists(&state.pool, id)
        .await
        .map_err(internal)?
    {
        Ok(())
    } else {
        Err(AppError::new(ErrorCode::CategoryNotFound).with_detail("category_id", id.to_string()))
    }
}

/// POST /api/admin/menu/items
pub async fn create_item(
    State(state): State<AppState>,
    Extension(admin): Extension<StaffIdentity>,
    Json(data): Json<MenuItemCreate>,
) -> ApiResult<MenuItem> {
    validate_create(&data)?;
    ensure_category(&state, data.category_id).await?;

    let item = db::menu::create_item(&state.pool, &data, shared::util::now_millis())
        .await
        .map_err(internal)?;
    tracing::info!(item_id = %item.id, name = %item.name, admin_id = %admin.user_id, "Menu item created");
    Ok(Json(item))
}

/// PUT /api/admin/menu/items/{id}
pub async fn update_item(
    State(state): State<AppState>,
    Extension(admin): Extension<StaffIdentity>,
    Path(id): Path<Uuid>,
    Json(data): Json<MenuItemUpdate>,
) -> ApiResult<MenuItem> {
    validate_update(&data)?;
    ensure_category(&state, data.category_id).await?;

    let item = db::menu::update_item(&state.pool, id, &data, shared::util::now_millis())
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::MenuItemNotFound))?;
    tracing::info!(item_id = %id, admin_id = %admin.user_id, "Menu item updated");
    Ok(Json(item))
}

/// PATCH /api/admin/menu/items/{id}/availability
pub async fn set_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<AvailabilityUpdate>,
) -> ApiResult<MenuItem> {
    let item =
        db::menu::set_availability(&state.pool, id, data.is_available, shared::util::now_millis())
            .await
            .map_err(internal)?
            .ok_or_else(|| AppError::new(ErrorCode::MenuItemNotFound))?;
    Ok(Json(item))
}

/// PUT /api/admin/menu/items/{id}/stock
pub async fn set_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<StockUpdate>,
) -> ApiResult<MenuItem> {
    validate_stock(data.stock)?;
    let item = db::menu::set_stock(&state.pool, id, data.stock, shared::util::now_millis())
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::MenuItemNotFound))?;
    Ok(Json(item))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(name: &str, price: Decimal) -> MenuItemCreate {
        MenuItemCreate {
            category_id: None,
            name: name.into(),
            description: None,
            price,
            image_url: None,
            is_available: None,
            is_featured: None,
            allergens: None,
            preparation_time: Some(10),
            display_order: None,
            stock: None,
        }
    }

    #[test]
    fn create_validation() {
        assert!(validate_create(&create("Rooibos latte", Decimal::new(3800, 2))).is_ok());
        assert!(validate_create(&create("Free water", Decimal::ZERO)).is_ok());
        assert!(validate_create(&create("   ", Decimal::ONE)).is_err());
        assert!(validate_create(&create(&"x".repeat(121), Decimal::ONE)).is_err());

        let err = validate_create(&create("Refund", Decimal::new(-1, 0))).unwrap_err();
        assert_eq!(err.code, ErrorCode::MenuItemInvalidPrice);

        let mut slow = create("Slow roast", Decimal::ONE);
        slow.preparation_time = Some(241);
        assert_eq!(validate_create(&slow).unwrap_err().code, ErrorCode::ValueOutOfRange);

        let mut negative_stock = create("Muffin", Decimal::ONE);
        negative_stock.stock = Some(-1);
        assert!(validate_create(&negative_stock).is_err());
    }

    #[test]
    fn update_validation_only_checks_present_fields() {
        assert!(validate_update(&MenuItemUpdate::default()).is_ok());
        let bad = MenuItemUpdate {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(validate_update(&bad).is_err());
    }
}
