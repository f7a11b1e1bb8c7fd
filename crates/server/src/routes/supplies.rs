use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::{
        models::{SupplyOrder, SupplyStatus},
        rows::{map_rows, SupplyOrderRow},
    },
    error::{AppError, Result},
    middleware::auth::AuthUser,
    services::access,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/supply-orders", get(list_orders).post(create_order))
        .route("/:id/supply-orders/import", post(import_orders))
        .route(
            "/:id/supply-orders/:order_id",
            put(update_order).delete(delete_order),
        )
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub item: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    pub item: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportOrdersRequest {
    pub csv: String,
}

fn validate_order(item: &str, quantity: f64) -> Result<()> {
    if item.trim().is_empty() {
        return Err(AppError::Validation("Item name is required".to_string()));
    }
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(AppError::Validation(
            "Quantity must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

async fn insert_order(state: &AppState, order: &SupplyOrder) -> Result<()> {
    let row = SupplyOrderRow::from(order);
    sqlx::query(
        r#"
        INSERT INTO supply_orders (id, project_id, item, quantity, unit, status, notes, requested_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&row.id)
    .bind(&row.project_id)
    .bind(&row.item)
    .bind(row.quantity)
    .bind(&row.unit)
    .bind(&row.status)
    .bind(&row.notes)
    .bind(&row.requested_by)
    .bind(&row.created_at)
    .bind(&row.updated_at)
    .execute(&state.db.pool)
    .await?;
    Ok(())
}

fn new_order(project_id: &str, requested_by: &str, item: String, quantity: f64, unit: String, notes: String) -> SupplyOrder {
    let now = Utc::now();
    SupplyOrder {
        id: Uuid::new_v4().to_string(),
        project_id: project_id.to_string(),
        item: item.trim().to_string(),
        quantity,
        unit,
        status: SupplyStatus::Requested,
        notes,
        requested_by: requested_by.to_string(),
        created_at: now,
        updated_at: now,
    }
}

async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<SupplyOrder>>> {
    access::require_staff(&state.db.pool, &id, &user).await?;

    let rows = sqlx::query_as::<_, SupplyOrderRow>(
        "SELECT * FROM supply_orders WHERE project_id = ? ORDER BY created_at DESC",
    )
    .bind(&id)
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(map_rows(rows)?))
}

async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<Json<SupplyOrder>> {
    access::require_staff(&state.db.pool, &id, &user).await?;
    validate_order(&body.item, body.quantity)?;

    let order = new_order(&id, &user.id, body.item, body.quantity, body.unit, body.notes);
    insert_order(&state, &order).await?;

    Ok(Json(order))
}

/// Extracts a material list from a CSV dump and files each entry as a request.
async fn import_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<ImportOrdersRequest>,
) -> Result<Json<Vec<SupplyOrder>>> {
    access::require_staff(&state.db.pool, &id, &user).await?;

    if body.csv.trim().is_empty() {
        return Err(AppError::Validation("CSV content is required".to_string()));
    }

    let materials = state.ai.extract_materials(&body.csv).await?;

    let mut orders = Vec::with_capacity(materials.len());
    for material in materials {
        if validate_order(&material.name, material.quantity).is_err() {
            tracing::debug!(item = %material.name, "skipping unusable extracted material");
            continue;
        }
        let order = new_order(
            &id,
            &user.id,
            material.name,
            material.quantity,
            material.unit,
            String::new(),
        );
        insert_order(&state, &order).await?;
        orders.push(order);
    }

    tracing::info!(project_id = %id, count = orders.len(), "imported supply orders");
    Ok(Json(orders))
}

async fn fetch_order(state: &AppState, project_id: &str, order_id: &str) -> Result<SupplyOrder> {
    let row = sqlx::query_as::<_, SupplyOrderRow>(
        "SELECT * FROM supply_orders WHERE id = ? AND project_id = ?",
    )
    .bind(order_id)
    .bind(project_id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Supply order not found".to_string()))?;

    SupplyOrder::try_from(row)
}

async fn update_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, order_id)): Path<(String, String)>,
    Json(body): Json<UpdateOrderRequest>,
) -> Result<Json<SupplyOrder>> {
    access::require_staff(&state.db.pool, &id, &user).await?;
    let mut order = fetch_order(&state, &id, &order_id).await?;

    if let Some(item) = body.item {
        order.item = item.trim().to_string();
    }
    if let Some(quantity) = body.quantity {
        order.quantity = quantity;
    }
    if let Some(unit) = body.unit {
        order.unit = unit;
    }
    if let Some(status) = body.status {
        order.status = status.parse().map_err(AppError::Validation)?;
    }
    if let Some(notes) = body.notes {
        order.notes = notes;
    }
    validate_order(&order.item, order.quantity)?;
    order.updated_at = Utc::now();

    let row = SupplyOrderRow::from(&order);
    sqlx::query(
        "UPDATE supply_orders SET item = ?, quantity = ?, unit = ?, status = ?, notes = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&row.item)
    .bind(row.quantity)
    .bind(&row.unit)
    .bind(&row.status)
    .bind(&row.notes)
    .bind(&row.updated_at)
    .bind(&row.id)
    .execute(&state.db.pool)
    .await?;

    Ok(Json(order))
}

async fn delete_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, order_id)): Path<(String, String)>,
) -> Result<Json<()>> {
    access::require_staff(&state.db.pool, &id, &user).await?;

    let result = sqlx::query("DELETE FROM supply_orders WHERE id = ? AND project_id = ?")
        .bind(&order_id)
        .bind(&id)
        .execute(&state.db.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Supply order not found".to_string()));
    }

    Ok(Json(()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_need_an_item_and_positive_quantity() {
        assert!(validate_order("Cimento CP-II", 50.0).is_ok());
        assert!(validate_order("  ", 10.0).is_err());
        assert!(validate_order("Areia", 0.0).is_err());
        assert!(validate_order("Areia", f64::NAN).is_err());
    }
}
