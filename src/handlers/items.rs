use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::{
    error::{AppError, AppResult},
    models::{ItemFields, ItemId, ItemInput},
    AppState,
};

type Envelope = (StatusCode, Json<serde_json::Value>);

fn success(data: impl Serialize) -> Envelope {
    (
        StatusCode::OK,
        Json(json!({ "message": "success", "data": data })),
    )
}

/// Path ids must be non-negative and fit the store's BIGINT key.
fn item_id(path: Result<Path<u64>, PathRejection>) -> AppResult<ItemId> {
    let Path(raw) = path.map_err(|e| AppError::BadIdentifier(e.body_text()))?;
    ItemId::try_from(raw)
        .map_err(|_| AppError::BadIdentifier(format!("id {raw} is out of range")))
}

fn item_fields(body: Result<Json<ItemInput>, JsonRejection>) -> AppResult<ItemFields> {
    let Json(input) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    input.validate()
}

// ── List ──────────────────────────────────────────────────────────────────────

pub async fn list_items(State(state): State<AppState>) -> AppResult<Envelope> {
    let items = state.store.list().await?;
    info!(count = items.len(), "Listed items");
    Ok(success(items))
}

// ── Create ────────────────────────────────────────────────────────────────────

pub async fn create_item(
    State(state): State<AppState>,
    body: Result<Json<ItemInput>, JsonRejection>,
) -> AppResult<Envelope> {
    let fields = item_fields(body)?;
    let id = state.store.create(&fields).await?;
    info!(id, name = %fields.name, "Created item");
    Ok(success(id))
}

// ── Get by ID ─────────────────────────────────────────────────────────────────

pub async fn get_item(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> AppResult<Envelope> {
    let id = item_id(path)?;
    let item = state.store.get(id).await?;
    Ok(success(item))
}

// ── Update ────────────────────────────────────────────────────────────────────

pub async fn update_item(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
    body: Result<Json<ItemInput>, JsonRejection>,
) -> AppResult<Envelope> {
    let id = item_id(path)?;
    let fields = item_fields(body)?;
    state.store.update(id, &fields).await?;
    info!(id, "Updated item");
    Ok(success(id))
}

// ── Delete ────────────────────────────────────────────────────────────────────

pub async fn delete_item(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> AppResult<Envelope> {
    let id = item_id(path)?;
    state.store.delete(id).await?;
    info!(id, "Deleted item");
    Ok(success(id))
}
