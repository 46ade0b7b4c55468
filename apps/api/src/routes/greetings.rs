use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::auth::{AdminUser, AuthUser};
use crate::errors::AppError;
use crate::models::greeting::Greeting;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateGreetingRequest {
    pub text: Option<String>,
}

/// GET /api/greetings
pub async fn list_greetings(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Greeting>>, AppError> {
    Ok(Json(state.store.list_greetings().await?))
}

/// POST /api/greetings
pub async fn create_greeting(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    payload: Result<Json<CreateGreetingRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let text = req
        .text
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::missing_fields(&["text"]))?;

    let id = state.store.insert_greeting(&text).await?;
    info!("{} added greeting {id}: {text}", admin.label());

    Ok(Json(json!({ "id": id, "text": text, "success": true })))
}

/// DELETE /api/greetings/:id
pub async fn delete_greeting(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let removed = state.store.delete_greeting(id).await?;
    info!("{} deleted greeting {id} ({removed} row(s))", admin.label());
    Ok(Json(json!({ "success": true })))
}
