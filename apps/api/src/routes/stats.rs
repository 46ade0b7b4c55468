use axum::{extract::State, Json};

use crate::auth::AdminUser;
use crate::errors::AppError;
use crate::models::usage::UsageStats;
use crate::state::AppState;

/// GET /api/stats
pub async fn get_stats(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<UsageStats>, AppError> {
    Ok(Json(state.store.usage_stats().await?))
}
