use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::state::AppState;

/// `cardId` arrives as either a JSON number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CardIdInput {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub card_id: Option<CardIdInput>,
    pub user_name: Option<String>,
    pub greeting: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub url: String,
}

/// POST /api/generate
pub async fn generate_card(
    _user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    let card_id = match req.card_id {
        Some(CardIdInput::Number(id)) if id != 0 => Some(id),
        Some(CardIdInput::Text(raw)) if !raw.trim().is_empty() => Some(
            raw.trim()
                .parse::<i64>()
                .map_err(|_| AppError::Validation("cardId must be a number".to_string()))?,
        ),
        _ => None,
    };
    let user_name = req.user_name.filter(|n| !n.is_empty());

    let (card_id, user_name) = match (card_id, user_name) {
        (Some(id), Some(name)) => (id, name),
        (id, name) => {
            let mut missing = Vec::new();
            if id.is_none() {
                missing.push("cardId");
            }
            if name.is_none() {
                missing.push("userName");
            }
            return Err(AppError::missing_fields(&missing));
        }
    };

    let file_name = state
        .renderer
        .generate(&state.store, card_id, &user_name, req.greeting.as_deref())
        .await?;

    Ok(Json(GenerateResponse {
        url: format!("/generated/{file_name}"),
    }))
}
