use std::path::Path as FsPath;

use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, Query, State},
    Json,
};
use image::ImageFormat;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::{AdminUser, AuthUser};
use crate::errors::AppError;
use crate::models::card::{
    Card, CardPatch, NewCard, DEFAULT_SIGNATURE_COLOR, DEFAULT_SIGNATURE_FONT,
    DEFAULT_SIGNATURE_SIZE, DEFAULT_SIGNATURE_X, DEFAULT_SIGNATURE_Y,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListCardsQuery {
    pub admin: Option<String>,
}

/// GET /api/cards
///
/// Admins, and any caller passing `?admin=true`, also see inactive cards.
pub async fn list_cards(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListCardsQuery>,
) -> Result<Json<Vec<Card>>, AppError> {
    let include_inactive = identity.is_admin || params.admin.as_deref() == Some("true");
    Ok(Json(state.store.list_cards(include_inactive).await?))
}

/// Form fields collected from a card upload.
#[derive(Debug, Default)]
struct UploadForm {
    image: Option<(String, Vec<u8>)>,
    name: Option<String>,
    category: Option<String>,
    signature_x: Option<String>,
    signature_y: Option<String>,
    signature_size: Option<String>,
    signature_color: Option<String>,
    signature_font: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                form.image = Some((file_name, bytes.to_vec()));
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            let slot = match name.as_str() {
                "name" => &mut form.name,
                "category" => &mut form.category,
                "signature_x" => &mut form.signature_x,
                "signature_y" => &mut form.signature_y,
                "signature_size" => &mut form.signature_size,
                "signature_color" => &mut form.signature_color,
                "signature_font" => &mut form.signature_font,
                _ => continue,
            };
            *slot = Some(value).filter(|v| !v.is_empty());
        }

        Ok(form)
    }
}

/// POST /api/cards (multipart)
pub async fn upload_card(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let form = UploadForm::read(multipart).await?;

    let (file, name, category) = match (form.image, form.name, form.category) {
        (Some(file), Some(name), Some(category)) => (file, name, category),
        (file, name, category) => {
            let missing: Vec<&str> = [
                ("image", file.is_none()),
                ("name", name.is_none()),
                ("category", category.is_none()),
            ]
            .into_iter()
            .filter_map(|(field, absent)| absent.then_some(field))
            .collect();
            return Err(AppError::missing_fields(&missing));
        }
    };

    let signature_x = parse_number("signature_x", form.signature_x, DEFAULT_SIGNATURE_X)?;
    let signature_y = parse_number("signature_y", form.signature_y, DEFAULT_SIGNATURE_Y)?;
    let signature_size =
        parse_number("signature_size", form.signature_size, DEFAULT_SIGNATURE_SIZE)?;

    let (original_name, bytes) = file;
    // Only formats the renderer is built to decode.
    match image::guess_format(&bytes) {
        Ok(ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP | ImageFormat::Gif) => {}
        _ => {
            return Err(AppError::Validation(
                "image must be a PNG, JPEG, WebP or GIF file".to_string(),
            ))
        }
    }

    let file_name = format!(
        "{}-{}",
        chrono::Utc::now().timestamp_millis(),
        sanitize_file_name(&original_name)
    );
    let upload_dir = state.config.cards_upload_dir();
    tokio::fs::create_dir_all(&upload_dir).await?;
    let stored_path = upload_dir.join(&file_name);
    tokio::fs::write(&stored_path, &bytes).await?;

    let inserted = state
        .store
        .insert_card(&NewCard {
            name,
            category,
            image_path: format!("uploads/cards/{file_name}"),
            signature_x,
            signature_y,
            signature_size,
            signature_color: form
                .signature_color
                .unwrap_or_else(|| DEFAULT_SIGNATURE_COLOR.to_string()),
            signature_font: form
                .signature_font
                .unwrap_or_else(|| DEFAULT_SIGNATURE_FONT.to_string()),
        })
        .await;

    let id = match inserted {
        Ok(id) => id,
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(&stored_path).await {
                warn!("Failed to remove orphaned upload {file_name}: {cleanup}");
            }
            return Err(e.into());
        }
    };

    info!(
        "{} uploaded card {id} ({} bytes) as {file_name}",
        admin.label(),
        bytes.len()
    );
    Ok(Json(json!({ "id": id, "success": true })))
}

/// PUT /api/cards/:id
pub async fn update_card(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<CardPatch>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(patch) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let touched = state.store.update_card(id, &patch).await?;
    info!("{} updated card {id} ({touched} row(s))", admin.label());
    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/cards/:id
pub async fn delete_card(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let removed = state.store.delete_card(id).await?;
    info!("{} deleted card {id} ({removed} row(s))", admin.label());
    Ok(Json(json!({ "success": true })))
}

/// Parses an optional numeric form field, rounding fractional input.
fn parse_number(field: &str, raw: Option<String>, default: i64) -> Result<i64, AppError> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v.round() as i64)
            .ok_or_else(|| AppError::Validation(format!("{field} must be a number"))),
    }
}

/// Reduces a client-supplied file name to a bare name of safe characters.
fn sanitize_file_name(original: &str) -> String {
    let base = FsPath::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_defaults_and_rounds() {
        assert_eq!(parse_number("signature_x", None, 500).unwrap(), 500);
        assert_eq!(parse_number("signature_x", Some("300".into()), 500).unwrap(), 300);
        assert_eq!(parse_number("signature_x", Some(" 12.6 ".into()), 500).unwrap(), 13);
    }

    #[test]
    fn test_parse_number_rejects_garbage() {
        let err = parse_number("signature_y", Some("abc".into()), 500).unwrap_err();
        assert!(err.to_string().contains("signature_y"));
        assert!(parse_number("signature_y", Some("NaN".into()), 500).is_err());
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("winter card.png"), "winter_card.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("..\\evil.png"), "_evil.png");
        assert_eq!(sanitize_file_name(""), "upload");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
    }
}
