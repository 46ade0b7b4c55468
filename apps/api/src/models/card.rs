use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

pub const DEFAULT_SIGNATURE_X: i64 = 500;
pub const DEFAULT_SIGNATURE_Y: i64 = 500;
pub const DEFAULT_SIGNATURE_SIZE: i64 = 50;
pub const DEFAULT_SIGNATURE_COLOR: &str = "#000000";
pub const DEFAULT_SIGNATURE_FONT: &str = "Arial";

/// A template image plus the placement and style of its signature overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Card {
    pub id: i64,
    pub name: String,
    pub image_path: String,
    pub category: String,
    pub signature_x: i64,
    pub signature_y: i64,
    pub signature_font: String,
    pub signature_color: String,
    pub signature_size: i64,
    pub is_active: bool,
}

/// Fields for a freshly uploaded card. New cards are always active.
#[derive(Debug, Clone)]
pub struct NewCard {
    pub name: String,
    pub category: String,
    pub image_path: String,
    pub signature_x: i64,
    pub signature_y: i64,
    pub signature_size: i64,
    pub signature_color: String,
    pub signature_font: String,
}

/// Partial update for a card. `None` leaves the column untouched.
///
/// Empty strings for the text fields are treated as absent, the signature
/// numbers accept JSON numbers or numeric strings (fractions round), and
/// `is_active` accepts either a JSON boolean or `0`/`1`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CardPatch {
    #[serde(default, deserialize_with = "non_empty_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "flexible_number")]
    pub signature_x: Option<i64>,
    #[serde(default, deserialize_with = "flexible_number")]
    pub signature_y: Option<i64>,
    #[serde(default, deserialize_with = "flexible_number")]
    pub signature_size: Option<i64>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub signature_color: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub signature_font: Option<String>,
    #[serde(default, deserialize_with = "flexible_flag")]
    pub is_active: Option<bool>,
}

impl CardPatch {
    pub fn is_empty(&self) -> bool {
        *self == CardPatch::default()
    }
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Int(i64),
}

fn flexible_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<FlagRepr>::deserialize(deserializer)?.map(|repr| match repr {
        FlagRepr::Bool(b) => b,
        FlagRepr::Int(i) => i != 0,
    }))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberRepr {
    Int(i64),
    Float(f64),
    Text(String),
}

fn flexible_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(repr) = Option::<NumberRepr>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let value = match repr {
        NumberRepr::Int(i) => return Ok(Some(i)),
        NumberRepr::Float(f) => f,
        NumberRepr::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<f64>()
                .map_err(|_| serde::de::Error::custom(format!("{text:?} is not a number")))?
        }
    };
    if !value.is_finite() {
        return Err(serde::de::Error::custom("number must be finite"));
    }
    Ok(Some(value.round() as i64))
}
