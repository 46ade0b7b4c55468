use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of the append-only usage log.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UsageEntry {
    pub id: i64,
    pub card_id: i64,
    pub user_name: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PopularCard {
    pub card_id: i64,
    pub name: String,
    pub use_count: i64,
}

/// Aggregate usage figures for the admin dashboard.
///
/// `popular_cards` is ordered by `use_count` descending; cards with equal
/// counts come back in whatever order SQLite's aggregate yields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub total_generated: i64,
    pub popular_cards: Vec<PopularCard>,
    pub recent_usage: Vec<UsageEntry>,
}
