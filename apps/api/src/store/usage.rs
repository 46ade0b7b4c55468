use crate::db::{Store, StoreResult};
use crate::models::usage::{PopularCard, UsageEntry, UsageStats};

const POPULAR_CARD_LIMIT: i64 = 5;
const RECENT_USAGE_LIMIT: i64 = 10;

impl Store {
    /// Appends a usage row for a successful personalization.
    pub async fn record_usage(&self, card_id: i64, user_name: &str) -> StoreResult<i64> {
        let result = sqlx::query("INSERT INTO usage_log (card_id, user_name) VALUES (?, ?)")
            .bind(card_id)
            .bind(user_name)
            .execute(self.pool())
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn usage_stats(&self) -> StoreResult<UsageStats> {
        let total_generated: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM usage_log")
            .fetch_one(self.pool())
            .await?;

        // Tie order among equal counts is left to SQLite.
        let popular_cards = sqlx::query_as::<_, PopularCard>(
            r#"
            SELECT l.card_id AS card_id, c.name AS name, COUNT(l.id) AS use_count
            FROM usage_log l
            JOIN cards c ON l.card_id = c.id
            GROUP BY l.card_id
            ORDER BY use_count DESC
            LIMIT ?
            "#,
        )
        .bind(POPULAR_CARD_LIMIT)
        .fetch_all(self.pool())
        .await?;

        let recent_usage = sqlx::query_as::<_, UsageEntry>(
            r#"
            SELECT id, card_id, user_name, created_at
            FROM usage_log
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(RECENT_USAGE_LIMIT)
        .fetch_all(self.pool())
        .await?;

        Ok(UsageStats {
            total_generated,
            popular_cards,
            recent_usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_store;
    use crate::store::cards::sample_card;

    #[tokio::test]
    async fn test_usage_stats_counts_and_ranks() {
        let store = test_store().await;
        let a = store.insert_card(&sample_card("a")).await.unwrap();
        let b = store.insert_card(&sample_card("b")).await.unwrap();

        store.record_usage(a, "Alice").await.unwrap();
        store.record_usage(b, "Bob").await.unwrap();
        store.record_usage(b, "Carol").await.unwrap();

        let stats = store.usage_stats().await.unwrap();
        assert_eq!(stats.total_generated, 3);
        assert_eq!(stats.popular_cards.len(), 2);
        assert_eq!(stats.popular_cards[0].card_id, b);
        assert_eq!(stats.popular_cards[0].name, "b");
        assert_eq!(stats.popular_cards[0].use_count, 2);
        assert_eq!(stats.recent_usage.len(), 3);
        assert_eq!(stats.recent_usage[0].user_name, "Carol");
    }

    #[tokio::test]
    async fn test_popular_cards_limited_to_five() {
        let store = test_store().await;
        for i in 0..7 {
            let id = store.insert_card(&sample_card(&format!("card{i}"))).await.unwrap();
            store.record_usage(id, "Alice").await.unwrap();
        }

        let stats = store.usage_stats().await.unwrap();
        assert_eq!(stats.total_generated, 7);
        assert_eq!(stats.popular_cards.len(), 5);
    }

    #[tokio::test]
    async fn test_empty_usage_stats() {
        let store = test_store().await;
        let stats = store.usage_stats().await.unwrap();
        assert_eq!(stats.total_generated, 0);
        assert!(stats.popular_cards.is_empty());
        assert!(stats.recent_usage.is_empty());
    }
}
