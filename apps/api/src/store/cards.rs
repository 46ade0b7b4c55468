use crate::db::{Store, StoreError, StoreResult};
use crate::models::card::{Card, CardPatch, NewCard};

const CARD_COLUMNS: &str = "id, name, image_path, category, signature_x, signature_y, \
     signature_font, signature_color, signature_size, is_active";

impl Store {
    /// Lists cards by id. Inactive cards are included only when asked for.
    pub async fn list_cards(&self, include_inactive: bool) -> StoreResult<Vec<Card>> {
        let sql = if include_inactive {
            format!("SELECT {CARD_COLUMNS} FROM cards ORDER BY id")
        } else {
            format!("SELECT {CARD_COLUMNS} FROM cards WHERE is_active = 1 ORDER BY id")
        };

        let cards = sqlx::query_as::<_, Card>(&sql)
            .fetch_all(self.pool())
            .await?;
        Ok(cards)
    }

    pub async fn get_card(&self, id: i64) -> StoreResult<Card> {
        sqlx::query_as::<_, Card>(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or(StoreError::NotFound { entity: "Card", id })
    }

    /// Inserts an active card and returns its id.
    pub async fn insert_card(&self, card: &NewCard) -> StoreResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO cards
                (name, image_path, category, signature_x, signature_y,
                 signature_size, signature_color, signature_font, is_active)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)
            "#,
        )
        .bind(&card.name)
        .bind(&card.image_path)
        .bind(&card.category)
        .bind(card.signature_x)
        .bind(card.signature_y)
        .bind(card.signature_size)
        .bind(&card.signature_color)
        .bind(&card.signature_font)
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Applies the present fields of `patch` in a single statement.
    /// Returns the number of rows touched (0 for an unknown id or empty patch).
    pub async fn update_card(&self, id: i64, patch: &CardPatch) -> StoreResult<u64> {
        if patch.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE cards SET
                name            = COALESCE(?, name),
                category        = COALESCE(?, category),
                signature_x     = COALESCE(?, signature_x),
                signature_y     = COALESCE(?, signature_y),
                signature_size  = COALESCE(?, signature_size),
                signature_color = COALESCE(?, signature_color),
                signature_font  = COALESCE(?, signature_font),
                is_active       = COALESCE(?, is_active)
            WHERE id = ?
            "#,
        )
        .bind(patch.name.as_deref())
        .bind(patch.category.as_deref())
        .bind(patch.signature_x)
        .bind(patch.signature_y)
        .bind(patch.signature_size)
        .bind(patch.signature_color.as_deref())
        .bind(patch.signature_font.as_deref())
        .bind(patch.is_active)
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }

    /// Deletes a card. Usage rows for it are kept. Unknown ids are not an error.
    pub async fn delete_card(&self, id: i64) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM cards WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
pub(crate) fn sample_card(name: &str) -> NewCard {
    NewCard {
        name: name.to_string(),
        category: "Holiday".to_string(),
        image_path: format!("uploads/cards/{name}.png"),
        signature_x: 300,
        signature_y: 400,
        signature_size: 40,
        signature_color: "#ff0000".to_string(),
        signature_font: "Arial".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_store;

    #[tokio::test]
    async fn test_insert_and_get_card() {
        let store = test_store().await;
        let id = store.insert_card(&sample_card("winter")).await.unwrap();

        let card = store.get_card(id).await.unwrap();
        assert_eq!(card.name, "winter");
        assert_eq!(card.signature_x, 300);
        assert_eq!(card.signature_color, "#ff0000");
        assert!(card.is_active);
    }

    #[tokio::test]
    async fn test_get_missing_card_is_not_found() {
        let store = test_store().await;
        let result = store.get_card(42).await;
        assert!(matches!(result, Err(StoreError::NotFound { id: 42, .. })));
    }

    #[tokio::test]
    async fn test_list_cards_hides_inactive_unless_requested() {
        let store = test_store().await;
        let active = store.insert_card(&sample_card("active")).await.unwrap();
        let hidden = store.insert_card(&sample_card("hidden")).await.unwrap();
        store
            .update_card(
                hidden,
                &CardPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let visible = store.list_cards(false).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, active);
        assert!(visible.iter().all(|c| c.is_active));

        let all = store.list_cards(true).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_partial_update_leaves_other_fields() {
        let store = test_store().await;
        let id = store.insert_card(&sample_card("original")).await.unwrap();
        let before = store.get_card(id).await.unwrap();

        let touched = store
            .update_card(
                id,
                &CardPatch {
                    name: Some("X".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(touched, 1);

        let after = store.get_card(id).await.unwrap();
        assert_eq!(after.name, "X");
        assert_eq!(
            Card {
                name: before.name.clone(),
                ..after
            },
            before
        );
    }

    #[tokio::test]
    async fn test_update_several_fields() {
        let store = test_store().await;
        let id = store.insert_card(&sample_card("c")).await.unwrap();

        store
            .update_card(
                id,
                &CardPatch {
                    signature_x: Some(0),
                    signature_size: Some(72),
                    signature_color: Some("#00ff00".to_string()),
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let card = store.get_card(id).await.unwrap();
        assert_eq!(card.signature_x, 0);
        assert_eq!(card.signature_y, 400);
        assert_eq!(card.signature_size, 72);
        assert_eq!(card.signature_color, "#00ff00");
        assert!(!card.is_active);
    }

    #[tokio::test]
    async fn test_empty_patch_is_noop() {
        let store = test_store().await;
        let id = store.insert_card(&sample_card("c")).await.unwrap();
        let touched = store.update_card(id, &CardPatch::default()).await.unwrap();
        assert_eq!(touched, 0);
    }

    #[tokio::test]
    async fn test_delete_card_is_idempotent() {
        let store = test_store().await;
        let id = store.insert_card(&sample_card("c")).await.unwrap();

        assert_eq!(store.delete_card(id).await.unwrap(), 1);
        assert_eq!(store.delete_card(id).await.unwrap(), 0);
        assert_eq!(store.delete_card(9999).await.unwrap(), 0);
        assert!(store.list_cards(true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_card_keeps_usage_history() {
        let store = test_store().await;
        let id = store.insert_card(&sample_card("c")).await.unwrap();
        store.record_usage(id, "Alice").await.unwrap();

        store.delete_card(id).await.unwrap();

        let stats = store.usage_stats().await.unwrap();
        assert_eq!(stats.total_generated, 1);
        // The join drops the orphaned card from the popularity ranking.
        assert!(stats.popular_cards.is_empty());
    }
}
