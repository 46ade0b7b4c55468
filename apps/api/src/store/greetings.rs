use crate::db::{Store, StoreResult};
use crate::models::greeting::Greeting;

impl Store {
    /// All greetings, alphabetical by text.
    pub async fn list_greetings(&self) -> StoreResult<Vec<Greeting>> {
        let greetings =
            sqlx::query_as::<_, Greeting>("SELECT id, text FROM greetings ORDER BY text ASC")
                .fetch_all(self.pool())
                .await?;
        Ok(greetings)
    }

    /// Inserts a greeting and returns its id. Duplicate text violates the
    /// unique constraint and is returned as an error.
    pub async fn insert_greeting(&self, text: &str) -> StoreResult<i64> {
        let result = sqlx::query("INSERT INTO greetings (text) VALUES (?)")
            .bind(text)
            .execute(self.pool())
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn delete_greeting(&self, id: i64) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM greetings WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
