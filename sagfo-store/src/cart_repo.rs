use async_trait::async_trait;
use sagfo_core::repository::RepoResult;
use sagfo_core::CartCache;
use sagfo_order::Cart;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db_error;

/// Carts kept in the database so they survive restarts and follow the user
/// across devices.
pub struct StoreCartCache {
    pool: PgPool,
}

impl StoreCartCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartCache for StoreCartCache {
    async fn load(&self, user_id: Uuid) -> RepoResult<Option<Cart>> {
        let row: Option<Json<Cart>> = sqlx::query_scalar("SELECT cart FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(|c| c.0))
    }

    async fn store(&self, user_id: Uuid, cart: &Cart) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO carts (user_id, cart, updated_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (user_id) DO UPDATE SET cart = EXCLUDED.cart, updated_at = NOW()",
        )
        .bind(user_id)
        .bind(Json(cart))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn clear(&self, user_id: Uuid) -> RepoResult<()> {
        sqlx::query("DELETE FROM carts WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }
}
