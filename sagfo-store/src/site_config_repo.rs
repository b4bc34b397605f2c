use async_trait::async_trait;
use sagfo_core::repository::{RepoResult, SiteConfigRepository};
use sagfo_core::site::SiteConfig;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::db_error;

pub struct StoreSiteConfigRepository {
    pool: PgPool,
}

impl StoreSiteConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SiteConfigRepository for StoreSiteConfigRepository {
    async fn get_site_config(&self) -> RepoResult<SiteConfig> {
        let row: Option<Json<SiteConfig>> = sqlx::query_scalar("SELECT config FROM site_config WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(|c| c.0).unwrap_or_default())
    }

    async fn upsert_site_config(&self, config: &SiteConfig) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO site_config (id, config) VALUES (1, $1) \
             ON CONFLICT (id) DO UPDATE SET config = EXCLUDED.config",
        )
        .bind(Json(config))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }
}
