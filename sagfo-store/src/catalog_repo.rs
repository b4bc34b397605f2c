use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sagfo_catalog::Equipment;
use sagfo_core::repository::{EquipmentRepository, RepoResult};
use sagfo_core::RepositoryError;
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::{corrupt, db_error};

pub struct StoreEquipmentRepository {
    pool: PgPool,
}

impl StoreEquipmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct EquipmentRow {
    id: Uuid,
    name: String,
    description: String,
    category: String,
    muscle_group: Option<String>,
    availability_status: String,
    price: i64,
    is_promotion: bool,
    promotional_price: Option<i64>,
    image_urls: Json<Vec<String>>,
    features: Json<Vec<String>>,
    specifications: Json<BTreeMap<String, String>>,
    available_colors: Json<Vec<String>>,
    available_weights: Json<Vec<String>>,
    is_deleted: bool,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

impl TryFrom<EquipmentRow> for Equipment {
    type Error = RepositoryError;

    fn try_from(row: EquipmentRow) -> Result<Self, Self::Error> {
        Ok(Equipment {
            id: row.id,
            name: row.name,
            description: row.description,
            category: row.category.parse().map_err(|e| corrupt("equipment", e))?,
            muscle_group: row
                .muscle_group
                .map(|g| g.parse())
                .transpose()
                .map_err(|e| corrupt("equipment", e))?,
            availability_status: row
                .availability_status
                .parse()
                .map_err(|e| corrupt("equipment", e))?,
            price: row.price,
            is_promotion: row.is_promotion,
            promotional_price: row.promotional_price,
            image_urls: row.image_urls.0,
            features: row.features.0,
            specifications: row.specifications.0,
            available_colors: row.available_colors.0,
            available_weights: row.available_weights.0,
            is_deleted: row.is_deleted,
        })
    }
}

const SELECT_EQUIPMENT: &str = r#"
    SELECT id, name, description, category, muscle_group, availability_status, price,
           is_promotion, promotional_price, image_urls, features, specifications,
           available_colors, available_weights, is_deleted, created_at
    FROM equipment
"#;

#[async_trait]
impl EquipmentRepository for StoreEquipmentRepository {
    async fn list_equipment(&self, include_deleted: bool) -> RepoResult<Vec<Equipment>> {
        let sql = format!("{SELECT_EQUIPMENT} WHERE ($1 OR NOT is_deleted) ORDER BY name, id");
        let rows = sqlx::query_as::<_, EquipmentRow>(&sql)
            .bind(include_deleted)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.into_iter().map(Equipment::try_from).collect()
    }

    async fn get_equipment(&self, id: Uuid) -> RepoResult<Option<Equipment>> {
        let sql = format!("{SELECT_EQUIPMENT} WHERE id = $1");
        let row = sqlx::query_as::<_, EquipmentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(Equipment::try_from).transpose()
    }

    async fn save_equipment_batch(&self, items: &[Equipment]) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO equipment (id, name, description, category, muscle_group, availability_status,
                                       price, is_promotion, promotional_price, image_urls, features,
                                       specifications, available_colors, available_weights, is_deleted)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name,
                    description = EXCLUDED.description,
                    category = EXCLUDED.category,
                    muscle_group = EXCLUDED.muscle_group,
                    availability_status = EXCLUDED.availability_status,
                    price = EXCLUDED.price,
                    is_promotion = EXCLUDED.is_promotion,
                    promotional_price = EXCLUDED.promotional_price,
                    image_urls = EXCLUDED.image_urls,
                    features = EXCLUDED.features,
                    specifications = EXCLUDED.specifications,
                    available_colors = EXCLUDED.available_colors,
                    available_weights = EXCLUDED.available_weights,
                    is_deleted = EXCLUDED.is_deleted,
                    updated_at = NOW()
                "#,
            )
            .bind(item.id)
            .bind(&item.name)
            .bind(&item.description)
            .bind(item.category.as_str())
            .bind(item.muscle_group.map(|g| g.as_str()))
            .bind(item.availability_status.as_str())
            .bind(item.price)
            .bind(item.is_promotion)
            .bind(item.promotional_price)
            .bind(Json(&item.image_urls))
            .bind(Json(&item.features))
            .bind(Json(&item.specifications))
            .bind(Json(&item.available_colors))
            .bind(Json(&item.available_weights))
            .bind(item.is_deleted)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn soft_delete_equipment(&self, id: Uuid) -> RepoResult<()> {
        let result = sqlx::query("UPDATE equipment SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("equipment {id}")));
        }
        Ok(())
    }
}
