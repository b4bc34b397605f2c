use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sagfo_core::identity::{Profile, UserRecord};
use sagfo_core::repository::{RepoResult, UserRepository};
use sagfo_core::RepositoryError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{corrupt, db_error};

pub struct StoreUserRepository {
    pool: PgPool,
}

impl StoreUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    phone: Option<String>,
    address: Option<String>,
    city: Option<String>,
    department: Option<String>,
    country: Option<String>,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserRecord {
            profile: Profile {
                id: row.id,
                name: row.name,
                email: row.email,
                role: row.role.parse().map_err(|e| corrupt("user", e))?,
                phone: row.phone,
                address: row.address,
                city: row.city,
                department: row.department,
                country: row.country,
                created_at: row.created_at,
            },
            password_hash: row.password_hash,
        })
    }
}

const SELECT_USER: &str = r#"
    SELECT id, name, email, role, phone, address, city, department, country, password_hash, created_at
    FROM users
"#;

#[async_trait]
impl UserRepository for StoreUserRepository {
    async fn list_users(&self) -> RepoResult<Vec<UserRecord>> {
        let sql = format!("{SELECT_USER} ORDER BY created_at");
        sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(UserRecord::try_from)
            .collect()
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<UserRecord>> {
        let sql = format!("{SELECT_USER} WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(UserRecord::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<UserRecord>> {
        let sql = format!("{SELECT_USER} WHERE LOWER(email) = LOWER($1)");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(UserRecord::try_from)
            .transpose()
    }

    async fn insert_user(&self, user: &UserRecord) -> RepoResult<()> {
        let p = &user.profile;
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, role, phone, address, city, department, country,
                               password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(p.id)
        .bind(&p.name)
        .bind(&p.email)
        .bind(p.role.as_str())
        .bind(&p.phone)
        .bind(&p.address)
        .bind(&p.city)
        .bind(&p.department)
        .bind(&p.country)
        .bind(&user.password_hash)
        .bind(p.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn update_user(&self, user: &UserRecord) -> RepoResult<()> {
        let p = &user.profile;
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $2, email = $3, role = $4, phone = $5, address = $6, city = $7,
                department = $8, country = $9, password_hash = $10
            WHERE id = $1
            "#,
        )
        .bind(p.id)
        .bind(&p.name)
        .bind(&p.email)
        .bind(p.role.as_str())
        .bind(&p.phone)
        .bind(&p.address)
        .bind(&p.city)
        .bind(&p.department)
        .bind(&p.country)
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("user {}", p.id)));
        }
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("user {id}")));
        }
        Ok(())
    }
}
