pub mod app_config;
pub mod database;
pub mod catalog_repo;
pub mod order_repo;
pub mod user_repo;
pub mod site_config_repo;
pub mod cart_repo;
pub mod blob_storage;

use sagfo_core::RepositoryError;

pub use blob_storage::HttpObjectStorage;
pub use cart_repo::StoreCartCache;
pub use catalog_repo::StoreEquipmentRepository;
pub use database::DbClient;
pub use order_repo::StoreOrderRepository;
pub use site_config_repo::StoreSiteConfigRepository;
pub use user_repo::StoreUserRepository;

/// Maps driver errors onto the repository taxonomy. Unique-key violations
/// become conflicts.
pub(crate) fn db_error(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(db.message().to_string())
        }
        sqlx::Error::RowNotFound => RepositoryError::NotFound("row".to_string()),
        _ => {
            tracing::error!(error = %err, "Database error");
            RepositoryError::Backend(err.to_string())
        }
    }
}

/// A stored value that no longer parses into the domain type.
pub(crate) fn corrupt(what: &str, err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Backend(format!("corrupt {what}: {err}"))
}
