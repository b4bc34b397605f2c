use async_trait::async_trait;
use sagfo_catalog::Equipment;
use sagfo_order::{DeliveryStatus, Order, OrderStatus, StatusHistoryEntry};
use serde::Deserialize;
use uuid::Uuid;

use crate::identity::UserRecord;
use crate::site::SiteConfig;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(String),
    /// A conditional write lost against a concurrent writer, or a unique key
    /// is already taken.
    #[error("{0}")]
    Conflict(String),
    #[error("backend failure: {0}")]
    Backend(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository trait for equipment catalog access
#[async_trait]
pub trait EquipmentRepository: Send + Sync {
    async fn list_equipment(&self, include_deleted: bool) -> RepoResult<Vec<Equipment>>;

    async fn get_equipment(&self, id: Uuid) -> RepoResult<Option<Equipment>>;

    /// Inserts or replaces each item, all in one write.
    async fn save_equipment_batch(&self, items: &[Equipment]) -> RepoResult<()>;

    async fn save_equipment(&self, item: &Equipment) -> RepoResult<()> {
        self.save_equipment_batch(std::slice::from_ref(item)).await
    }

    /// Marks the item deleted; it stays readable with `include_deleted`.
    async fn soft_delete_equipment(&self, id: Uuid) -> RepoResult<()>;
}

/// Read filter for orders. Every set field must match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub user_id: Option<Uuid>,
    pub assigned_transporter_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.map_or(true, |id| order.user_id == id)
            && self
                .assigned_transporter_id
                .map_or(true, |id| order.assigned_transporter_id == Some(id))
            && self.status.map_or(true, |s| order.status == s)
    }
}

/// The mutable part of an order. Everything else is fixed at checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPatch {
    pub status: OrderStatus,
    pub status_history: Vec<StatusHistoryEntry>,
    pub assigned_transporter_id: Option<Uuid>,
    /// Delivery status per line, in line order.
    pub item_delivery: Vec<DeliveryStatus>,
}

impl From<&Order> for OrderPatch {
    fn from(order: &Order) -> Self {
        Self {
            status: order.status,
            status_history: order.status_history.clone(),
            assigned_transporter_id: order.assigned_transporter_id,
            item_delivery: order.items.iter().map(|i| i.delivery_status).collect(),
        }
    }
}

impl OrderPatch {
    pub fn apply_to(&self, order: &mut Order) {
        order.status = self.status;
        order.status_history = self.status_history.clone();
        order.assigned_transporter_id = self.assigned_transporter_id;
        for (item, status) in order.items.iter_mut().zip(&self.item_delivery) {
            item.delivery_status = *status;
        }
    }
}

/// Repository trait for order data access
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Stores the order and all of its lines atomically.
    async fn insert_order(&self, order: &Order) -> RepoResult<()>;

    async fn get_order(&self, id: Uuid) -> RepoResult<Option<Order>>;

    /// Newest first.
    async fn list_orders(&self, filter: &OrderFilter) -> RepoResult<Vec<Order>>;

    /// Applies `patch` only if the stored version still equals
    /// `expected_version`, bumping it by one. Returns the order as stored.
    /// A stale version yields [`RepositoryError::Conflict`].
    async fn update_order(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: &OrderPatch,
    ) -> RepoResult<Order>;
}

/// Repository trait for user profiles and credentials
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list_users(&self) -> RepoResult<Vec<UserRecord>>;

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<UserRecord>>;

    /// Case-insensitive lookup.
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<UserRecord>>;

    /// Fails with `Conflict` when the e-mail is taken, ignoring case.
    async fn insert_user(&self, user: &UserRecord) -> RepoResult<()>;

    async fn update_user(&self, user: &UserRecord) -> RepoResult<()>;

    async fn delete_user(&self, id: Uuid) -> RepoResult<()>;
}

/// Single-row storefront settings
#[async_trait]
pub trait SiteConfigRepository: Send + Sync {
    /// Defaults when nothing was saved yet.
    async fn get_site_config(&self) -> RepoResult<SiteConfig>;

    async fn upsert_site_config(&self, config: &SiteConfig) -> RepoResult<()>;
}
