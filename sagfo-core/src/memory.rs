//! In-process adapters for every port. Used when no database or blob store
//! is configured, and by the test suites.

use async_trait::async_trait;
use sagfo_catalog::Equipment;
use sagfo_order::{Cart, CustomerMessage, Order};
use sagfo_shared::models::OrderEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::cart::CartCache;
use crate::identity::{normalize_email, UserRecord};
use crate::notify::{Notifier, NotifyError};
use crate::repository::{
    EquipmentRepository, OrderFilter, OrderPatch, OrderRepository, RepoResult, RepositoryError,
    SiteConfigRepository, UserRepository,
};
use crate::site::SiteConfig;
use crate::storage::{ObjectStorage, StorageError, Upload};

#[derive(Default)]
pub struct MemoryStore {
    equipment: RwLock<HashMap<Uuid, Equipment>>,
    orders: RwLock<HashMap<Uuid, Order>>,
    users: RwLock<HashMap<Uuid, UserRecord>>,
    site: RwLock<Option<SiteConfig>>,
    carts: RwLock<HashMap<Uuid, Cart>>,
}

#[async_trait]
impl EquipmentRepository for MemoryStore {
    async fn list_equipment(&self, include_deleted: bool) -> RepoResult<Vec<Equipment>> {
        let map = self.equipment.read().await;
        let mut items: Vec<Equipment> = map
            .values()
            .filter(|e| include_deleted || !e.is_deleted)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn get_equipment(&self, id: Uuid) -> RepoResult<Option<Equipment>> {
        Ok(self.equipment.read().await.get(&id).cloned())
    }

    async fn save_equipment_batch(&self, items: &[Equipment]) -> RepoResult<()> {
        let mut map = self.equipment.write().await;
        for item in items {
            map.insert(item.id, item.clone());
        }
        Ok(())
    }

    async fn soft_delete_equipment(&self, id: Uuid) -> RepoResult<()> {
        let mut map = self.equipment.write().await;
        let item = map
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("equipment {id}")))?;
        item.is_deleted = true;
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert_order(&self, order: &Order) -> RepoResult<()> {
        let mut map = self.orders.write().await;
        if map.contains_key(&order.id) {
            return Err(RepositoryError::Conflict(format!("order {} already exists", order.id)));
        }
        map.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> RepoResult<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> RepoResult<Vec<Order>> {
        let map = self.orders.read().await;
        let mut orders: Vec<Order> = map.values().filter(|o| filter.matches(o)).cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn update_order(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: &OrderPatch,
    ) -> RepoResult<Order> {
        let mut map = self.orders.write().await;
        let order = map
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("order {id}")))?;
        if order.version != expected_version {
            return Err(RepositoryError::Conflict(format!(
                "order {id} was modified concurrently (expected version {expected_version}, found {})",
                order.version
            )));
        }
        patch.apply_to(order);
        order.version += 1;
        Ok(order.clone())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn list_users(&self) -> RepoResult<Vec<UserRecord>> {
        let map = self.users.read().await;
        let mut users: Vec<UserRecord> = map.values().cloned().collect();
        users.sort_by(|a, b| a.profile.created_at.cmp(&b.profile.created_at));
        Ok(users)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<UserRecord>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<UserRecord>> {
        let wanted = normalize_email(email);
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| normalize_email(&u.profile.email) == wanted)
            .cloned())
    }

    async fn insert_user(&self, user: &UserRecord) -> RepoResult<()> {
        let mut map = self.users.write().await;
        let email = normalize_email(&user.profile.email);
        if map.values().any(|u| normalize_email(&u.profile.email) == email) {
            return Err(RepositoryError::Conflict(format!("e-mail {email} is already registered")));
        }
        map.insert(user.profile.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &UserRecord) -> RepoResult<()> {
        let mut map = self.users.write().await;
        let email = normalize_email(&user.profile.email);
        if map
            .values()
            .any(|u| u.profile.id != user.profile.id && normalize_email(&u.profile.email) == email)
        {
            return Err(RepositoryError::Conflict(format!("e-mail {email} is already registered")));
        }
        match map.get_mut(&user.profile.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("user {}", user.profile.id))),
        }
    }

    async fn delete_user(&self, id: Uuid) -> RepoResult<()> {
        self.users
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(format!("user {id}")))
    }
}

#[async_trait]
impl SiteConfigRepository for MemoryStore {
    async fn get_site_config(&self) -> RepoResult<SiteConfig> {
        Ok(self.site.read().await.clone().unwrap_or_default())
    }

    async fn upsert_site_config(&self, config: &SiteConfig) -> RepoResult<()> {
        *self.site.write().await = Some(config.clone());
        Ok(())
    }
}

#[async_trait]
impl CartCache for MemoryStore {
    async fn load(&self, user_id: Uuid) -> RepoResult<Option<Cart>> {
        Ok(self.carts.read().await.get(&user_id).cloned())
    }

    async fn store(&self, user_id: Uuid, cart: &Cart) -> RepoResult<()> {
        self.carts.write().await.insert(user_id, cart.clone());
        Ok(())
    }

    async fn clear(&self, user_id: Uuid) -> RepoResult<()> {
        self.carts.write().await.remove(&user_id);
        Ok(())
    }
}

const MEMORY_URL_PREFIX: &str = "memory://";

/// Keeps blobs in a map and hands out `memory://<key>` URLs.
#[derive(Default)]
pub struct MemoryObjectStorage {
    objects: RwLock<HashMap<String, Upload>>,
    fail_uploads: AtomicBool,
}

impl MemoryObjectStorage {
    /// Makes every following upload fail, to exercise error paths.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub async fn contains(&self, url: &str) -> bool {
        match url.strip_prefix(MEMORY_URL_PREFIX) {
            Some(key) => self.objects.read().await.contains_key(key),
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn upload(&self, upload: Upload, folder: &str) -> Result<String, StorageError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::Upload("object store unavailable".to_string()));
        }
        let key = upload.object_key(folder);
        self.objects.write().await.insert(key.clone(), upload);
        Ok(format!("{MEMORY_URL_PREFIX}{key}"))
    }

    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        let key = url
            .strip_prefix(MEMORY_URL_PREFIX)
            .ok_or_else(|| StorageError::UnknownUrl(url.to_string()))?;
        self.objects.write().await.remove(key);
        Ok(())
    }
}

/// Keeps everything it is handed, for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: RwLock<Vec<CustomerMessage>>,
    events: RwLock<Vec<OrderEvent>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    /// Makes every following call fail.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn messages(&self) -> Vec<CustomerMessage> {
        self.messages.read().await.clone()
    }

    pub async fn events(&self) -> Vec<OrderEvent> {
        self.events.read().await.clone()
    }

    fn check(&self) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(NotifyError("gateway unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &CustomerMessage) -> Result<(), NotifyError> {
        self.check()?;
        self.messages.write().await.push(message.clone());
        Ok(())
    }

    async fn publish(&self, event: &OrderEvent) -> Result<(), NotifyError> {
        self.check()?;
        self.events.write().await.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sagfo_catalog::{AvailabilityStatus, Category};

    #[tokio::test]
    async fn test_soft_deleted_equipment_is_hidden() {
        let store = MemoryStore::default();
        let item = Equipment::new("Polea", Category::Maquinaria, AvailabilityStatus::InStock, 10);
        store.save_equipment(&item).await.unwrap();
        store.soft_delete_equipment(item.id).await.unwrap();

        assert!(store.list_equipment(false).await.unwrap().is_empty());
        assert_eq!(store.list_equipment(true).await.unwrap().len(), 1);
        assert!(matches!(
            store.soft_delete_equipment(Uuid::new_v4()).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_storage_round_trip() {
        let storage = MemoryObjectStorage::default();
        let url = storage
            .upload(Upload::new("foto.jpg", "image/jpeg", vec![1, 2, 3]), "equipment")
            .await
            .unwrap();
        assert!(storage.contains(&url).await);
        storage.delete(&url).await.unwrap();
        assert!(storage.is_empty().await);
        assert!(matches!(
            storage.delete("https://elsewhere/x").await,
            Err(StorageError::UnknownUrl(_))
        ));
    }
}
