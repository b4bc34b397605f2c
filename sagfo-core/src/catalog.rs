use sagfo_catalog::query::promotions;
use sagfo_catalog::{CatalogQuery, Comparison, Equipment, EquipmentError, PriceUpdate};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::identity::Actor;
use crate::repository::EquipmentRepository;
use crate::storage::{ObjectStorage, Upload, EQUIPMENT_FOLDER};
use crate::{CoreError, CoreResult};

pub struct CatalogService {
    equipment: Arc<dyn EquipmentRepository>,
    storage: Arc<dyn ObjectStorage>,
    max_compare_items: usize,
}

impl CatalogService {
    pub fn new(
        equipment: Arc<dyn EquipmentRepository>,
        storage: Arc<dyn ObjectStorage>,
        max_compare_items: usize,
    ) -> Self {
        Self { equipment, storage, max_compare_items }
    }

    pub async fn list(&self, query: &CatalogQuery) -> CoreResult<Vec<Equipment>> {
        let items = self.equipment.list_equipment(false).await?;
        Ok(query.apply(items))
    }

    pub async fn promotions(&self) -> CoreResult<Vec<Equipment>> {
        Ok(promotions(self.equipment.list_equipment(false).await?))
    }

    /// Live (not deleted) item by id.
    pub async fn get(&self, id: Uuid) -> CoreResult<Equipment> {
        self.equipment
            .get_equipment(id)
            .await?
            .filter(|e| !e.is_deleted)
            .ok_or_else(|| EquipmentError::NotFound(id.to_string()).into())
    }

    pub async fn compare(&self, ids: &[Uuid]) -> CoreResult<Comparison> {
        if ids.is_empty() {
            return Err(CoreError::Validation("nothing to compare".to_string()));
        }
        if ids.len() > self.max_compare_items {
            return Err(EquipmentError::TooManyToCompare {
                requested: ids.len(),
                max: self.max_compare_items,
            }
            .into());
        }
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            items.push(self.get(*id).await?);
        }
        Ok(Comparison::build(items, self.max_compare_items)?)
    }

    /// Creates an item with a server-issued id.
    pub async fn create(&self, actor: &Actor, mut item: Equipment) -> CoreResult<Equipment> {
        actor.require_admin()?;
        item.id = Uuid::new_v4();
        item.is_deleted = false;
        item.validate()?;
        self.equipment.save_equipment(&item).await?;
        info!(equipment_id = %item.id, name = %item.name, "Equipment created");
        Ok(item)
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, mut item: Equipment) -> CoreResult<Equipment> {
        actor.require_admin()?;
        self.get(id).await?;
        item.id = id;
        item.is_deleted = false;
        item.validate()?;
        self.equipment.save_equipment(&item).await?;
        info!(equipment_id = %id, "Equipment updated");
        Ok(item)
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> CoreResult<()> {
        actor.require_admin()?;
        self.get(id).await?;
        self.equipment.soft_delete_equipment(id).await?;
        info!(equipment_id = %id, "Equipment deleted");
        Ok(())
    }

    /// Applies a batch of list prices in one write. Returns the changed ids.
    pub async fn bulk_update_prices(&self, actor: &Actor, update: &PriceUpdate) -> CoreResult<Vec<Uuid>> {
        actor.require_admin()?;
        update.validate()?;

        let mut items = self.equipment.list_equipment(false).await?;
        let known: HashSet<Uuid> = items.iter().map(|e| e.id).collect();
        if let Some(missing) = update.prices.keys().find(|id| !known.contains(id)) {
            return Err(EquipmentError::NotFound(missing.to_string()).into());
        }

        let changed = update.apply(&mut items);
        let dirty: Vec<Equipment> = items.into_iter().filter(|e| changed.contains(&e.id)).collect();
        if !dirty.is_empty() {
            self.equipment.save_equipment_batch(&dirty).await?;
        }
        info!(changed = changed.len(), "Bulk price update applied");
        Ok(changed)
    }

    pub async fn upload_image(&self, actor: &Actor, id: Uuid, upload: Upload) -> CoreResult<Equipment> {
        actor.require_admin()?;
        if upload.bytes.is_empty() {
            return Err(CoreError::Validation("image is empty".to_string()));
        }
        let mut item = self.get(id).await?;
        let url = self.storage.upload(upload, EQUIPMENT_FOLDER).await?;
        item.image_urls.push(url.clone());

        if let Err(e) = self.equipment.save_equipment(&item).await {
            if let Err(cleanup) = self.storage.delete(&url).await {
                warn!(url = %url, error = %cleanup, "Failed to remove orphaned equipment image");
            }
            return Err(e.into());
        }
        info!(equipment_id = %id, "Equipment image added");
        Ok(item)
    }

    /// Deletes the blob first; the item only loses the URL once that worked.
    pub async fn remove_image(&self, actor: &Actor, id: Uuid, url: &str) -> CoreResult<Equipment> {
        actor.require_admin()?;
        let mut item = self.get(id).await?;
        let position = item
            .image_urls
            .iter()
            .position(|u| u == url)
            .ok_or_else(|| CoreError::NotFound(format!("image {url} on equipment {id}")))?;

        self.storage.delete(url).await?;
        item.image_urls.remove(position);
        self.equipment.save_equipment(&item).await?;
        info!(equipment_id = %id, "Equipment image removed");
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Role;
    use crate::memory::{MemoryObjectStorage, MemoryStore};
    use sagfo_catalog::{AvailabilityStatus, Category, SortOrder};
    use std::collections::BTreeMap;

    fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), "Laura", Role::Admin)
    }

    fn setup() -> (CatalogService, Arc<MemoryObjectStorage>) {
        let storage = Arc::new(MemoryObjectStorage::default());
        (CatalogService::new(Arc::new(MemoryStore::default()), storage.clone(), 2), storage)
    }

    fn item(name: &str, price: i64) -> Equipment {
        Equipment::new(name, Category::Maquinaria, AvailabilityStatus::MadeToOrder, price)
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_lists() {
        let (service, _) = setup();
        let mut draft = item("Smith", 3_000);
        let client_id = draft.id;
        draft.is_deleted = true;
        let created = service.create(&admin(), draft).await.unwrap();

        assert_ne!(created.id, client_id);
        assert!(!created.is_deleted);
        let listed = service.list(&CatalogQuery::default()).await.unwrap();
        assert_eq!(listed, vec![created]);
    }

    #[tokio::test]
    async fn test_delete_hides_item() {
        let (service, _) = setup();
        let created = service.create(&admin(), item("Smith", 3_000)).await.unwrap();
        service.delete(&admin(), created.id).await.unwrap();

        assert!(matches!(service.get(created.id).await, Err(CoreError::NotFound(_))));
        assert!(service.list(&CatalogQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_customer_cannot_create() {
        let (service, _) = setup();
        let customer = Actor::new(Uuid::new_v4(), "Ana", Role::Customer);
        let err = service.create(&customer, item("Smith", 3_000)).await.unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_bulk_prices() {
        let (service, _) = setup();
        let a = service.create(&admin(), item("A", 100)).await.unwrap();
        let b = service.create(&admin(), item("B", 200)).await.unwrap();

        let update = PriceUpdate { prices: BTreeMap::from([(a.id, 150), (b.id, 200)]) };
        let changed = service.bulk_update_prices(&admin(), &update).await.unwrap();
        assert_eq!(changed, vec![a.id]);
        assert_eq!(service.get(a.id).await.unwrap().price, 150);

        let sorted = service
            .list(&CatalogQuery { sort: SortOrder::PriceDesc, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(sorted[0].id, b.id);

        let bad = PriceUpdate { prices: BTreeMap::from([(a.id, -1)]) };
        assert!(matches!(
            service.bulk_update_prices(&admin(), &bad).await,
            Err(CoreError::Validation(_))
        ));
        let unknown = PriceUpdate { prices: BTreeMap::from([(Uuid::new_v4(), 1)]) };
        assert!(matches!(
            service.bulk_update_prices(&admin(), &unknown).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_compare_limits() {
        let (service, _) = setup();
        let a = service.create(&admin(), item("A", 100)).await.unwrap();
        let b = service.create(&admin(), item("B", 200)).await.unwrap();
        let c = service.create(&admin(), item("C", 300)).await.unwrap();

        let comparison = service.compare(&[a.id, b.id]).await.unwrap();
        assert_eq!(comparison.items.len(), 2);
        assert!(matches!(service.compare(&[a.id, b.id, c.id]).await, Err(CoreError::Validation(_))));
        assert!(matches!(service.compare(&[]).await, Err(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_image_upload_and_removal() {
        let (service, storage) = setup();
        let created = service.create(&admin(), item("A", 100)).await.unwrap();
        let with_image = service
            .upload_image(&admin(), created.id, Upload::new("a.jpg", "image/jpeg", vec![1]))
            .await
            .unwrap();
        let url = with_image.image_urls[0].clone();
        assert!(storage.contains(&url).await);

        let without = service.remove_image(&admin(), created.id, &url).await.unwrap();
        assert!(without.image_urls.is_empty());
        assert!(!storage.contains(&url).await);
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_item_untouched() {
        let (service, storage) = setup();
        let created = service.create(&admin(), item("A", 100)).await.unwrap();
        storage.fail_uploads(true);
        let err = service
            .upload_image(&admin(), created.id, Upload::new("a.jpg", "image/jpeg", vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
        assert!(service.get(created.id).await.unwrap().image_urls.is_empty());
    }
}
