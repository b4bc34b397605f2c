use async_trait::async_trait;
use sagfo_order::cart::ProductionField;
use sagfo_order::{Cart, CartLine, LineKey};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::identity::Actor;
use crate::repository::{EquipmentRepository, RepoResult};
use crate::{CoreError, CoreResult};

/// Per-user cart persistence. Pluggable so carts can live in the database,
/// a cache, or memory.
#[async_trait]
pub trait CartCache: Send + Sync {
    async fn load(&self, user_id: Uuid) -> RepoResult<Option<Cart>>;

    async fn store(&self, user_id: Uuid, cart: &Cart) -> RepoResult<()>;

    async fn clear(&self, user_id: Uuid) -> RepoResult<()>;
}

pub struct CartService {
    cache: Arc<dyn CartCache>,
    equipment: Arc<dyn EquipmentRepository>,
}

impl CartService {
    pub fn new(cache: Arc<dyn CartCache>, equipment: Arc<dyn EquipmentRepository>) -> Self {
        Self { cache, equipment }
    }

    pub async fn get(&self, actor: &Actor) -> CoreResult<Cart> {
        Ok(self.cache.load(actor.id).await?.unwrap_or_default())
    }

    async fn save(&self, actor: &Actor, cart: Cart) -> CoreResult<Cart> {
        self.cache.store(actor.id, &cart).await?;
        debug!(user_id = %actor.id, lines = cart.lines.len(), "Cart saved");
        Ok(cart)
    }

    /// Rejects keys that point at unknown or deleted equipment, or pick an
    /// option the item does not offer.
    async fn check_key(&self, key: &LineKey) -> CoreResult<()> {
        let equipment = self
            .equipment
            .get_equipment(key.equipment_id)
            .await?
            .filter(|e| !e.is_deleted)
            .ok_or_else(|| CoreError::NotFound(format!("equipment {}", key.equipment_id)))?;

        if let Some(color) = &key.selected_color {
            if !equipment.available_colors.is_empty() && !equipment.available_colors.contains(color) {
                return Err(CoreError::Validation(format!(
                    "'{}' is not offered in colour '{color}'",
                    equipment.name
                )));
            }
        }
        if let Some(weight) = &key.selected_weight {
            if !equipment.available_weights.is_empty() && !equipment.available_weights.contains(weight) {
                return Err(CoreError::Validation(format!(
                    "'{}' is not offered in weight '{weight}'",
                    equipment.name
                )));
            }
        }
        Ok(())
    }

    /// Adds `quantity` units of the keyed line.
    pub async fn add(&self, actor: &Actor, key: LineKey, quantity: u32) -> CoreResult<Cart> {
        if quantity == 0 {
            return Err(CoreError::Validation("quantity must be at least 1".to_string()));
        }
        self.check_key(&key).await?;
        let mut cart = self.get(actor).await?;
        cart.add(key, quantity)?;
        self.save(actor, cart).await
    }

    /// Adds a prepared package of lines in one go.
    pub async fn add_package(&self, actor: &Actor, lines: Vec<CartLine>) -> CoreResult<Cart> {
        for line in &lines {
            self.check_key(&line.key()).await?;
        }
        let mut cart = self.get(actor).await?;
        cart.add_lines(lines)?;
        self.save(actor, cart).await
    }

    pub async fn set_quantity(&self, actor: &Actor, key: &LineKey, quantity: u32) -> CoreResult<Cart> {
        let mut cart = self.get(actor).await?;
        cart.set_quantity(key, quantity)?;
        self.save(actor, cart).await
    }

    pub async fn customize(
        &self,
        actor: &Actor,
        key: &LineKey,
        field: ProductionField,
        value: String,
    ) -> CoreResult<Cart> {
        let mut cart = self.get(actor).await?;
        cart.customize(key, field, value)?;
        self.save(actor, cart).await
    }

    pub async fn remove(&self, actor: &Actor, key: &LineKey) -> CoreResult<Cart> {
        let mut cart = self.get(actor).await?;
        cart.remove(key)?;
        self.save(actor, cart).await
    }

    pub async fn clear(&self, actor: &Actor) -> CoreResult<()> {
        self.cache.clear(actor.id).await?;
        Ok(())
    }
}
