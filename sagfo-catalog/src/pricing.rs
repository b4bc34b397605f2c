use crate::equipment::{Equipment, EquipmentError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

impl Equipment {
    /// Unit price a customer pays right now.
    ///
    /// An active promotion with a positive promotional price wins over the list
    /// price. This is the value snapshotted as `price_at_purchase`.
    pub fn effective_price(&self) -> i64 {
        match self.promotional_price {
            Some(promo) if self.is_promotion && promo > 0 => promo,
            _ => self.price,
        }
    }

    /// True when the storefront should show a struck-through list price.
    pub fn has_discount(&self) -> bool {
        self.is_promotion
            && self
                .promotional_price
                .is_some_and(|promo| promo > 0 && promo < self.price)
    }

    /// Whole-percent discount shown on promotion badges, rounded down.
    pub fn discount_percent(&self) -> Option<u8> {
        if !self.has_discount() || self.price == 0 {
            return None;
        }
        let promo = self.promotional_price?;
        let pct = (self.price - promo) * 100 / self.price;
        u8::try_from(pct).ok()
    }
}

/// A batch of list-price changes keyed by equipment id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub prices: BTreeMap<Uuid, i64>,
}

impl PriceUpdate {
    pub fn validate(&self) -> Result<(), EquipmentError> {
        if let Some((id, price)) = self.prices.iter().find(|(_, p)| **p < 0) {
            return Err(EquipmentError::InvalidField(format!(
                "price for {} must not be negative (got {})",
                id, price
            )));
        }
        Ok(())
    }

    /// Applies the batch to `items`, returning the ids whose price changed.
    pub fn apply(&self, items: &mut [Equipment]) -> Vec<Uuid> {
        let mut changed = Vec::new();
        for item in items.iter_mut() {
            if let Some(price) = self.prices.get(&item.id) {
                if item.price != *price {
                    item.price = *price;
                    changed.push(item.id);
                }
            }
        }
        changed
    }
}
