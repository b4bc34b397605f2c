use crate::models::Customization;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a cart line. The same equipment in two colours or weights is
/// two lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub equipment_id: Uuid,
    #[serde(default)]
    pub selected_color: Option<String>,
    #[serde(default)]
    pub selected_weight: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub equipment_id: Uuid,
    pub quantity: u32,
    #[serde(flatten)]
    pub customization: Customization,
}

impl CartLine {
    pub fn key(&self) -> LineKey {
        LineKey {
            equipment_id: self.equipment_id,
            selected_color: self.customization.selected_color.clone(),
            selected_weight: self.customization.selected_weight.clone(),
        }
    }

    fn matches(&self, key: &LineKey) -> bool {
        self.equipment_id == key.equipment_id
            && self.customization.selected_color == key.selected_color
            && self.customization.selected_weight == key.selected_weight
    }
}

/// Which production colour a customization update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionField {
    StructureColor,
    UpholsteryColor,
}

/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: u32 = 999;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CartError {
    #[error("Cart line not found for equipment {0}")]
    LineNotFound(Uuid),
    #[error("Quantity per line cannot exceed {max}")]
    QuantityTooLarge { max: u32 },
}

fn bounded_sum(current: u32, extra: u32) -> Result<u32, CartError> {
    current
        .checked_add(extra)
        .filter(|q| *q <= MAX_LINE_QUANTITY)
        .ok_or(CartError::QuantityTooLarge { max: MAX_LINE_QUANTITY })
}

/// A customer's cart. Lines keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    pub fn line(&self, key: &LineKey) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.matches(key))
    }

    /// Adds `quantity` units. A new line starts with the structure colour set
    /// to the selected colour. The cart is unchanged when the line would pass
    /// [`MAX_LINE_QUANTITY`].
    pub fn add(&mut self, key: LineKey, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Ok(());
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.matches(&key)) {
            line.quantity = bounded_sum(line.quantity, quantity)?;
            return Ok(());
        }
        let quantity = bounded_sum(0, quantity)?;
        self.lines.push(CartLine {
            equipment_id: key.equipment_id,
            quantity,
            customization: Customization {
                structure_color: key.selected_color.clone(),
                selected_color: key.selected_color,
                selected_weight: key.selected_weight,
                upholstery_color: None,
            },
        });
        Ok(())
    }

    /// Merges a prepared package line by line, summing quantities of lines
    /// that share a key. Either every line is merged or none is.
    pub fn add_lines(&mut self, lines: impl IntoIterator<Item = CartLine>) -> Result<(), CartError> {
        let mut merged = self.lines.clone();
        for mut incoming in lines.into_iter().filter(|l| l.quantity > 0) {
            let key = incoming.key();
            match merged.iter_mut().find(|l| l.matches(&key)) {
                Some(existing) => existing.quantity = bounded_sum(existing.quantity, incoming.quantity)?,
                None => {
                    incoming.quantity = bounded_sum(0, incoming.quantity)?;
                    merged.push(incoming);
                }
            }
        }
        self.lines = merged;
        Ok(())
    }

    /// Sets the quantity of a line; anything below one removes it.
    pub fn set_quantity(&mut self, key: &LineKey, quantity: u32) -> Result<(), CartError> {
        if quantity < 1 {
            return self.remove(key);
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(CartError::QuantityTooLarge { max: MAX_LINE_QUANTITY });
        }
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.matches(key))
            .ok_or(CartError::LineNotFound(key.equipment_id))?;
        line.quantity = quantity;
        Ok(())
    }

    pub fn customize(
        &mut self,
        key: &LineKey,
        field: ProductionField,
        value: impl Into<String>,
    ) -> Result<(), CartError> {
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.matches(key))
            .ok_or(CartError::LineNotFound(key.equipment_id))?;
        let value = Some(value.into());
        match field {
            ProductionField::StructureColor => line.customization.structure_color = value,
            ProductionField::UpholsteryColor => line.customization.upholstery_color = value,
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &LineKey) -> Result<(), CartError> {
        let before = self.lines.len();
        self.lines.retain(|l| !l.matches(key));
        if self.lines.len() == before {
            return Err(CartError::LineNotFound(key.equipment_id));
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: Uuid, color: Option<&str>, weight: Option<&str>) -> LineKey {
        LineKey {
            equipment_id: id,
            selected_color: color.map(str::to_string),
            selected_weight: weight.map(str::to_string),
        }
    }

    #[test]
    fn test_same_key_increments_quantity() {
        let id = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add(key(id, Some("Negro"), None), 1).unwrap();
        cart.add(key(id, Some("Negro"), None), 1).unwrap();

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 2);
        assert_eq!(cart.lines[0].customization.structure_color.as_deref(), Some("Negro"));
    }

    #[test]
    fn test_different_colour_or_weight_is_a_new_line() {
        let id = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add(key(id, Some("Negro"), Some("10 kg")), 1).unwrap();
        cart.add(key(id, Some("Rojo"), Some("10 kg")), 1).unwrap();
        cart.add(key(id, Some("Negro"), Some("20 kg")), 1).unwrap();

        assert_eq!(cart.lines.len(), 3);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_quantity_below_one_removes_line() {
        let id = Uuid::new_v4();
        let k = key(id, None, None);
        let mut cart = Cart::new();
        cart.add(k.clone(), 1).unwrap();
        cart.set_quantity(&k, 4).unwrap();
        assert_eq!(cart.line(&k).unwrap().quantity, 4);

        cart.set_quantity(&k, 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.set_quantity(&k, 2), Err(CartError::LineNotFound(id)));
    }

    #[test]
    fn test_package_merges_with_existing_lines() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add(key(a, None, None), 1).unwrap();

        cart.add_lines(vec![
            CartLine { equipment_id: a, quantity: 2, customization: Customization::default() },
            CartLine { equipment_id: b, quantity: 1, customization: Customization::default() },
        ])
        .unwrap();

        assert_eq!(cart.lines.len(), 2);
        assert_eq!(cart.line(&key(a, None, None)).unwrap().quantity, 3);
    }

    #[test]
    fn test_customize_production_colours() {
        let id = Uuid::new_v4();
        let k = key(id, Some("Blanco"), None);
        let mut cart = Cart::new();
        cart.add(k.clone(), 1).unwrap();
        cart.customize(&k, ProductionField::UpholsteryColor, "Vinotinto").unwrap();
        cart.customize(&k, ProductionField::StructureColor, "Gris").unwrap();

        let line = cart.line(&k).unwrap();
        assert_eq!(line.customization.upholstery_color.as_deref(), Some("Vinotinto"));
        assert_eq!(line.customization.structure_color.as_deref(), Some("Gris"));
        // the line identity does not change
        assert_eq!(line.key(), k);
    }

    #[test]
    fn test_line_quantity_is_capped() {
        let id = Uuid::new_v4();
        let k = key(id, None, None);
        let too_large = Err(CartError::QuantityTooLarge { max: MAX_LINE_QUANTITY });
        let mut cart = Cart::new();
        cart.add(k.clone(), MAX_LINE_QUANTITY).unwrap();

        assert_eq!(cart.add(k.clone(), 1), too_large);
        assert_eq!(cart.set_quantity(&k, u32::MAX), too_large);
        assert_eq!(cart.add(key(id, Some("Rojo"), None), u32::MAX), too_large);
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.line(&k).unwrap().quantity, MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_package_past_the_cap_leaves_cart_untouched() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add(key(a, None, None), 2).unwrap();
        let before = cart.clone();

        let result = cart.add_lines(vec![
            CartLine { equipment_id: b, quantity: 1, customization: Customization::default() },
            CartLine { equipment_id: a, quantity: u32::MAX, customization: Customization::default() },
        ]);

        assert_eq!(result, Err(CartError::QuantityTooLarge { max: MAX_LINE_QUANTITY }));
        assert_eq!(cart, before);
    }
}
