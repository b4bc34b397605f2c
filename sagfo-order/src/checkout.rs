use crate::cart::Cart;
use crate::finance::PaymentSplit;
use crate::models::{
    CustomerInfo, DeliveryStatus, Order, OrderItem, OrderStatus, ProductionDetails,
    StatusHistoryEntry,
};
use chrono::{DateTime, Utc};
use sagfo_catalog::Equipment;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Payment proof is required")]
    MissingPaymentProof,

    #[error("Made-to-order item '{0}' needs structure and upholstery colours")]
    MissingCustomization(String),

    #[error("Equipment not available: {0}")]
    UnknownEquipment(Uuid),
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Checks everything that can be rejected before the catalog is consulted or
/// anything is uploaded.
pub fn validate_request(
    cart: &Cart,
    customer_info: &CustomerInfo,
    has_payment_proof: bool,
) -> Result<(), CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    if is_blank(&customer_info.name) {
        return Err(CheckoutError::MissingField("name"));
    }
    if is_blank(customer_info.phone.expose()) {
        return Err(CheckoutError::MissingField("phone"));
    }
    if customer_info.address.as_deref().map_or(true, is_blank) {
        return Err(CheckoutError::MissingField("address"));
    }
    if !has_payment_proof {
        return Err(CheckoutError::MissingPaymentProof);
    }
    Ok(())
}

/// Resolves cart lines against the live catalog and snapshots equipment and
/// unit price into order lines.
pub fn price_lines(cart: &Cart, catalog: &[Equipment]) -> Result<Vec<OrderItem>, CheckoutError> {
    let by_id: HashMap<Uuid, &Equipment> = catalog
        .iter()
        .filter(|e| !e.is_deleted)
        .map(|e| (e.id, e))
        .collect();

    cart.lines
        .iter()
        .map(|line| {
            let equipment = by_id
                .get(&line.equipment_id)
                .ok_or(CheckoutError::UnknownEquipment(line.equipment_id))?;
            Ok(OrderItem {
                equipment: (*equipment).clone(),
                quantity: line.quantity,
                price_at_purchase: equipment.effective_price(),
                customization: line.customization.clone(),
                delivery_status: DeliveryStatus::Pending,
            })
        })
        .collect()
}

/// Made-to-order lines cannot go to the workshop without both colours.
pub fn validate_customization(items: &[OrderItem]) -> Result<(), CheckoutError> {
    let missing = items.iter().find(|item| {
        item.equipment.is_made_to_order()
            && (item.customization.structure_color.as_deref().map_or(true, is_blank)
                || item.customization.upholstery_color.as_deref().map_or(true, is_blank))
    });
    match missing {
        Some(item) => Err(CheckoutError::MissingCustomization(item.equipment.name.clone())),
        None => Ok(()),
    }
}

/// Everything captured at checkout besides the cart itself.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: Uuid,
    pub placed_by: String,
    pub customer_info: CustomerInfo,
    pub production_details: Option<ProductionDetails>,
    pub payment_proof_url: Option<String>,
}

/// Assembles a new order awaiting approval. The history starts with the
/// initial status so its newest entry always mirrors `status`.
pub fn build_order(
    draft: OrderDraft,
    items: Vec<OrderItem>,
    split: PaymentSplit,
    created_at: DateTime<Utc>,
) -> Order {
    let status = OrderStatus::PendingApproval;
    Order {
        id: Uuid::new_v4(),
        user_id: draft.user_id,
        status,
        payment_method: split.payment_method,
        financials: split.financials,
        items,
        status_history: vec![StatusHistoryEntry {
            status,
            note: None,
            date: created_at,
            updated_by: Some(draft.placed_by),
        }],
        assigned_transporter_id: None,
        customer_info: draft.customer_info,
        production_details: draft.production_details,
        payment_proof_url: draft.payment_proof_url,
        created_at,
        version: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::LineKey;
    use crate::finance::PaymentSplitCalculator;
    use crate::models::Customization;
    use sagfo_catalog::{AvailabilityStatus, Category};
    use sagfo_shared::Masked;

    fn customer() -> CustomerInfo {
        CustomerInfo {
            name: "Laura Gómez".to_string(),
            email: Masked::from("laura@example.com"),
            phone: Masked::from("3001234567"),
            city: "Medellín".to_string(),
            department: "Antioquia".to_string(),
            country: "Colombia".to_string(),
            address: Some("Calle 10 # 43-12".to_string()),
            ..Default::default()
        }
    }

    fn cart_with(ids: &[Uuid]) -> Cart {
        let mut cart = Cart::new();
        for id in ids {
            cart.add(LineKey { equipment_id: *id, selected_color: None, selected_weight: None }, 1).unwrap();
        }
        cart
    }

    #[test]
    fn test_request_validation_order() {
        let id = Uuid::new_v4();
        assert_eq!(
            validate_request(&Cart::new(), &customer(), true),
            Err(CheckoutError::EmptyCart)
        );

        let mut info = customer();
        info.address = Some("   ".to_string());
        assert_eq!(
            validate_request(&cart_with(&[id]), &info, true),
            Err(CheckoutError::MissingField("address"))
        );

        assert_eq!(
            validate_request(&cart_with(&[id]), &customer(), false),
            Err(CheckoutError::MissingPaymentProof)
        );
        assert!(validate_request(&cart_with(&[id]), &customer(), true).is_ok());
    }

    #[test]
    fn test_price_lines_snapshots_promotion_and_rejects_deleted() {
        let mut rack = Equipment::new("Rack", Category::Maquinaria, AvailabilityStatus::InStock, 900);
        rack.is_promotion = true;
        rack.promotional_price = Some(750);
        let mut gone = Equipment::new("Viejo", Category::Accesorios, AvailabilityStatus::InStock, 10);
        gone.is_deleted = true;

        let items = price_lines(&cart_with(&[rack.id]), &[rack.clone(), gone.clone()]).unwrap();
        assert_eq!(items[0].price_at_purchase, 750);
        assert_eq!(items[0].delivery_status, DeliveryStatus::Pending);

        let err = price_lines(&cart_with(&[gone.id]), &[rack, gone.clone()]).unwrap_err();
        assert_eq!(err, CheckoutError::UnknownEquipment(gone.id));
    }

    #[test]
    fn test_made_to_order_requires_both_colours() {
        let smith = Equipment::new("Smith", Category::Maquinaria, AvailabilityStatus::MadeToOrder, 5_000);
        let mut items = price_lines(&cart_with(&[smith.id]), &[smith]).unwrap();
        assert!(matches!(
            validate_customization(&items),
            Err(CheckoutError::MissingCustomization(_))
        ));

        items[0].customization = Customization {
            structure_color: Some("Negro".to_string()),
            upholstery_color: Some("Rojo".to_string()),
            ..Default::default()
        };
        assert!(validate_customization(&items).is_ok());
    }

    #[test]
    fn test_built_order_starts_pending_with_one_history_entry() {
        let bar = Equipment::new("Barra", Category::Accesorios, AvailabilityStatus::InStock, 300);
        let items = price_lines(&cart_with(&[bar.id]), &[bar.clone()]).unwrap();
        let split = PaymentSplitCalculator::default().compute([(&bar, 1)]).unwrap();
        let draft = OrderDraft {
            user_id: Uuid::new_v4(),
            placed_by: "Laura Gómez".to_string(),
            customer_info: customer(),
            production_details: None,
            payment_proof_url: Some("https://blob.example/proof.png".to_string()),
        };

        let order = build_order(draft, items, split, Utc::now());

        assert_eq!(order.status, OrderStatus::PendingApproval);
        assert_eq!(order.status_history.len(), 1);
        assert_eq!(order.latest_history().unwrap().status, order.status);
        assert!(order.financials.is_balanced());
        assert_eq!(order.version, 0);
    }
}
