use crate::checkout::{build_order, price_lines, OrderDraft};
use crate::finance::PaymentSplitCalculator;
use crate::models::{CustomerInfo, Order};
use crate::cart::{Cart, LineKey};
use sagfo_catalog::Equipment;
use sagfo_shared::{time::now_micros, Masked};
use uuid::Uuid;

pub(crate) fn customer() -> CustomerInfo {
    CustomerInfo {
        name: "Andrés Pardo".to_string(),
        email: Masked::from("andres@example.com"),
        phone: Masked::from("+57 310 555 0101"),
        city: "Bogotá".to_string(),
        department: "Cundinamarca".to_string(),
        country: "Colombia".to_string(),
        address: Some("Carrera 7 # 72-41".to_string()),
        ..Default::default()
    }
}

/// An order awaiting approval with one unit of each given equipment.
pub(crate) fn sample_order(equipment: &[Equipment]) -> Order {
    let mut cart = Cart::new();
    for e in equipment {
        cart.add(LineKey { equipment_id: e.id, selected_color: None, selected_weight: None }, 1)
            .expect("one unit is within the line cap");
    }
    let items = price_lines(&cart, equipment).expect("all equipment is in the catalog");
    let split = if equipment.is_empty() {
        crate::finance::PaymentSplit {
            in_stock_total: 0,
            production_total: 0,
            financials: Default::default(),
            payment_method: crate::models::PaymentMethod::Standard,
        }
    } else {
        PaymentSplitCalculator::default()
            .compute(equipment.iter().map(|e| (e, 1)))
            .expect("non-empty cart")
    };
    let draft = OrderDraft {
        user_id: Uuid::new_v4(),
        placed_by: "Andrés Pardo".to_string(),
        customer_info: customer(),
        production_details: None,
        payment_proof_url: None,
    };
    build_order(draft, items, split, now_micros())
}
