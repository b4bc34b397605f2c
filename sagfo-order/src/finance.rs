use crate::checkout::CheckoutError;
use crate::models::{Financials, Order, OrderStatus, PaymentMethod};
use chrono::{DateTime, Utc};
use sagfo_catalog::Equipment;
use sagfo_shared::Masked;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of splitting a cart into what is paid now and what is owed later.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentSplit {
    pub in_stock_total: i64,
    pub production_total: i64,
    pub financials: Financials,
    pub payment_method: PaymentMethod,
}

/// Computes the checkout split: in-stock lines are paid in full, made-to-order
/// lines pay a deposit now and the balance on delivery.
#[derive(Debug, Clone, Copy)]
pub struct PaymentSplitCalculator {
    deposit_percent: u8,
}

impl Default for PaymentSplitCalculator {
    fn default() -> Self {
        Self { deposit_percent: 50 }
    }
}

impl PaymentSplitCalculator {
    pub fn new(deposit_percent: u8) -> Self {
        Self {
            deposit_percent: deposit_percent.min(100),
        }
    }

    pub fn deposit_percent(&self) -> u8 {
        self.deposit_percent
    }

    /// Splits `(equipment, quantity)` lines priced at their effective unit
    /// price. The pending balance is rounded down so that
    /// `amount_paid + amount_pending == total_order_value` holds exactly.
    pub fn compute<'a, I>(&self, lines: I) -> Result<PaymentSplit, CheckoutError>
    where
        I: IntoIterator<Item = (&'a Equipment, u32)>,
    {
        let mut in_stock_total = 0i64;
        let mut production_total = 0i64;
        let mut has_in_stock = false;
        let mut has_production = false;

        for (equipment, quantity) in lines {
            let line_total = equipment.effective_price() * i64::from(quantity);
            if equipment.is_made_to_order() {
                production_total += line_total;
                has_production = true;
            } else {
                in_stock_total += line_total;
                has_in_stock = true;
            }
        }

        if !has_in_stock && !has_production {
            return Err(CheckoutError::EmptyCart);
        }

        let total_order_value = in_stock_total + production_total;
        let amount_pending = production_total * i64::from(100 - self.deposit_percent) / 100;
        let amount_paid = total_order_value - amount_pending;

        let payment_method = match (has_in_stock, has_production) {
            (true, true) => PaymentMethod::Mixed,
            (false, true) => PaymentMethod::Production,
            _ => PaymentMethod::Standard,
        };

        Ok(PaymentSplit {
            in_stock_total,
            production_total,
            financials: Financials {
                total_order_value,
                amount_paid,
                amount_pending,
            },
            payment_method,
        })
    }
}

/// An order with an outstanding balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtEntry {
    pub order_id: Uuid,
    pub customer_name: String,
    pub phone: Masked<String>,
    pub status: OrderStatus,
    pub amount_pending: i64,
    pub days_pending: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtsReport {
    pub entries: Vec<DebtEntry>,
    pub total_pending: i64,
}

/// Orders that still owe a balance and are neither delivered nor cancelled.
pub fn debts_report(orders: &[Order], now: DateTime<Utc>) -> DebtsReport {
    let entries: Vec<DebtEntry> = orders
        .iter()
        .filter(|o| {
            o.financials.amount_pending > 0
                && !matches!(o.status, OrderStatus::Delivered | OrderStatus::Cancelled)
        })
        .map(|o| DebtEntry {
            order_id: o.id,
            customer_name: o.customer_info.name.clone(),
            phone: o.customer_info.phone.clone(),
            status: o.status,
            amount_pending: o.financials.amount_pending,
            days_pending: (now - o.created_at).num_days(),
        })
        .collect();

    let total_pending = entries.iter().map(|e| e.amount_pending).sum();
    DebtsReport { entries, total_pending }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Overview {
    pub active_orders: usize,
    pub total_revenue: i64,
    pub pending_approval: usize,
    pub total_products: usize,
    pub total_users: usize,
    /// Order values of the seven most recent orders, newest first.
    pub recent_order_values: Vec<i64>,
}

/// Back-office dashboard figures. Revenue counts what was actually collected
/// on orders that were not rejected or cancelled.
pub fn overview(orders: &[Order], total_products: usize, total_users: usize) -> Overview {
    let active: Vec<&Order> = orders
        .iter()
        .filter(|o| !matches!(o.status, OrderStatus::Rejected | OrderStatus::Cancelled))
        .collect();

    let mut recent: Vec<&Order> = orders.iter().collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Overview {
        active_orders: active.len(),
        total_revenue: active.iter().map(|o| o.financials.amount_paid).sum(),
        pending_approval: orders
            .iter()
            .filter(|o| o.status == OrderStatus::PendingApproval)
            .count(),
        total_products,
        total_users,
        recent_order_values: recent
            .iter()
            .take(7)
            .map(|o| o.financials.total_order_value)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sagfo_catalog::{AvailabilityStatus, Category};

    fn in_stock(price: i64) -> Equipment {
        Equipment::new("Mancuerna", Category::Accesorios, AvailabilityStatus::InStock, price)
    }

    fn made_to_order(price: i64) -> Equipment {
        Equipment::new("Smith", Category::Maquinaria, AvailabilityStatus::MadeToOrder, price)
    }

    #[test]
    fn test_all_in_stock_is_paid_in_full() {
        let a = in_stock(120);
        let b = in_stock(35);
        let split = PaymentSplitCalculator::default()
            .compute([(&a, 2), (&b, 3)])
            .unwrap();

        assert_eq!(split.financials.total_order_value, 345);
        assert_eq!(split.financials.amount_paid, 345);
        assert_eq!(split.financials.amount_pending, 0);
        assert_eq!(split.payment_method, PaymentMethod::Standard);
    }

    #[test]
    fn test_all_made_to_order_pays_half() {
        let a = made_to_order(1_000);
        let split = PaymentSplitCalculator::default().compute([(&a, 3)]).unwrap();

        assert_eq!(split.financials.total_order_value, 3_000);
        assert_eq!(split.financials.amount_paid, 1_500);
        assert_eq!(split.financials.amount_pending, 1_500);
        assert_eq!(split.payment_method, PaymentMethod::Production);
    }

    #[test]
    fn test_mixed_cart() {
        let a = in_stock(100);
        let b = made_to_order(200);
        let split = PaymentSplitCalculator::default()
            .compute([(&a, 1), (&b, 1)])
            .unwrap();

        assert_eq!(split.in_stock_total, 100);
        assert_eq!(split.production_total, 200);
        assert_eq!(split.financials.total_order_value, 300);
        assert_eq!(split.financials.amount_paid, 200);
        assert_eq!(split.financials.amount_pending, 100);
        assert_eq!(split.payment_method, PaymentMethod::Mixed);
    }

    #[test]
    fn test_odd_production_total_stays_balanced() {
        let a = made_to_order(201);
        let split = PaymentSplitCalculator::default().compute([(&a, 1)]).unwrap();

        assert_eq!(split.financials.amount_pending, 100);
        assert_eq!(split.financials.amount_paid, 101);
        assert!(split.financials.is_balanced());
    }

    #[test]
    fn test_promotional_price_is_used() {
        let mut a = in_stock(500);
        a.is_promotion = true;
        a.promotional_price = Some(400);
        let split = PaymentSplitCalculator::default().compute([(&a, 2)]).unwrap();
        assert_eq!(split.financials.total_order_value, 800);
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        let lines: Vec<(&Equipment, u32)> = Vec::new();
        let err = PaymentSplitCalculator::default().compute(lines).unwrap_err();
        assert_eq!(err, CheckoutError::EmptyCart);
    }

    #[test]
    fn test_custom_deposit_percent() {
        let a = made_to_order(1_000);
        let split = PaymentSplitCalculator::new(30).compute([(&a, 1)]).unwrap();
        assert_eq!(split.financials.amount_paid, 300);
        assert_eq!(split.financials.amount_pending, 700);
    }

    #[test]
    fn test_debts_report_skips_settled_and_closed_orders() {
        let owing = crate::test_support::sample_order(&[made_to_order(1_000)]);
        let paid = crate::test_support::sample_order(&[in_stock(200)]);
        let mut delivered = crate::test_support::sample_order(&[made_to_order(400)]);
        delivered.status = OrderStatus::Delivered;

        let now = owing.created_at + chrono::Duration::days(3);
        let report = debts_report(&[owing.clone(), paid, delivered], now);

        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].order_id, owing.id);
        assert_eq!(report.entries[0].amount_pending, 500);
        assert_eq!(report.entries[0].days_pending, 3);
        assert_eq!(report.total_pending, 500);
    }

    #[test]
    fn test_overview_excludes_cancelled_revenue() {
        let a = crate::test_support::sample_order(&[in_stock(300)]);
        let b = crate::test_support::sample_order(&[made_to_order(1_000)]);
        let mut c = crate::test_support::sample_order(&[in_stock(900)]);
        c.status = OrderStatus::Cancelled;

        let o = overview(&[a, b, c], 12, 4);
        assert_eq!(o.active_orders, 2);
        assert_eq!(o.total_revenue, 800);
        assert_eq!(o.pending_approval, 2);
        assert_eq!(o.total_products, 12);
        assert_eq!(o.total_users, 4);
        assert_eq!(o.recent_order_values.len(), 3);
    }
}
