use chrono::{DateTime, Utc};
use sagfo_catalog::Equipment;
use sagfo_shared::Masked;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Order lifecycle status. Wire values are the storefront's labels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    #[serde(rename = "Pendiente de Aprobación")]
    PendingApproval,
    #[serde(rename = "Recibido")]
    Received,
    #[serde(rename = "En Desarrollo")]
    InDevelopment,
    #[serde(rename = "Despachado")]
    Dispatched,
    #[serde(rename = "En Envío")]
    InTransit,
    #[serde(rename = "Entregado")]
    Delivered,
    #[serde(rename = "Rechazado")]
    Rejected,
    #[serde(rename = "Cancelado")]
    Cancelled,
}

impl OrderStatus {
    /// The six-step progress track shown to customers.
    pub const TRACK: [OrderStatus; 6] = [
        OrderStatus::PendingApproval,
        OrderStatus::Received,
        OrderStatus::InDevelopment,
        OrderStatus::Dispatched,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
    ];

    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::PendingApproval,
        OrderStatus::Received,
        OrderStatus::InDevelopment,
        OrderStatus::Dispatched,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
        OrderStatus::Rejected,
        OrderStatus::Cancelled,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::PendingApproval => "Pendiente de Aprobación",
            OrderStatus::Received => "Recibido",
            OrderStatus::InDevelopment => "En Desarrollo",
            OrderStatus::Dispatched => "Despachado",
            OrderStatus::InTransit => "En Envío",
            OrderStatus::Delivered => "Entregado",
            OrderStatus::Rejected => "Rechazado",
            OrderStatus::Cancelled => "Cancelado",
        }
    }

    /// Zero-based position on the progress track; `None` for the side exits.
    pub fn progress_step(&self) -> Option<usize> {
        Self::TRACK.iter().position(|s| s == self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Rejected | OrderStatus::Cancelled
        )
    }

    /// Made-to-order lines may only leave the workshop once the order reached
    /// one of these.
    pub fn allows_made_to_order_dispatch(&self) -> bool {
        matches!(
            self,
            OrderStatus::Dispatched | OrderStatus::InTransit | OrderStatus::Delivered
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value '{0}'")]
pub struct UnknownVariant(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.label() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// Per-line fulfilment state.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Shipped,
    Delivered,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Shipped => "shipped",
            DeliveryStatus::Delivered => "delivered",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeliveryStatus::Pending),
            "shipped" => Ok(DeliveryStatus::Shipped),
            "delivered" => Ok(DeliveryStatus::Delivered),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// How the checkout total was split, derived from cart composition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Only in-stock lines: paid in full.
    Standard,
    /// Only made-to-order lines: deposit now, balance on delivery.
    Production,
    Mixed,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Standard => "standard",
            PaymentMethod::Production => "production",
            PaymentMethod::Mixed => "mixed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Standard => "Pago Total",
            PaymentMethod::Production => "Producción (50/50)",
            PaymentMethod::Mixed => "Mixto",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(PaymentMethod::Standard),
            "production" => Ok(PaymentMethod::Production),
            "mixed" => Ok(PaymentMethod::Mixed),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Checkout breakdown, snapshotted on the order and never recomputed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Financials {
    pub total_order_value: i64,
    pub amount_paid: i64,
    pub amount_pending: i64,
}

impl Financials {
    pub fn is_balanced(&self) -> bool {
        self.amount_paid + self.amount_pending == self.total_order_value
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CustomerInfo {
    pub name: String,
    pub email: Masked<String>,
    pub phone: Masked<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub maps_link: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductionDetails {
    pub structure_color: String,
    pub upholstery_color: String,
}

/// Options a customer picks for a line. `selected_color` and
/// `selected_weight` are part of the cart line identity; the two production
/// colours are not.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Customization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upholstery_color: Option<String>,
}

/// One order line with its equipment and price frozen at purchase time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub equipment: Equipment,
    pub quantity: u32,
    pub price_at_purchase: i64,
    #[serde(flatten)]
    pub customization: Customization,
    #[serde(default)]
    pub delivery_status: DeliveryStatus,
}

impl OrderItem {
    pub fn line_total(&self) -> i64 {
        self.price_at_purchase * i64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub financials: Financials,
    pub items: Vec<OrderItem>,
    /// Newest first.
    pub status_history: Vec<StatusHistoryEntry>,
    #[serde(default)]
    pub assigned_transporter_id: Option<Uuid>,
    pub customer_info: CustomerInfo,
    #[serde(default)]
    pub production_details: Option<ProductionDetails>,
    #[serde(default)]
    pub payment_proof_url: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Bumped on every persisted mutation; writers must present the version
    /// they read.
    #[serde(default)]
    pub version: i64,
}

impl Order {
    /// Six-character reference shown to customers.
    pub fn short_ref(&self) -> String {
        let simple = self.id.simple().to_string();
        simple[simple.len() - 6..].to_uppercase()
    }

    pub fn latest_history(&self) -> Option<&StatusHistoryEntry> {
        self.status_history.first()
    }

    pub fn is_assigned_to(&self, transporter_id: Uuid) -> bool {
        self.assigned_transporter_id == Some(transporter_id)
    }

    pub fn all_items_delivered(&self) -> bool {
        self.items
            .iter()
            .all(|i| i.delivery_status == DeliveryStatus::Delivered)
    }

    pub fn item(&self, index: usize) -> Option<&OrderItem> {
        self.items.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels_round_trip_through_from_str() {
        for status in OrderStatus::ALL {
            assert_eq!(status.label().parse::<OrderStatus>().unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.label()));
        }
        assert!("Perdido".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_progress_track() {
        assert_eq!(OrderStatus::PendingApproval.progress_step(), Some(0));
        assert_eq!(OrderStatus::Delivered.progress_step(), Some(5));
        assert_eq!(OrderStatus::Cancelled.progress_step(), None);
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(!OrderStatus::InTransit.is_terminal());
    }

    #[test]
    fn test_delivery_status_ordering() {
        assert!(DeliveryStatus::Pending < DeliveryStatus::Shipped);
        assert!(DeliveryStatus::Shipped < DeliveryStatus::Delivered);
        assert_eq!("shipped".parse::<DeliveryStatus>().unwrap(), DeliveryStatus::Shipped);
    }

    #[test]
    fn test_financial_balance() {
        let f = Financials { total_order_value: 300, amount_paid: 200, amount_pending: 100 };
        assert!(f.is_balanced());
        let broken = Financials { amount_pending: 50, ..f };
        assert!(!broken.is_balanced());
    }
}
