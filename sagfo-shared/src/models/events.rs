use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Domain events emitted after an order mutation has been persisted.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEvent {
    OrderPlaced {
        order_id: Uuid,
        user_id: Uuid,
        total_order_value: i64,
        amount_paid: i64,
        amount_pending: i64,
        payment_method: String,
        timestamp: DateTime<Utc>,
    },
    OrderStatusChanged {
        order_id: Uuid,
        from: String,
        to: String,
        note: Option<String>,
        updated_by: Option<String>,
        timestamp: DateTime<Utc>,
    },
    ItemDeliveryUpdated {
        order_id: Uuid,
        item_index: usize,
        from: String,
        to: String,
        timestamp: DateTime<Utc>,
    },
    TransporterAssigned {
        order_id: Uuid,
        transporter_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl OrderEvent {
    pub fn order_id(&self) -> Uuid {
        match self {
            OrderEvent::OrderPlaced { order_id, .. }
            | OrderEvent::OrderStatusChanged { order_id, .. }
            | OrderEvent::ItemDeliveryUpdated { order_id, .. }
            | OrderEvent::TransporterAssigned { order_id, .. } => *order_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced { .. } => "ORDER_PLACED",
            OrderEvent::OrderStatusChanged { .. } => "ORDER_STATUS_CHANGED",
            OrderEvent::ItemDeliveryUpdated { .. } => "ITEM_DELIVERY_UPDATED",
            OrderEvent::TransporterAssigned { .. } => "TRANSPORTER_ASSIGNED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_is_tagged_by_kind() {
        let event = OrderEvent::TransporterAssigned {
            order_id: Uuid::new_v4(),
            transporter_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.kind());
        assert_eq!(json["order_id"], serde_json::json!(event.order_id()));
    }
}
