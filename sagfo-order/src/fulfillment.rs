use crate::manager::{OrderError, OrderManager, StatusChange};
use crate::models::{DeliveryStatus, Order, OrderItem, OrderStatus};
use chrono::{DateTime, Utc};

/// Outcome of a single-line delivery update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemTransition {
    pub index: usize,
    pub from: DeliveryStatus,
    pub to: DeliveryStatus,
}

impl ItemTransition {
    /// False when the line already had the requested status.
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Outcome of closing out a shipment.
#[derive(Debug, Clone, PartialEq)]
pub struct FullDelivery {
    pub items: Vec<ItemTransition>,
    /// `None` when the order was already delivered in full.
    pub status_change: Option<StatusChange>,
}

impl FullDelivery {
    pub fn changed(&self) -> bool {
        self.status_change.is_some() || self.items.iter().any(ItemTransition::changed)
    }
}

pub const FULL_DELIVERY_NOTE: &str = "Entrega confirmada por transportador.";

/// Advances per-line fulfilment state.
pub struct DeliveryTracker;

impl DeliveryTracker {
    /// A line may leave `pending` when it ships from stock, or when it is
    /// made to order and the order itself has already been dispatched.
    pub fn can_dispatch(item: &OrderItem, order_status: OrderStatus) -> bool {
        item.equipment.is_in_stock()
            || (item.equipment.is_made_to_order() && order_status.allows_made_to_order_dispatch())
    }

    fn check(order: &Order, index: usize, new_status: DeliveryStatus) -> Result<DeliveryStatus, OrderError> {
        let item = order.items.get(index).ok_or(OrderError::ItemNotFound(index))?;
        let current = item.delivery_status;

        if new_status < current {
            return Err(OrderError::DeliveryRegression {
                index,
                from: current,
                to: new_status,
            });
        }
        if current == DeliveryStatus::Pending
            && new_status > DeliveryStatus::Pending
            && !Self::can_dispatch(item, order.status)
        {
            return Err(OrderError::DispatchBlocked {
                index,
                reason: format!(
                    "'{}' is made to order and the order is still '{}'",
                    item.equipment.name, order.status
                ),
            });
        }
        Ok(current)
    }

    /// Moves one line forward. Re-applying the current status is a no-op.
    pub fn update_item_status(
        order: &mut Order,
        index: usize,
        new_status: DeliveryStatus,
    ) -> Result<ItemTransition, OrderError> {
        let from = Self::check(order, index, new_status)?;
        order.items[index].delivery_status = new_status;
        Ok(ItemTransition {
            index,
            from,
            to: new_status,
        })
    }

    /// Marks every remaining line delivered and the order `Entregado`, with a
    /// single history entry. Every precondition is checked before anything is
    /// changed, so on error the order is untouched.
    pub fn confirm_full_delivery(
        order: &mut Order,
        manager: &OrderManager,
        updated_by: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<FullDelivery, OrderError> {
        if order.status == OrderStatus::Delivered && order.all_items_delivered() {
            return Ok(FullDelivery {
                items: Vec::new(),
                status_change: None,
            });
        }

        for index in 0..order.items.len() {
            Self::check(order, index, DeliveryStatus::Delivered)?;
        }
        manager.check_transition(order, OrderStatus::Delivered)?;

        let items = order
            .items
            .iter_mut()
            .enumerate()
            .filter(|(_, item)| item.delivery_status != DeliveryStatus::Delivered)
            .map(|(index, item)| {
                let from = item.delivery_status;
                item.delivery_status = DeliveryStatus::Delivered;
                ItemTransition {
                    index,
                    from,
                    to: DeliveryStatus::Delivered,
                }
            })
            .collect();

        let status_change = manager.apply_status(
            order,
            OrderStatus::Delivered,
            Some(FULL_DELIVERY_NOTE.to_string()),
            updated_by,
            at,
        )?;

        Ok(FullDelivery {
            items,
            status_change: Some(status_change),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::TransitionPolicy;
    use crate::test_support::sample_order;
    use sagfo_catalog::{AvailabilityStatus, Category, Equipment};

    fn in_stock(name: &str) -> Equipment {
        Equipment::new(name, Category::Accesorios, AvailabilityStatus::InStock, 100)
    }

    fn made_to_order(name: &str) -> Equipment {
        Equipment::new(name, Category::Maquinaria, AvailabilityStatus::MadeToOrder, 1_000)
    }

    #[test]
    fn test_made_to_order_dispatch_waits_for_order_dispatch() {
        let mut order = sample_order(&[made_to_order("Jaula")]);
        order.status = OrderStatus::Received;

        let err = DeliveryTracker::update_item_status(&mut order, 0, DeliveryStatus::Shipped).unwrap_err();
        assert!(matches!(err, OrderError::DispatchBlocked { index: 0, .. }));
        assert_eq!(order.items[0].delivery_status, DeliveryStatus::Pending);

        order.status = OrderStatus::Dispatched;
        let t = DeliveryTracker::update_item_status(&mut order, 0, DeliveryStatus::Shipped).unwrap();
        assert!(t.changed());
        assert_eq!(order.items[0].delivery_status, DeliveryStatus::Shipped);
    }

    #[test]
    fn test_in_stock_ships_any_time() {
        let mut order = sample_order(&[in_stock("Disco 20 kg")]);
        DeliveryTracker::update_item_status(&mut order, 0, DeliveryStatus::Shipped).unwrap();
        DeliveryTracker::update_item_status(&mut order, 0, DeliveryStatus::Delivered).unwrap();
        assert_eq!(order.items[0].delivery_status, DeliveryStatus::Delivered);
    }

    #[test]
    fn test_repeat_delivered_is_noop() {
        let mut order = sample_order(&[in_stock("Barra Z")]);
        DeliveryTracker::update_item_status(&mut order, 0, DeliveryStatus::Delivered).unwrap();
        let second = DeliveryTracker::update_item_status(&mut order, 0, DeliveryStatus::Delivered).unwrap();

        assert!(!second.changed());
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].delivery_status, DeliveryStatus::Delivered);
    }

    #[test]
    fn test_regression_is_rejected() {
        let mut order = sample_order(&[in_stock("Banco")]);
        DeliveryTracker::update_item_status(&mut order, 0, DeliveryStatus::Shipped).unwrap();
        let err = DeliveryTracker::update_item_status(&mut order, 0, DeliveryStatus::Pending).unwrap_err();
        assert_eq!(
            err,
            OrderError::DeliveryRegression {
                index: 0,
                from: DeliveryStatus::Shipped,
                to: DeliveryStatus::Pending
            }
        );
    }

    #[test]
    fn test_unknown_index() {
        let mut order = sample_order(&[in_stock("Banco")]);
        let err = DeliveryTracker::update_item_status(&mut order, 3, DeliveryStatus::Shipped).unwrap_err();
        assert_eq!(err, OrderError::ItemNotFound(3));
    }

    #[test]
    fn test_full_delivery_marks_all_and_adds_one_entry() {
        let mut order = sample_order(&[in_stock("A"), in_stock("B"), in_stock("C")]);
        order.status = OrderStatus::InTransit;
        let history_before = order.status_history.len();

        let outcome = DeliveryTracker::confirm_full_delivery(
            &mut order,
            &OrderManager::default(),
            Some("Carlos (transportador)".to_string()),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(outcome.items.len(), 3);
        assert!(order.all_items_delivered());
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.status_history.len(), history_before + 1);
        assert_eq!(order.status_history[0].note.as_deref(), Some(FULL_DELIVERY_NOTE));
    }

    #[test]
    fn test_full_delivery_is_all_or_nothing() {
        let mut order = sample_order(&[in_stock("A"), made_to_order("Prensa")]);
        order.status = OrderStatus::InDevelopment;
        let snapshot = order.clone();

        let err = DeliveryTracker::confirm_full_delivery(
            &mut order,
            &OrderManager::new(TransitionPolicy::Strict),
            None,
            Utc::now(),
        )
        .unwrap_err();

        assert!(matches!(err, OrderError::DispatchBlocked { index: 1, .. }));
        assert_eq!(order, snapshot);
    }

    #[test]
    fn test_full_delivery_on_delivered_order_is_noop() {
        let mut order = sample_order(&[in_stock("A")]);
        let manager = OrderManager::default();
        DeliveryTracker::confirm_full_delivery(&mut order, &manager, None, Utc::now()).unwrap();
        let len = order.status_history.len();

        let again = DeliveryTracker::confirm_full_delivery(&mut order, &manager, None, Utc::now()).unwrap();
        assert!(!again.changed());
        assert_eq!(order.status_history.len(), len);
    }
}
