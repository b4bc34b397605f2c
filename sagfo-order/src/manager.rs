use crate::models::{Order, OrderStatus, StatusHistoryEntry};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which status edges an admin or transporter may take.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    /// Forward along the progress track (skipping allowed), re-asserting the
    /// current status to attach a note, or leaving to Rechazado/Cancelado
    /// from any non-terminal status.
    #[default]
    Strict,
    /// Any status from any status.
    Free,
}

impl TransitionPolicy {
    pub fn allows(&self, from: OrderStatus, to: OrderStatus) -> bool {
        match self {
            TransitionPolicy::Free => true,
            TransitionPolicy::Strict => {
                if from == to {
                    return true;
                }
                if from.is_terminal() {
                    return false;
                }
                if matches!(to, OrderStatus::Rejected | OrderStatus::Cancelled) {
                    return true;
                }
                match (from.progress_step(), to.progress_step()) {
                    (Some(a), Some(b)) => b > a,
                    _ => false,
                }
            }
        }
    }
}

/// What a status update did, for logging and event publication.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub entry: StatusHistoryEntry,
}

/// Applies admin and transporter requested changes to an order value.
///
/// Nothing here persists; callers write the mutated order back in a single
/// conditional update.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderManager {
    policy: TransitionPolicy,
}

impl OrderManager {
    pub fn new(policy: TransitionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Checks the edge without touching the order.
    pub fn check_transition(&self, order: &Order, new_status: OrderStatus) -> Result<(), OrderError> {
        if !self.policy.allows(order.status, new_status) {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: new_status,
            });
        }
        Ok(())
    }

    /// Sets `status` and prepends the matching history entry in one step.
    ///
    /// The entry date never goes backwards relative to the previous head, so
    /// the history stays in strict reverse-chronological order even when two
    /// updates land within the same clock tick.
    pub fn apply_status(
        &self,
        order: &mut Order,
        new_status: OrderStatus,
        note: Option<String>,
        updated_by: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<StatusChange, OrderError> {
        self.check_transition(order, new_status)?;

        let date = match order.latest_history() {
            Some(head) if at <= head.date => head.date + Duration::microseconds(1),
            _ => at,
        };
        let entry = StatusHistoryEntry {
            status: new_status,
            note: note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            date,
            updated_by,
        };

        let from = order.status;
        order.status = new_status;
        order.status_history.insert(0, entry.clone());

        Ok(StatusChange {
            from,
            to: new_status,
            entry,
        })
    }

    /// Binds the order to a transporter. Returns the previous assignment.
    pub fn assign_transporter(&self, order: &mut Order, transporter_id: Uuid) -> Option<Uuid> {
        order.assigned_transporter_id.replace(transporter_id)
    }

    /// Statuses that warrant a message to the customer.
    pub fn notifies_customer(status: OrderStatus) -> bool {
        matches!(status, OrderStatus::Received | OrderStatus::InTransit)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum OrderError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order item not found at index {0}")]
    ItemNotFound(usize),

    #[error("Item {index} cannot be dispatched: {reason}")]
    DispatchBlocked { index: usize, reason: String },

    #[error("Item {index} cannot move back from {from} to {to}")]
    DeliveryRegression {
        index: usize,
        from: crate::models::DeliveryStatus,
        to: crate::models::DeliveryStatus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_order;

    #[test]
    fn test_strict_policy_moves_forward_only() {
        let policy = TransitionPolicy::Strict;
        assert!(policy.allows(OrderStatus::PendingApproval, OrderStatus::Received));
        assert!(policy.allows(OrderStatus::Received, OrderStatus::Dispatched));
        assert!(policy.allows(OrderStatus::Received, OrderStatus::Received));
        assert!(policy.allows(OrderStatus::InDevelopment, OrderStatus::Cancelled));
        assert!(!policy.allows(OrderStatus::Dispatched, OrderStatus::Received));
        assert!(!policy.allows(OrderStatus::Delivered, OrderStatus::Cancelled));
        assert!(!policy.allows(OrderStatus::Cancelled, OrderStatus::Received));
    }

    #[test]
    fn test_free_policy_allows_anything() {
        let policy = TransitionPolicy::Free;
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                assert!(policy.allows(from, to));
            }
        }
    }

    #[test]
    fn test_apply_status_prepends_history() {
        let manager = OrderManager::default();
        let mut order = sample_order(&[]);
        let before = order.status_history.len();

        let change = manager
            .apply_status(
                &mut order,
                OrderStatus::Received,
                Some("  Pago verificado ".to_string()),
                Some("Admin".to_string()),
                Utc::now(),
            )
            .unwrap();

        assert_eq!(change.from, OrderStatus::PendingApproval);
        assert_eq!(order.status, OrderStatus::Received);
        assert_eq!(order.status_history.len(), before + 1);
        assert_eq!(order.status_history[0], change.entry);
        assert_eq!(order.status_history[0].note.as_deref(), Some("Pago verificado"));
    }

    #[test]
    fn test_rejected_transition_leaves_order_untouched() {
        let manager = OrderManager::new(TransitionPolicy::Strict);
        let mut order = sample_order(&[]);
        order.status = OrderStatus::Dispatched;
        let snapshot = order.clone();

        let err = manager
            .apply_status(&mut order, OrderStatus::Received, None, None, Utc::now())
            .unwrap_err();

        assert_eq!(
            err,
            OrderError::InvalidTransition { from: OrderStatus::Dispatched, to: OrderStatus::Received }
        );
        assert_eq!(order, snapshot);
    }

    #[test]
    fn test_history_is_strictly_reverse_chronological() {
        let manager = OrderManager::new(TransitionPolicy::Free);
        let mut order = sample_order(&[]);
        let frozen = order.created_at;
        let sequence = [
            OrderStatus::Received,
            OrderStatus::InDevelopment,
            OrderStatus::Dispatched,
            OrderStatus::InTransit,
        ];

        for status in sequence {
            manager.apply_status(&mut order, status, None, None, frozen).unwrap();
        }

        let newest_first: Vec<OrderStatus> =
            order.status_history.iter().take(sequence.len()).map(|e| e.status).collect();
        let mut expected = sequence.to_vec();
        expected.reverse();
        assert_eq!(newest_first, expected);
        assert!(order.status_history.windows(2).all(|w| w[0].date > w[1].date));
    }

    #[test]
    fn test_notification_statuses() {
        assert!(OrderManager::notifies_customer(OrderStatus::Received));
        assert!(OrderManager::notifies_customer(OrderStatus::InTransit));
        assert!(!OrderManager::notifies_customer(OrderStatus::Dispatched));
    }

    #[test]
    fn test_assign_transporter_returns_previous() {
        let manager = OrderManager::default();
        let mut order = sample_order(&[]);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        assert_eq!(manager.assign_transporter(&mut order, first), None);
        assert_eq!(manager.assign_transporter(&mut order, second), Some(first));
        assert!(order.is_assigned_to(second));
    }
}
