use sagfo_catalog::Equipment;
use sagfo_order::checkout::{build_order, price_lines, validate_customization, validate_request, OrderDraft};
use sagfo_order::finance::{debts_report, overview, DebtsReport, Overview};
use sagfo_order::fulfillment::FullDelivery;
use sagfo_order::notification::{message_for, order_summary, payment_reminder};
use sagfo_order::{
    CustomerInfo, CustomerMessage, DeliveryStatus, DeliveryTracker, Order, OrderItem, OrderManager,
    OrderStatus, PaymentSplit, PaymentSplitCalculator, ProductionDetails,
};
use sagfo_shared::models::OrderEvent;
use sagfo_shared::time::now_micros;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::identity::{Actor, Role};
use crate::repository::{OrderFilter, OrderPatch};
use crate::site::BankAccount;
use crate::storage::{Upload, PAYMENT_PROOFS_FOLDER};
use crate::{BusinessRules, CoreError, CoreResult, Ports};

/// What the customer would pay for the current cart.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub items: Vec<OrderItem>,
    #[serde(flatten)]
    pub split: PaymentSplit,
    pub bank_accounts: Vec<BankAccount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub customer_info: CustomerInfo,
    #[serde(default)]
    pub production_details: Option<ProductionDetails>,
}

/// A transporter's orders, split by whether they are still on the road.
#[derive(Debug, Clone, Serialize)]
pub struct Shipments {
    pub active: Vec<Order>,
    pub history: Vec<Order>,
}

pub struct OrderService {
    ports: Ports,
    manager: OrderManager,
    calculator: PaymentSplitCalculator,
}

impl OrderService {
    pub fn new(ports: Ports, rules: BusinessRules) -> Self {
        Self {
            ports,
            manager: OrderManager::new(rules.status_transitions),
            calculator: PaymentSplitCalculator::new(rules.deposit_percent),
        }
    }

    async fn catalog(&self) -> CoreResult<Vec<Equipment>> {
        Ok(self.ports.equipment.list_equipment(false).await?)
    }

    fn split(&self, items: &[OrderItem]) -> CoreResult<PaymentSplit> {
        Ok(self
            .calculator
            .compute(items.iter().map(|i| (&i.equipment, i.quantity)))?)
    }

    pub async fn quote(&self, actor: &Actor) -> CoreResult<Quote> {
        let cart = self.ports.carts.load(actor.id).await?.unwrap_or_default();
        let items = price_lines(&cart, &self.catalog().await?)?;
        let split = self.split(&items)?;
        let bank_accounts = self.ports.site.get_site_config().await?.bank_accounts;
        Ok(Quote { items, split, bank_accounts })
    }

    /// Turns the actor's cart into an order awaiting approval.
    ///
    /// Everything that can be rejected is checked before the payment proof is
    /// uploaded. If the insert fails afterwards the proof is deleted again.
    pub async fn checkout(
        &self,
        actor: &Actor,
        request: CheckoutRequest,
        payment_proof: Option<Upload>,
    ) -> CoreResult<Order> {
        let cart = self.ports.carts.load(actor.id).await?.unwrap_or_default();
        let payment_proof = payment_proof.filter(|p| !p.bytes.is_empty());
        validate_request(&cart, &request.customer_info, payment_proof.is_some())?;

        let items = price_lines(&cart, &self.catalog().await?)?;
        validate_customization(&items)?;
        let split = self.split(&items)?;

        let Some(proof) = payment_proof else {
            return Err(CoreError::Validation("Payment proof is required".to_string()));
        };
        let proof_url = self.ports.storage.upload(proof, PAYMENT_PROOFS_FOLDER).await.map_err(|e| {
            error!(user_id = %actor.id, error = %e, "Payment proof upload failed");
            CoreError::from(e)
        })?;

        let draft = OrderDraft {
            user_id: actor.id,
            placed_by: actor.name.clone(),
            customer_info: request.customer_info,
            production_details: request.production_details,
            payment_proof_url: Some(proof_url.clone()),
        };
        let order = build_order(draft, items, split, now_micros());

        if let Err(e) = self.ports.orders.insert_order(&order).await {
            error!(order_id = %order.id, error = %e, "Order insert failed");
            if let Err(cleanup) = self.ports.storage.delete(&proof_url).await {
                warn!(url = %proof_url, error = %cleanup, "Failed to remove orphaned payment proof");
            }
            return Err(e.into());
        }

        if let Err(e) = self.ports.carts.clear(actor.id).await {
            warn!(user_id = %actor.id, error = %e, "Failed to clear cart after checkout");
        }
        info!(
            order_id = %order.id,
            total = order.financials.total_order_value,
            method = order.payment_method.as_str(),
            "Order placed"
        );
        self.publish(OrderEvent::OrderPlaced {
            order_id: order.id,
            user_id: order.user_id,
            total_order_value: order.financials.total_order_value,
            amount_paid: order.financials.amount_paid,
            amount_pending: order.financials.amount_pending,
            payment_method: order.payment_method.as_str().to_string(),
            timestamp: order.created_at,
        })
        .await;
        Ok(order)
    }

    async fn load(&self, id: Uuid) -> CoreResult<Order> {
        self.ports
            .orders
            .get_order(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("order {id}")))
    }

    fn can_read(actor: &Actor, order: &Order) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Transporter => order.is_assigned_to(actor.id),
            Role::Customer => order.user_id == actor.id,
        }
    }

    /// Admins act on every order; transporters only on their own.
    fn check_write(actor: &Actor, order: &Order) -> CoreResult<()> {
        actor.require_any(&[Role::Admin, Role::Transporter])?;
        if actor.is_transporter() && !order.is_assigned_to(actor.id) {
            warn!(order_id = %order.id, transporter = %actor.id, "Write on unassigned order rejected");
            return Err(CoreError::Forbidden(format!(
                "order {} is not assigned to this transporter",
                order.id
            )));
        }
        Ok(())
    }

    async fn load_for_write(&self, actor: &Actor, id: Uuid) -> CoreResult<Order> {
        let order = self.load(id).await?;
        Self::check_write(actor, &order)?;
        Ok(order)
    }

    /// Writes the mutable part of `updated` conditioned on the version of
    /// `loaded`.
    async fn persist(&self, loaded: &Order, updated: &Order) -> CoreResult<Order> {
        self.ports
            .orders
            .update_order(loaded.id, loaded.version, &OrderPatch::from(updated))
            .await
            .map_err(|e| {
                match &e {
                    crate::RepositoryError::Conflict(_) => {
                        warn!(order_id = %loaded.id, version = loaded.version, "Stale order write rejected")
                    }
                    _ => error!(order_id = %loaded.id, error = %e, "Order update failed"),
                }
                CoreError::from(e)
            })
    }

    async fn publish(&self, event: OrderEvent) {
        if let Err(e) = self.ports.notifier.publish(&event).await {
            warn!(order_id = %event.order_id(), kind = event.kind(), error = %e, "Event publication failed");
        }
    }

    async fn send(&self, message: CustomerMessage) {
        if let Err(e) = self.ports.notifier.send(&message).await {
            warn!(order_id = %message.order_id, error = %e, "Customer message failed");
        }
    }

    pub async fn get_order(&self, actor: &Actor, id: Uuid) -> CoreResult<Order> {
        let order = self.load(id).await?;
        if !Self::can_read(actor, &order) {
            return Err(CoreError::Forbidden(format!("order {id} belongs to someone else")));
        }
        Ok(order)
    }

    /// Customers see their own orders, transporters the ones assigned to
    /// them, admins whatever the filter selects.
    pub async fn list_orders(&self, actor: &Actor, mut filter: OrderFilter) -> CoreResult<Vec<Order>> {
        match actor.role {
            Role::Admin => {}
            Role::Transporter => filter.assigned_transporter_id = Some(actor.id),
            Role::Customer => filter.user_id = Some(actor.id),
        }
        Ok(self.ports.orders.list_orders(&filter).await?)
    }

    /// Orders assigned to the transporter: still moving, and delivered.
    pub async fn shipments(&self, actor: &Actor, status: Option<OrderStatus>) -> CoreResult<Shipments> {
        actor.require_any(&[Role::Transporter])?;
        let orders = self
            .list_orders(actor, OrderFilter { status, ..Default::default() })
            .await?;
        let (history, active): (Vec<Order>, Vec<Order>) = orders
            .into_iter()
            .partition(|o| o.status == OrderStatus::Delivered);
        Ok(Shipments { active, history })
    }

    /// Sets the order status and prepends the history entry in one
    /// conditional write. With `expected_status`, the update only applies if
    /// the order is still in that status.
    pub async fn update_status(
        &self,
        actor: &Actor,
        id: Uuid,
        new_status: OrderStatus,
        note: Option<String>,
        expected_status: Option<OrderStatus>,
    ) -> CoreResult<Order> {
        let loaded = self.load_for_write(actor, id).await?;
        if let Some(expected) = expected_status {
            if loaded.status != expected {
                warn!(order_id = %id, expected = %expected, actual = %loaded.status, "Status precondition not met");
                return Err(CoreError::Conflict(format!(
                    "order {id} is '{}', expected '{expected}'",
                    loaded.status
                )));
            }
        }

        let mut updated = loaded.clone();
        let change = self
            .manager
            .apply_status(&mut updated, new_status, note, Some(actor.display_name()), now_micros())
            .map_err(|e| {
                warn!(order_id = %id, error = %e, "Status change rejected");
                CoreError::from(e)
            })?;
        let stored = self.persist(&loaded, &updated).await?;

        info!(order_id = %id, from = %change.from, to = %change.to, by = %actor.id, "Order status updated");
        self.publish(OrderEvent::OrderStatusChanged {
            order_id: id,
            from: change.from.label().to_string(),
            to: change.to.label().to_string(),
            note: change.entry.note.clone(),
            updated_by: change.entry.updated_by.clone(),
            timestamp: change.entry.date,
        })
        .await;
        if change.from != change.to && OrderManager::notifies_customer(change.to) {
            if let Some(message) = message_for(&stored, change.to) {
                self.send(message).await;
            }
        }
        Ok(stored)
    }

    /// Advances one line. Re-applying the current status returns the order
    /// without writing.
    pub async fn update_item_status(
        &self,
        actor: &Actor,
        id: Uuid,
        item_index: usize,
        new_status: DeliveryStatus,
    ) -> CoreResult<Order> {
        let loaded = self.load_for_write(actor, id).await?;
        let mut updated = loaded.clone();
        let transition = DeliveryTracker::update_item_status(&mut updated, item_index, new_status)
            .map_err(|e| {
                warn!(order_id = %id, item_index, error = %e, "Item status change rejected");
                CoreError::from(e)
            })?;
        if !transition.changed() {
            return Ok(loaded);
        }

        let stored = self.persist(&loaded, &updated).await?;
        info!(order_id = %id, item_index, to = new_status.as_str(), "Item delivery status updated");
        self.publish(OrderEvent::ItemDeliveryUpdated {
            order_id: id,
            item_index,
            from: transition.from.as_str().to_string(),
            to: transition.to.as_str().to_string(),
            timestamp: now_micros(),
        })
        .await;
        Ok(stored)
    }

    /// Marks every line delivered and the order `Entregado` in one write.
    pub async fn confirm_full_delivery(&self, actor: &Actor, id: Uuid) -> CoreResult<Order> {
        let loaded = self.load_for_write(actor, id).await?;
        let mut updated = loaded.clone();
        let outcome: FullDelivery = DeliveryTracker::confirm_full_delivery(
            &mut updated,
            &self.manager,
            Some(actor.display_name()),
            now_micros(),
        )
        .map_err(|e| {
            warn!(order_id = %id, error = %e, "Full delivery rejected");
            CoreError::from(e)
        })?;
        if !outcome.changed() {
            return Ok(loaded);
        }

        let stored = self.persist(&loaded, &updated).await?;
        info!(order_id = %id, items = outcome.items.len(), by = %actor.id, "Delivery confirmed");
        for item in &outcome.items {
            self.publish(OrderEvent::ItemDeliveryUpdated {
                order_id: id,
                item_index: item.index,
                from: item.from.as_str().to_string(),
                to: item.to.as_str().to_string(),
                timestamp: now_micros(),
            })
            .await;
        }
        if let Some(change) = outcome.status_change {
            self.publish(OrderEvent::OrderStatusChanged {
                order_id: id,
                from: change.from.label().to_string(),
                to: change.to.label().to_string(),
                note: change.entry.note,
                updated_by: change.entry.updated_by,
                timestamp: change.entry.date,
            })
            .await;
        }
        Ok(stored)
    }

    /// Binds the order to a transporter profile. Admin only.
    pub async fn assign_transporter(&self, actor: &Actor, id: Uuid, transporter_id: Uuid) -> CoreResult<Order> {
        actor.require_admin()?;
        let transporter = self
            .ports
            .users
            .get_user(transporter_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("user {transporter_id}")))?;
        if transporter.profile.role != Role::Transporter {
            return Err(CoreError::Validation(format!(
                "user {transporter_id} is a {}, not a transporter",
                transporter.profile.role
            )));
        }

        let loaded = self.load(id).await?;
        if loaded.is_assigned_to(transporter_id) {
            return Ok(loaded);
        }
        let mut updated = loaded.clone();
        let previous = self.manager.assign_transporter(&mut updated, transporter_id);
        let stored = self.persist(&loaded, &updated).await?;

        info!(order_id = %id, transporter = %transporter_id, previous = ?previous, "Transporter assigned");
        self.publish(OrderEvent::TransporterAssigned {
            order_id: id,
            transporter_id,
            timestamp: now_micros(),
        })
        .await;
        Ok(stored)
    }

    pub async fn summary(&self, actor: &Actor, id: Uuid) -> CoreResult<String> {
        actor.require_admin()?;
        Ok(order_summary(&self.load(id).await?))
    }

    /// Balance reminder for the customer, sent through the notifier.
    pub async fn remind_payment(&self, actor: &Actor, id: Uuid) -> CoreResult<CustomerMessage> {
        actor.require_admin()?;
        let order = self.load(id).await?;
        let message = payment_reminder(&order)
            .ok_or_else(|| CoreError::PreconditionFailed(format!("order {id} has no pending balance")))?;
        self.send(message.clone()).await;
        Ok(message)
    }

    pub async fn debts_report(&self, actor: &Actor) -> CoreResult<DebtsReport> {
        actor.require_admin()?;
        let orders = self.ports.orders.list_orders(&OrderFilter::default()).await?;
        Ok(debts_report(&orders, now_micros()))
    }

    pub async fn overview(&self, actor: &Actor) -> CoreResult<Overview> {
        actor.require_admin()?;
        let orders = self.ports.orders.list_orders(&OrderFilter::default()).await?;
        let products = self.ports.equipment.list_equipment(false).await?.len();
        let users = self.ports.users.list_users().await?.len();
        Ok(overview(&orders, products, users))
    }
}
