use async_trait::async_trait;
use sagfo_order::CustomerMessage;
use sagfo_shared::models::OrderEvent;

#[derive(Debug, thiserror::Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Outbound channel for customer messages and order events.
///
/// Delivery is best effort: callers log failures and carry on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &CustomerMessage) -> Result<(), NotifyError>;

    async fn publish(&self, event: &OrderEvent) -> Result<(), NotifyError>;
}

/// Writes everything to the log. Used when no messaging gateway is wired.
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send(&self, message: &CustomerMessage) -> Result<(), NotifyError> {
        tracing::info!(
            order_id = %message.order_id,
            phone = %message.phone,
            compose_url = message.compose_url.is_some(),
            "Customer message drafted"
        );
        Ok(())
    }

    async fn publish(&self, event: &OrderEvent) -> Result<(), NotifyError> {
        tracing::info!(order_id = %event.order_id(), kind = event.kind(), "Order event");
        Ok(())
    }
}
