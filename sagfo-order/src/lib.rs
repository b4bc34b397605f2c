pub mod models;
pub mod cart;
pub mod finance;
pub mod checkout;
pub mod manager;
pub mod fulfillment;
pub mod notification;

pub use models::{
    CustomerInfo, Customization, DeliveryStatus, Financials, Order, OrderItem, OrderStatus,
    PaymentMethod, ProductionDetails, StatusHistoryEntry,
};
pub use cart::{Cart, CartError, CartLine, LineKey, MAX_LINE_QUANTITY};
pub use finance::{PaymentSplit, PaymentSplitCalculator};
pub use checkout::CheckoutError;
pub use manager::{OrderError, OrderManager, TransitionPolicy};
pub use fulfillment::{DeliveryTracker, FullDelivery, ItemTransition};
pub use notification::CustomerMessage;

#[cfg(test)]
pub(crate) mod test_support;
