pub mod repository;
pub mod storage;
pub mod notify;
pub mod identity;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod accounts;
pub mod site;
pub mod memory;

use std::sync::Arc;

use sagfo_catalog::EquipmentError;
use sagfo_order::{CartError, CheckoutError, OrderError, TransitionPolicy};

pub use accounts::AccountService;
pub use cart::{CartCache, CartService};
pub use catalog::CatalogService;
pub use identity::{Actor, Profile, Role};
pub use notify::{LoggingNotifier, Notifier};
pub use orders::OrderService;
pub use repository::{
    EquipmentRepository, OrderRepository, RepositoryError, SiteConfigRepository, UserRepository,
};
pub use site::SiteService;
pub use storage::{ObjectStorage, StorageError, Upload};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<RepositoryError> for CoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => CoreError::NotFound(what),
            RepositoryError::Conflict(what) => CoreError::Conflict(what),
            RepositoryError::Backend(msg) => CoreError::Persistence(msg),
        }
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        CoreError::Storage(err.to_string())
    }
}

impl From<EquipmentError> for CoreError {
    fn from(err: EquipmentError) -> Self {
        match err {
            EquipmentError::NotFound(_) => CoreError::NotFound(err.to_string()),
            EquipmentError::InvalidField(_) | EquipmentError::TooManyToCompare { .. } => {
                CoreError::Validation(err.to_string())
            }
        }
    }
}

impl From<CartError> for CoreError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::LineNotFound(_) => CoreError::NotFound(err.to_string()),
            CartError::QuantityTooLarge { .. } => CoreError::Validation(err.to_string()),
        }
    }
}

impl From<CheckoutError> for CoreError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::UnknownEquipment(_) => CoreError::NotFound(err.to_string()),
            _ => CoreError::Validation(err.to_string()),
        }
    }
}

impl From<OrderError> for CoreError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::ItemNotFound(_) => CoreError::NotFound(err.to_string()),
            OrderError::InvalidTransition { .. }
            | OrderError::DispatchBlocked { .. }
            | OrderError::DeliveryRegression { .. } => CoreError::PreconditionFailed(err.to_string()),
        }
    }
}

/// Tunables read from the `business_rules` configuration section.
#[derive(Debug, Clone, Copy)]
pub struct BusinessRules {
    pub status_transitions: TransitionPolicy,
    pub deposit_percent: u8,
    pub max_compare_items: usize,
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            status_transitions: TransitionPolicy::Strict,
            deposit_percent: 50,
            max_compare_items: 2,
        }
    }
}

/// Every outbound collaborator the services need, as trait objects.
#[derive(Clone)]
pub struct Ports {
    pub equipment: Arc<dyn EquipmentRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub users: Arc<dyn UserRepository>,
    pub site: Arc<dyn SiteConfigRepository>,
    pub carts: Arc<dyn CartCache>,
    pub storage: Arc<dyn ObjectStorage>,
    pub notifier: Arc<dyn Notifier>,
}

impl Ports {
    /// Wires every port to the in-process adapters.
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::default());
        Self {
            equipment: store.clone(),
            orders: store.clone(),
            users: store.clone(),
            site: store.clone(),
            carts: store,
            storage: Arc::new(memory::MemoryObjectStorage::default()),
            notifier: Arc::new(LoggingNotifier),
        }
    }
}

/// The services the HTTP layer talks to.
#[derive(Clone)]
pub struct Services {
    pub orders: Arc<OrderService>,
    pub catalog: Arc<CatalogService>,
    pub accounts: Arc<AccountService>,
    pub site: Arc<SiteService>,
    pub carts: Arc<CartService>,
}

impl Services {
    pub fn new(ports: Ports, rules: BusinessRules, bcrypt_cost: u32) -> Self {
        Self {
            orders: Arc::new(OrderService::new(ports.clone(), rules)),
            catalog: Arc::new(CatalogService::new(
                ports.equipment.clone(),
                ports.storage.clone(),
                rules.max_compare_items,
            )),
            accounts: Arc::new(AccountService::new(ports.users.clone(), bcrypt_cost)),
            site: Arc::new(SiteService::new(ports.site.clone(), ports.storage.clone())),
            carts: Arc::new(CartService::new(ports.carts.clone(), ports.equipment.clone())),
        }
    }
}
