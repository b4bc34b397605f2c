pub mod equipment;
pub mod pricing;
pub mod query;

pub use equipment::{AvailabilityStatus, Category, Equipment, EquipmentError, MuscleGroup};
pub use pricing::PriceUpdate;
pub use query::{CatalogQuery, Comparison, SortOrder};
