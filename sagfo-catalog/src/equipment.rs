use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Whether a piece of equipment ships from stock or is built on demand.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AvailabilityStatus {
    InStock,
    MadeToOrder,
}

impl AvailabilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::InStock => "in-stock",
            AvailabilityStatus::MadeToOrder => "made-to-order",
        }
    }
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AvailabilityStatus {
    type Err = EquipmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in-stock" => Ok(AvailabilityStatus::InStock),
            "made-to-order" => Ok(AvailabilityStatus::MadeToOrder),
            other => Err(EquipmentError::InvalidField(format!("availability_status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    Maquinaria,
    Accesorios,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Maquinaria => "Maquinaria",
            Category::Accesorios => "Accesorios",
        }
    }
}

impl FromStr for Category {
    type Err = EquipmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Maquinaria" => Ok(Category::Maquinaria),
            "Accesorios" => Ok(Category::Accesorios),
            other => Err(EquipmentError::InvalidField(format!("category '{}'", other))),
        }
    }
}

/// Muscle group / accessory family used by the catalog filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MuscleGroup {
    Pecho,
    Espalda,
    Pierna,
    Brazo,
    Hombro,
    Cardio,
    Abdomen,
    #[serde(rename = "Peso Libre")]
    PesoLibre,
    Funcional,
    General,
    Barras,
    Discos,
    Mancuernas,
    Bancos,
    Agarres,
    Soportes,
}

impl MuscleGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            MuscleGroup::Pecho => "Pecho",
            MuscleGroup::Espalda => "Espalda",
            MuscleGroup::Pierna => "Pierna",
            MuscleGroup::Brazo => "Brazo",
            MuscleGroup::Hombro => "Hombro",
            MuscleGroup::Cardio => "Cardio",
            MuscleGroup::Abdomen => "Abdomen",
            MuscleGroup::PesoLibre => "Peso Libre",
            MuscleGroup::Funcional => "Funcional",
            MuscleGroup::General => "General",
            MuscleGroup::Barras => "Barras",
            MuscleGroup::Discos => "Discos",
            MuscleGroup::Mancuernas => "Mancuernas",
            MuscleGroup::Bancos => "Bancos",
            MuscleGroup::Agarres => "Agarres",
            MuscleGroup::Soportes => "Soportes",
        }
    }
}

impl FromStr for MuscleGroup {
    type Err = EquipmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| EquipmentError::InvalidField(format!("muscle_group '{}'", s)))
    }
}

/// A catalog line: one machine or accessory the store sells.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Equipment {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub muscle_group: Option<MuscleGroup>,
    pub availability_status: AvailabilityStatus,
    pub price: i64,
    #[serde(default)]
    pub is_promotion: bool,
    #[serde(default)]
    pub promotional_price: Option<i64>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    #[serde(default)]
    pub available_colors: Vec<String>,
    #[serde(default)]
    pub available_weights: Vec<String>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl Equipment {
    pub fn new(
        name: impl Into<String>,
        category: Category,
        availability_status: AvailabilityStatus,
        price: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            category,
            muscle_group: None,
            availability_status,
            price,
            is_promotion: false,
            promotional_price: None,
            image_urls: Vec::new(),
            features: Vec::new(),
            specifications: BTreeMap::new(),
            available_colors: Vec::new(),
            available_weights: Vec::new(),
            is_deleted: false,
        }
    }

    pub fn is_in_stock(&self) -> bool {
        self.availability_status == AvailabilityStatus::InStock
    }

    pub fn is_made_to_order(&self) -> bool {
        self.availability_status == AvailabilityStatus::MadeToOrder
    }

    /// Checks the fields an admin must fill before the item can be saved.
    pub fn validate(&self) -> Result<(), EquipmentError> {
        if self.name.trim().is_empty() {
            return Err(EquipmentError::InvalidField("name must not be empty".to_string()));
        }
        if self.price < 0 {
            return Err(EquipmentError::InvalidField("price must not be negative".to_string()));
        }
        if let Some(promo) = self.promotional_price {
            if promo < 0 {
                return Err(EquipmentError::InvalidField(
                    "promotional_price must not be negative".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EquipmentError {
    #[error("Equipment not found: {0}")]
    NotFound(String),

    #[error("Invalid equipment field: {0}")]
    InvalidField(String),

    #[error("Too many items to compare: {requested} (max {max})")]
    TooManyToCompare { requested: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_wire_format() {
        let json = serde_json::to_string(&AvailabilityStatus::MadeToOrder).unwrap();
        assert_eq!(json, "\"made-to-order\"");
        assert_eq!("in-stock".parse::<AvailabilityStatus>().unwrap(), AvailabilityStatus::InStock);
        assert!("backorder".parse::<AvailabilityStatus>().is_err());
    }

    #[test]
    fn test_muscle_group_with_space_parses() {
        assert_eq!("Peso Libre".parse::<MuscleGroup>().unwrap(), MuscleGroup::PesoLibre);
        assert_eq!(MuscleGroup::PesoLibre.as_str(), "Peso Libre");
    }

    #[test]
    fn test_validate_rejects_blank_name_and_negative_price() {
        let mut item = Equipment::new("  ", Category::Maquinaria, AvailabilityStatus::InStock, 100);
        assert!(item.validate().is_err());

        item.name = "Prensa 45".to_string();
        item.price = -1;
        assert!(item.validate().is_err());

        item.price = 1_500_000;
        assert!(item.validate().is_ok());
    }
}
