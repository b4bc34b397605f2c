use crate::equipment::{Category, Equipment, EquipmentError, MuscleGroup};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    Default,
    PriceAsc,
    PriceDesc,
}

/// Storefront listing parameters.
///
/// `muscle_group = None` is the "Todos" option of the storefront.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub muscle_group: Option<MuscleGroup>,
    #[serde(default)]
    pub sort: SortOrder,
}

impl CatalogQuery {
    pub fn matches(&self, item: &Equipment) -> bool {
        if item.is_deleted {
            return false;
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            if !item.name.to_lowercase().contains(&term.to_lowercase()) {
                return false;
            }
        }
        if let Some(category) = self.category {
            if item.category != category {
                return false;
            }
        }
        if let Some(group) = self.muscle_group {
            if item.muscle_group != Some(group) {
                return false;
            }
        }
        true
    }

    /// Filters and sorts. Sorting is stable so `Default` keeps store order.
    pub fn apply(&self, items: Vec<Equipment>) -> Vec<Equipment> {
        let mut result: Vec<Equipment> = items.into_iter().filter(|i| self.matches(i)).collect();
        match self.sort {
            SortOrder::Default => {}
            SortOrder::PriceAsc => result.sort_by_key(|i| i.price),
            SortOrder::PriceDesc => result.sort_by_key(|i| std::cmp::Reverse(i.price)),
        }
        result
    }
}

/// Items currently on promotion.
pub fn promotions(items: Vec<Equipment>) -> Vec<Equipment> {
    items
        .into_iter()
        .filter(|i| !i.is_deleted && i.has_discount())
        .collect()
}

/// Side-by-side view of a few catalog items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub items: Vec<Equipment>,
    /// One row per specification key present on any item, with each item's
    /// value in the same order as `items`.
    pub rows: Vec<ComparisonRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonRow {
    pub key: String,
    pub values: Vec<Option<String>>,
}

impl Comparison {
    pub fn build(items: Vec<Equipment>, max_items: usize) -> Result<Self, EquipmentError> {
        if items.len() > max_items {
            return Err(EquipmentError::TooManyToCompare {
                requested: items.len(),
                max: max_items,
            });
        }

        let keys: BTreeSet<&String> = items.iter().flat_map(|i| i.specifications.keys()).collect();
        let rows = keys
            .into_iter()
            .map(|key| ComparisonRow {
                key: key.clone(),
                values: items.iter().map(|i| i.specifications.get(key).cloned()).collect(),
            })
            .collect();

        Ok(Self { items, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equipment::AvailabilityStatus;

    fn item(name: &str, category: Category, group: Option<MuscleGroup>, price: i64) -> Equipment {
        let mut e = Equipment::new(name, category, AvailabilityStatus::InStock, price);
        e.muscle_group = group;
        e
    }

    fn sample() -> Vec<Equipment> {
        vec![
            item("Prensa de Pierna", Category::Maquinaria, Some(MuscleGroup::Pierna), 5_000),
            item("Polea Alta", Category::Maquinaria, Some(MuscleGroup::Espalda), 3_000),
            item("Disco Olímpico", Category::Accesorios, Some(MuscleGroup::Discos), 200),
        ]
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let query = CatalogQuery {
            search: Some("PRENSA".to_string()),
            ..Default::default()
        };
        let result = query.apply(sample());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "Prensa de Pierna");
    }

    #[test]
    fn test_category_and_muscle_filters() {
        let query = CatalogQuery {
            category: Some(Category::Maquinaria),
            muscle_group: Some(MuscleGroup::Espalda),
            ..Default::default()
        };
        let result = query.apply(sample());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "Polea Alta");
    }

    #[test]
    fn test_sorting_and_deleted_exclusion() {
        let mut items = sample();
        items[1].is_deleted = true;

        let asc = CatalogQuery { sort: SortOrder::PriceAsc, ..Default::default() }.apply(items.clone());
        assert_eq!(asc.iter().map(|i| i.price).collect::<Vec<_>>(), vec![200, 5_000]);

        let desc = CatalogQuery { sort: SortOrder::PriceDesc, ..Default::default() }.apply(items);
        assert_eq!(desc.iter().map(|i| i.price).collect::<Vec<_>>(), vec![5_000, 200]);
    }

    #[test]
    fn test_comparison_rows_cover_all_keys() {
        let mut a = sample().remove(0);
        a.specifications.insert("Peso".to_string(), "180 kg".to_string());
        let mut b = sample().remove(1);
        b.specifications.insert("Altura".to_string(), "2.1 m".to_string());
        b.specifications.insert("Peso".to_string(), "150 kg".to_string());

        let cmp = Comparison::build(vec![a, b], 2).unwrap();
        assert_eq!(cmp.rows.len(), 2);
        assert_eq!(cmp.rows[0].key, "Altura");
        assert_eq!(cmp.rows[0].values, vec![None, Some("2.1 m".to_string())]);
        assert_eq!(cmp.rows[1].values, vec![Some("180 kg".to_string()), Some("150 kg".to_string())]);
    }

    #[test]
    fn test_comparison_limit() {
        let err = Comparison::build(sample(), 2).unwrap_err();
        assert_eq!(err, EquipmentError::TooManyToCompare { requested: 3, max: 2 });
    }
}
