use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One node of the discipline → field → specialization → sub-specialization taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub level_1_discipline: String,
    pub level_2_field: String,
    #[serde(default)]
    pub level_3_specialization: Option<String>,
    #[serde(default)]
    pub level_4_subspecialization: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Read-only view over the active categories, used to populate filter choices.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    categories: Vec<Category>,
}

impl Taxonomy {
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            categories: categories.into_iter().filter(|c| c.is_active).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Sorted unique disciplines.
    pub fn disciplines(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| c.level_1_discipline.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sorted unique fields under `discipline`.
    pub fn fields_for(&self, discipline: &str) -> Vec<String> {
        self.categories
            .iter()
            .filter(|c| c.level_1_discipline == discipline)
            .map(|c| c.level_2_field.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
