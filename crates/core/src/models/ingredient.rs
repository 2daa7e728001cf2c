use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// User-supplied unit cost of a crafting ingredient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IngredientCost {
    pub cost: f64,
}

/// Ingredient name → cost override, persisted as a flat JSON object.
pub type IngredientCosts = BTreeMap<String, IngredientCost>;
