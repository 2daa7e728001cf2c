use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::catalog::CatalogSource;

/// Configuration of the item catalog cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Remote datasets, in search/lookup priority order.
    pub sources: Vec<CatalogSource>,

    /// A mirror older than this is refetched.
    pub stale_after_hours: i64,

    /// File holding ingredient cost overrides.
    pub ingredient_costs_file: String,
}

impl CatalogSettings {
    pub fn stale_after(&self) -> Duration {
        Duration::hours(self.stale_after_hours)
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            sources: CatalogSource::defaults(),
            stale_after_hours: 24,
            ingredient_costs_file: "ingredient_costs.json".to_string(),
        }
    }
}
