use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// One remote dataset mirrored to a local file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSource {
    /// Local file name, also the catalog's key
    pub filename: String,
    pub url: String,
}

impl CatalogSource {
    pub fn new(filename: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            url: url.into(),
        }
    }

    /// Sibling file holding the last successful fetch as a millisecond epoch.
    pub fn timestamp_filename(&self) -> String {
        format!("{}_timestamp", self.filename)
    }

    /// Equipment, resources and consumables from the dofusdu.de API.
    pub fn defaults() -> Vec<CatalogSource> {
        vec![
            CatalogSource::new(
                "dofus_equipment.json",
                "https://api.dofusdu.de/dofus2/en/items/equipment/all",
            ),
            CatalogSource::new(
                "dofus_resources.json",
                "https://api.dofusdu.de/dofus2/en/items/resources/all",
            ),
            CatalogSource::new(
                "dofus_consumables.json",
                "https://api.dofusdu.de/dofus2/en/items/consumables/all",
            ),
        ]
    }
}

/// A game item. Everything besides id and name is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub ankama_id: i64,
    pub name: String,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl CatalogItem {
    pub fn new(ankama_id: i64, name: impl Into<String>) -> Self {
        Self {
            ankama_id,
            name: name.into(),
            attributes: serde_json::Map::new(),
        }
    }
}

/// `{ "items": [...] }`, both the API response body and the mirror file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogPayload {
    pub items: Vec<CatalogItem>,
}

impl CatalogPayload {
    pub fn from_value(value: serde_json::Value) -> Result<Self, CoreError> {
        serde_json::from_value(value)
            .map_err(|e| CoreError::Parse(format!("Invalid catalog payload: {e}")))
    }

    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        serde_json::from_str(text)
            .map_err(|e| CoreError::Parse(format!("Invalid catalog payload: {e}")))
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}

/// Freshness snapshot of one mirror.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogStatus {
    pub filename: String,
    pub item_count: usize,
    /// `None` until a fetch succeeded or a timestamp was loaded
    pub fetched_at: Option<DateTime<Utc>>,
}

impl CatalogStatus {
    pub fn age_minutes(&self) -> Option<i64> {
        self.fetched_at.map(|at| (Utc::now() - at).num_minutes())
    }

    pub fn age_display(&self) -> String {
        match self.age_minutes() {
            None => "never".to_string(),
            Some(m) if m < 1 => "just now".to_string(),
            Some(m) if m < 60 => format!("{m}m ago"),
            Some(m) if m < 1440 => format!("{}h ago", m / 60),
            Some(m) => format!("{}d ago", m / 1440),
        }
    }
}
