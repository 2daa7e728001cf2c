use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::errors::CoreError;
use crate::models::catalog::{CatalogItem, CatalogPayload, CatalogSource, CatalogStatus};
use crate::models::ingredient::{IngredientCost, IngredientCosts};
use crate::models::settings::CatalogSettings;
use crate::providers::traits::HttpClient;
use crate::storage::traits::FileStorage;

/// In-memory state of one mirrored catalog.
#[derive(Debug, Clone)]
struct CatalogMirror {
    source: CatalogSource,
    items: Vec<CatalogItem>,
    fetched_at: Option<DateTime<Utc>>,
}

impl CatalogMirror {
    fn new(source: CatalogSource) -> Self {
        Self {
            source,
            items: Vec::new(),
            fetched_at: None,
        }
    }
}

/// Local mirror of the remote item catalogs plus ingredient cost overrides.
///
/// Cache strategy:
/// - A mirror is **fresh** for `stale_after` (24 h by default) after its last
///   successful fetch and is then served from the local file.
/// - A missing, unreadable or expired timestamp means **stale**: the whole
///   dataset is refetched.
/// - A failed refetch changes nothing, neither on disk nor in memory. If no
///   items were loaded yet, the expired mirror on disk is served instead and
///   the error is still returned.
///
/// Refreshing needs `&mut self`, so two refreshes of the same catalog can
/// never overlap. `initialize` still refreshes distinct catalogs concurrently.
pub struct ItemCatalogCache<S: FileStorage, H: HttpClient> {
    storage: S,
    http: H,
    settings: CatalogSettings,
    mirrors: Vec<CatalogMirror>,
    ingredient_costs: IngredientCosts,
}

impl<S: FileStorage, H: HttpClient> ItemCatalogCache<S, H> {
    pub fn new(storage: S, http: H, settings: CatalogSettings) -> Self {
        let mirrors = settings
            .sources
            .iter()
            .cloned()
            .map(CatalogMirror::new)
            .collect();
        Self {
            storage,
            http,
            settings,
            mirrors,
            ingredient_costs: IngredientCosts::new(),
        }
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Bring every catalog mirror up to date and load ingredient costs.
    ///
    /// Fails with `CoreError::Initialization` if the data directory cannot be
    /// prepared. Otherwise every catalog gets its refresh attempt; the first
    /// failure in declaration order is returned.
    pub async fn initialize(&mut self) -> Result<(), CoreError> {
        self.storage.prepare().await.map_err(|e| match e {
            CoreError::Initialization(_) => e,
            other => CoreError::Initialization(other.to_string()),
        })?;

        let storage = &self.storage;
        let http = &self.http;
        let stale_after = self.settings.stale_after();

        let results = join_all(
            self.mirrors
                .iter_mut()
                .map(|mirror| ensure_fresh(storage, http, mirror, stale_after)),
        )
        .await;

        self.load_ingredient_costs().await;

        results.into_iter().collect::<Result<Vec<()>, CoreError>>()?;
        Ok(())
    }

    /// Refetch one catalog regardless of its age.
    pub async fn refresh_catalog(&mut self, filename: &str) -> Result<(), CoreError> {
        let mirror = self
            .mirrors
            .iter_mut()
            .find(|m| m.source.filename == filename)
            .ok_or_else(|| CoreError::UnknownCatalog(filename.to_string()))?;
        refresh(&self.storage, &self.http, mirror).await
    }

    /// Items whose name contains `term` (case-insensitive), catalog by
    /// catalog in declaration order. The same item may appear twice if two
    /// catalogs carry it.
    pub fn search_items(&self, term: &str) -> Vec<&CatalogItem> {
        let needle = term.to_lowercase();
        self.mirrors
            .iter()
            .flat_map(|m| m.items.iter())
            .filter(|item| item.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// First item with this id, searching catalogs in declaration order.
    pub fn get_item_by_id(&self, ankama_id: i64) -> Option<&CatalogItem> {
        self.mirrors
            .iter()
            .flat_map(|m| m.items.iter())
            .find(|item| item.ankama_id == ankama_id)
    }

    /// Items currently loaded for one catalog.
    pub fn catalog_items(&self, filename: &str) -> Option<&[CatalogItem]> {
        self.mirrors
            .iter()
            .find(|m| m.source.filename == filename)
            .map(|m| m.items.as_slice())
    }

    pub fn statuses(&self) -> Vec<CatalogStatus> {
        self.mirrors
            .iter()
            .map(|m| CatalogStatus {
                filename: m.source.filename.clone(),
                item_count: m.items.len(),
                fetched_at: m.fetched_at,
            })
            .collect()
    }

    // ── Ingredient costs ────────────────────────────────────────────

    /// Override cost for `name`, 0.0 when none was set.
    pub fn get_ingredient_cost(&self, name: &str) -> f64 {
        self.ingredient_costs.get(name).map_or(0.0, |c| c.cost)
    }

    pub fn ingredient_costs(&self) -> &IngredientCosts {
        &self.ingredient_costs
    }

    /// Set the override for `name` and write the full map to disk.
    /// If the write fails the previous value is restored.
    pub async fn set_ingredient_cost(&mut self, name: &str, cost: f64) -> Result<(), CoreError> {
        if !cost.is_finite() {
            return Err(CoreError::Validation(format!(
                "Invalid cost for {name}: {cost}"
            )));
        }

        let previous = self
            .ingredient_costs
            .insert(name.to_string(), IngredientCost { cost });

        if let Err(e) = self.save_ingredient_costs().await {
            match previous {
                Some(old) => self.ingredient_costs.insert(name.to_string(), old),
                None => self.ingredient_costs.remove(name),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Reload overrides from disk. A missing file means no overrides. An
    /// unreadable or corrupt one is logged and the overrides already held
    /// are kept, so the result is only empty on a first load.
    pub async fn load_ingredient_costs(&mut self) -> &IngredientCosts {
        let path = self.settings.ingredient_costs_file.clone();
        match self.read_ingredient_costs(&path).await {
            Ok(costs) => self.ingredient_costs = costs,
            Err(e) => {
                warn!(
                    file = %path,
                    error = %e,
                    kept = self.ingredient_costs.len(),
                    "Failed to load ingredient costs, keeping current overrides"
                );
            }
        }
        &self.ingredient_costs
    }

    async fn read_ingredient_costs(&self, path: &str) -> Result<IngredientCosts, CoreError> {
        if !self.storage.exists(path).await? {
            return Ok(IngredientCosts::new());
        }
        let text = self.storage.read_text(path).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn save_ingredient_costs(&self) -> Result<(), CoreError> {
        let text = serde_json::to_string(&self.ingredient_costs)
            .map_err(|e| CoreError::Serialization(e.to_string()))?;
        self.storage
            .write_text(&self.settings.ingredient_costs_file, &text)
            .await
    }
}

/// Serve a mirror from disk if fresh, otherwise refetch it.
async fn ensure_fresh<S: FileStorage, H: HttpClient>(
    storage: &S,
    http: &H,
    mirror: &mut CatalogMirror,
    stale_after: Duration,
) -> Result<(), CoreError> {
    match fresh_timestamp(storage, &mirror.source, stale_after).await {
        Some(fetched_at) => {
            let text = storage.read_text(&mirror.source.filename).await?;
            let payload = CatalogPayload::from_json(&text).inspect_err(|e| {
                warn!(catalog = %mirror.source.filename, error = %e, "Local mirror is corrupt");
            })?;
            debug!(
                catalog = %mirror.source.filename,
                items = payload.items.len(),
                "Loaded catalog from local mirror"
            );
            mirror.items = payload.items;
            mirror.fetched_at = Some(fetched_at);
            Ok(())
        }
        None => {
            let result = refresh(storage, http, mirror).await;
            if result.is_err() && mirror.items.is_empty() {
                load_stale_fallback(storage, mirror).await;
            }
            result
        }
    }
}

/// After a failed refetch, serve whatever the last successful fetch left
/// on disk. The refetch error is still reported by the caller.
async fn load_stale_fallback<S: FileStorage>(storage: &S, mirror: &mut CatalogMirror) {
    let filename = &mirror.source.filename;
    let text = match storage.exists(filename).await {
        Ok(true) => storage.read_text(filename).await,
        _ => return,
    };
    match text.and_then(|t| CatalogPayload::from_json(&t)) {
        Ok(payload) => {
            warn!(catalog = %filename, items = payload.items.len(), "Serving stale mirror");
            mirror.fetched_at = read_timestamp(storage, &mirror.source.timestamp_filename())
                .await
                .ok();
            mirror.items = payload.items;
        }
        Err(e) => {
            debug!(catalog = %filename, error = %e, "No usable stale mirror");
        }
    }
}

/// Time of the last successful fetch if the mirror is still fresh, `None`
/// if it must be refetched. Any problem reading the files counts as stale.
async fn fresh_timestamp<S: FileStorage>(
    storage: &S,
    source: &CatalogSource,
    stale_after: Duration,
) -> Option<DateTime<Utc>> {
    let ts_path = source.timestamp_filename();

    let both_exist = async {
        Ok::<bool, CoreError>(
            storage.exists(&source.filename).await? && storage.exists(&ts_path).await?,
        )
    };
    match both_exist.await {
        Ok(true) => {}
        Ok(false) => {
            debug!(catalog = %source.filename, "No local mirror");
            return None;
        }
        Err(e) => {
            warn!(catalog = %source.filename, error = %e, "Cannot check mirror, treating as stale");
            return None;
        }
    }

    let fetched_at = match read_timestamp(storage, &ts_path).await {
        Ok(at) => at,
        Err(e) => {
            warn!(catalog = %source.filename, error = %e, "Unreadable timestamp, treating as stale");
            return None;
        }
    };

    let age = Utc::now().timestamp_millis() - fetched_at.timestamp_millis();
    if age > stale_after.num_milliseconds() {
        debug!(catalog = %source.filename, age_ms = age, "Mirror is stale");
        None
    } else {
        Some(fetched_at)
    }
}

async fn read_timestamp<S: FileStorage>(
    storage: &S,
    path: &str,
) -> Result<DateTime<Utc>, CoreError> {
    let text = storage.read_text(path).await?;
    let millis: i64 = text
        .trim()
        .parse()
        .map_err(|e| CoreError::Parse(format!("Invalid timestamp {:?}: {e}", text.trim())))?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| CoreError::Parse(format!("Timestamp out of range: {millis}")))
}

/// Fetch, persist, then swap. Nothing is replaced until every step before
/// the swap has succeeded. If the timestamp cannot be written, the catalog
/// file is put back the way it was.
async fn refresh<S: FileStorage, H: HttpClient>(
    storage: &S,
    http: &H,
    mirror: &mut CatalogMirror,
) -> Result<(), CoreError> {
    let filename = mirror.source.filename.clone();
    debug!(catalog = %filename, url = %mirror.source.url, "Fetching catalog");

    let result = async {
        let body = http.get_json(&mirror.source.url).await?;
        let payload = CatalogPayload::from_value(body)?;
        let fetched_at = Utc::now();

        let previous = if storage.exists(&filename).await? {
            Some(storage.read_text(&filename).await?)
        } else {
            None
        };

        storage.write_text(&filename, &payload.to_json()?).await?;
        let stamped = storage
            .write_text(
                &mirror.source.timestamp_filename(),
                &fetched_at.timestamp_millis().to_string(),
            )
            .await;
        if let Err(e) = stamped {
            restore_catalog_file(storage, &filename, previous).await;
            return Err(e);
        }
        Ok::<_, CoreError>((payload, fetched_at))
    }
    .await;

    match result {
        Ok((payload, fetched_at)) => {
            info!(catalog = %filename, items = payload.items.len(), "Catalog refreshed");
            mirror.items = payload.items;
            mirror.fetched_at = Some(fetched_at);
            Ok(())
        }
        Err(e) => {
            warn!(catalog = %filename, error = %e, "Catalog refresh failed");
            Err(e)
        }
    }
}

/// Undo a catalog write whose timestamp never made it to disk.
async fn restore_catalog_file<S: FileStorage>(
    storage: &S,
    filename: &str,
    previous: Option<String>,
) {
    let restored = match previous {
        Some(text) => storage.write_text(filename, &text).await,
        None => storage.remove(filename).await,
    };
    if let Err(e) = restored {
        warn!(catalog = %filename, error = %e, "Could not restore previous mirror");
    }
}
