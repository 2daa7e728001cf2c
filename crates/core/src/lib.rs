pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use std::path::PathBuf;

use models::settings::CatalogSettings;
use providers::reqwest_client::ReqwestHttpClient;
use services::{catalog_cache::ItemCatalogCache, sales_ledger::SalesLedger};
use storage::{json_ledger::JsonSaleRepository, local::LocalFileStorage, traits::FileStorage};

use errors::CoreError;

pub type LocalSalesLedger = SalesLedger<JsonSaleRepository<LocalFileStorage>>;
pub type LocalCatalogCache = ItemCatalogCache<LocalFileStorage, ReqwestHttpClient>;

/// Main entry point for an application built on kamas-tracker-core.
///
/// Wires both components to the same local data directory. The ledger and
/// the catalog cache stay independent; this only composes them.
#[must_use]
pub struct KamasTracker {
    ledger: LocalSalesLedger,
    catalogs: LocalCatalogCache,
}

impl std::fmt::Debug for KamasTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KamasTracker")
            .field("data_dir", &self.catalogs.storage().root())
            .field("catalogs", &self.catalogs.statuses())
            .finish()
    }
}

impl KamasTracker {
    /// Open in the platform data directory (`<data dir>/kamas-tracker`).
    pub async fn open_default(settings: CatalogSettings) -> Result<Self, CoreError> {
        let storage = LocalFileStorage::in_default_dir()?;
        Self::open_with(storage, settings).await
    }

    /// Open in an explicit data directory.
    pub async fn open_in(
        data_dir: impl Into<PathBuf>,
        settings: CatalogSettings,
    ) -> Result<Self, CoreError> {
        Self::open_with(LocalFileStorage::new(data_dir), settings).await
    }

    /// Prepares the directory and opens the ledger. Catalogs are not touched
    /// until `initialize_catalogs` is called, since that may hit the network.
    async fn open_with(
        storage: LocalFileStorage,
        settings: CatalogSettings,
    ) -> Result<Self, CoreError> {
        storage.prepare().await?;
        let repository = JsonSaleRepository::open(storage.clone()).await?;
        Ok(Self {
            ledger: SalesLedger::new(repository),
            catalogs: ItemCatalogCache::new(storage, ReqwestHttpClient::new(), settings),
        })
    }

    pub fn ledger(&self) -> &LocalSalesLedger {
        &self.ledger
    }

    pub fn catalogs(&self) -> &LocalCatalogCache {
        &self.catalogs
    }

    /// Needed for refreshes and ingredient cost changes.
    pub fn catalogs_mut(&mut self) -> &mut LocalCatalogCache {
        &mut self.catalogs
    }

    /// Refresh or load every catalog mirror and the ingredient costs.
    pub async fn initialize_catalogs(&mut self) -> Result<(), CoreError> {
        self.catalogs.initialize().await
    }
}
