use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::CoreError;
use crate::models::sale::{Sale, SaleFilter, SalePatch, SumField};

use super::traits::{paginate, FileStorage, SaleRepository};

/// Default ledger file name inside the data directory.
pub const LEDGER_FILE: &str = "sales_ledger.json";

/// On-disk shape of the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerFile {
    /// Highest id ever handed out; survives deletions so ids are never reused
    next_id: u64,
    sales: Vec<Sale>,
}

/// Sale repository persisted as one JSON document through a `FileStorage`.
///
/// Every mutation rewrites the whole file before the in-memory copy is
/// changed, so a failed write leaves both in their previous state.
pub struct JsonSaleRepository<S: FileStorage> {
    storage: S,
    path: String,
    ledger: Mutex<LedgerFile>,
}

impl<S: FileStorage> JsonSaleRepository<S> {
    /// Open the ledger at the default file name.
    pub async fn open(storage: S) -> Result<Self, CoreError> {
        Self::open_at(storage, LEDGER_FILE).await
    }

    /// Open (or start) the ledger at `path`. A corrupt file is an error;
    /// it is never silently replaced by an empty ledger.
    pub async fn open_at(storage: S, path: impl Into<String>) -> Result<Self, CoreError> {
        let path = path.into();
        let ledger = if storage.exists(&path).await? {
            let text = storage.read_text(&path).await?;
            serde_json::from_str(&text)
                .map_err(|e| CoreError::Parse(format!("Invalid ledger file {path}: {e}")))?
        } else {
            LedgerFile::default()
        };
        debug!(path = %path, sales = ledger.sales.len(), "Opened sales ledger");
        Ok(Self {
            storage,
            path,
            ledger: Mutex::new(ledger),
        })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    async fn persist(&self, ledger: &LedgerFile) -> Result<(), CoreError> {
        let text = serde_json::to_string(ledger)
            .map_err(|e| CoreError::Serialization(e.to_string()))?;
        self.storage.write_text(&self.path, &text).await
    }
}

#[async_trait]
impl<S: FileStorage> SaleRepository for JsonSaleRepository<S> {
    async fn query(
        &self,
        filter: &SaleFilter,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Sale>, u64), CoreError> {
        let ledger = self.ledger.lock().await;
        let matches: Vec<Sale> = ledger
            .sales
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        let total = matches.len() as u64;
        Ok((paginate(&matches, page, page_size), total))
    }

    async fn get(&self, id: u64) -> Result<Option<Sale>, CoreError> {
        let ledger = self.ledger.lock().await;
        Ok(ledger.sales.iter().find(|s| s.id == id).cloned())
    }

    async fn insert(&self, mut sale: Sale) -> Result<u64, CoreError> {
        let mut ledger = self.ledger.lock().await;
        let mut next = ledger.clone();
        next.next_id += 1;
        sale.id = next.next_id;
        next.sales.push(sale);
        self.persist(&next).await?;
        let id = next.next_id;
        *ledger = next;
        Ok(id)
    }

    async fn update(&self, id: u64, patch: &SalePatch) -> Result<(), CoreError> {
        let mut ledger = self.ledger.lock().await;
        let mut next = ledger.clone();
        next.sales
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(CoreError::SaleNotFound(id))?
            .apply(patch);
        self.persist(&next).await?;
        *ledger = next;
        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<(), CoreError> {
        let mut ledger = self.ledger.lock().await;
        let idx = ledger
            .sales
            .iter()
            .position(|s| s.id == id)
            .ok_or(CoreError::SaleNotFound(id))?;
        let mut next = ledger.clone();
        next.sales.remove(idx);
        self.persist(&next).await?;
        *ledger = next;
        Ok(())
    }

    async fn aggregate_sum(&self, field: SumField) -> Result<f64, CoreError> {
        let ledger = self.ledger.lock().await;
        Ok(ledger.sales.iter().map(|s| field.value_of(s)).sum())
    }
}
