use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::sale::{Sale, SaleFilter, SalePatch, SumField};

/// Persistence engine behind the sales ledger.
///
/// The ledger owns the business rules (profit, validation); implementations
/// only store, filter and sum records. `update` and `delete` must report
/// `CoreError::SaleNotFound` for unknown ids.
#[async_trait]
pub trait SaleRepository: Send + Sync {
    /// Records matching `filter` on the given 1-based page, in insertion
    /// order, plus the number of matches across all pages.
    async fn query(
        &self,
        filter: &SaleFilter,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Sale>, u64), CoreError>;

    async fn get(&self, id: u64) -> Result<Option<Sale>, CoreError>;

    /// Store a new record and return its freshly assigned id.
    /// `sale.id` is ignored. Ids are never reused, even after deletion.
    async fn insert(&self, sale: Sale) -> Result<u64, CoreError>;

    async fn update(&self, id: u64, patch: &SalePatch) -> Result<(), CoreError>;

    async fn delete(&self, id: u64) -> Result<(), CoreError>;

    /// Sum of `field` over every stored record.
    async fn aggregate_sum(&self, field: SumField) -> Result<f64, CoreError>;
}

/// Text file access rooted at a single data directory.
///
/// Paths are names relative to that directory.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Make sure the data directory is usable. Called once on startup.
    async fn prepare(&self) -> Result<(), CoreError>;

    async fn exists(&self, path: &str) -> Result<bool, CoreError>;

    async fn read_text(&self, path: &str) -> Result<String, CoreError>;

    async fn write_text(&self, path: &str, contents: &str) -> Result<(), CoreError>;

    /// Delete `path`. A missing file is not an error.
    async fn remove(&self, path: &str) -> Result<(), CoreError>;
}

#[async_trait]
impl<T: SaleRepository + ?Sized> SaleRepository for Arc<T> {
    async fn query(
        &self,
        filter: &SaleFilter,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Sale>, u64), CoreError> {
        (**self).query(filter, page, page_size).await
    }

    async fn get(&self, id: u64) -> Result<Option<Sale>, CoreError> {
        (**self).get(id).await
    }

    async fn insert(&self, sale: Sale) -> Result<u64, CoreError> {
        (**self).insert(sale).await
    }

    async fn update(&self, id: u64, patch: &SalePatch) -> Result<(), CoreError> {
        (**self).update(id, patch).await
    }

    async fn delete(&self, id: u64) -> Result<(), CoreError> {
        (**self).delete(id).await
    }

    async fn aggregate_sum(&self, field: SumField) -> Result<f64, CoreError> {
        (**self).aggregate_sum(field).await
    }
}

#[async_trait]
impl<T: FileStorage + ?Sized> FileStorage for Arc<T> {
    async fn prepare(&self) -> Result<(), CoreError> {
        (**self).prepare().await
    }

    async fn exists(&self, path: &str) -> Result<bool, CoreError> {
        (**self).exists(path).await
    }

    async fn read_text(&self, path: &str) -> Result<String, CoreError> {
        (**self).read_text(path).await
    }

    async fn write_text(&self, path: &str, contents: &str) -> Result<(), CoreError> {
        (**self).write_text(path, contents).await
    }

    async fn remove(&self, path: &str) -> Result<(), CoreError> {
        (**self).remove(path).await
    }
}

/// Slice out one 1-based page of an already filtered list.
pub(crate) fn paginate<T: Clone>(matches: &[T], page: u32, page_size: u32) -> Vec<T> {
    let start = (page.saturating_sub(1) as usize).saturating_mul(page_size as usize);
    matches
        .iter()
        .skip(start)
        .take(page_size as usize)
        .cloned()
        .collect()
}
