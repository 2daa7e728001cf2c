use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::errors::CoreError;
use crate::models::sale::{Sale, SaleFilter, SalePatch, SumField};

use super::traits::{paginate, FileStorage, SaleRepository};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Every critical section is a single container operation.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct Table {
    sales: Vec<Sale>,
    last_id: u64,
}

/// Sale repository kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemorySaleRepository {
    table: Mutex<Table>,
}

impl MemorySaleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.table).sales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SaleRepository for MemorySaleRepository {
    async fn query(
        &self,
        filter: &SaleFilter,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Sale>, u64), CoreError> {
        let table = lock(&self.table);
        let matches: Vec<Sale> = table
            .sales
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        let total = matches.len() as u64;
        Ok((paginate(&matches, page, page_size), total))
    }

    async fn get(&self, id: u64) -> Result<Option<Sale>, CoreError> {
        Ok(lock(&self.table).sales.iter().find(|s| s.id == id).cloned())
    }

    async fn insert(&self, mut sale: Sale) -> Result<u64, CoreError> {
        let mut table = lock(&self.table);
        table.last_id += 1;
        sale.id = table.last_id;
        table.sales.push(sale);
        Ok(table.last_id)
    }

    async fn update(&self, id: u64, patch: &SalePatch) -> Result<(), CoreError> {
        let mut table = lock(&self.table);
        let sale = table
            .sales
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(CoreError::SaleNotFound(id))?;
        sale.apply(patch);
        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<(), CoreError> {
        let mut table = lock(&self.table);
        let idx = table
            .sales
            .iter()
            .position(|s| s.id == id)
            .ok_or(CoreError::SaleNotFound(id))?;
        table.sales.remove(idx);
        Ok(())
    }

    async fn aggregate_sum(&self, field: SumField) -> Result<f64, CoreError> {
        Ok(lock(&self.table).sales.iter().map(|s| field.value_of(s)).sum())
    }
}

/// File storage backed by a map of name → contents. Useful for tests and
/// for running without a writable data directory.
#[derive(Debug, Default)]
pub struct MemoryFileStorage {
    files: Mutex<HashMap<String, String>>,
}

impl MemoryFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a file.
    pub fn with_file(self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        lock(&self.files).insert(path.into(), contents.into());
        self
    }

    /// Current contents of a file, if any.
    pub fn contents(&self, path: &str) -> Option<String> {
        lock(&self.files).get(path).cloned()
    }
}

#[async_trait]
impl FileStorage for MemoryFileStorage {
    async fn prepare(&self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, CoreError> {
        Ok(lock(&self.files).contains_key(path))
    }

    async fn read_text(&self, path: &str) -> Result<String, CoreError> {
        lock(&self.files)
            .get(path)
            .cloned()
            .ok_or_else(|| CoreError::FileIO(format!("{path}: no such file")))
    }

    async fn write_text(&self, path: &str, contents: &str) -> Result<(), CoreError> {
        lock(&self.files).insert(path.to_string(), contents.to_string());
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), CoreError> {
        lock(&self.files).remove(path);
        Ok(())
    }
}
