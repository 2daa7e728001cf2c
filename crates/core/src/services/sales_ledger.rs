use chrono::Utc;
use tracing::{debug, info};

use crate::errors::CoreError;
use crate::models::sale::{
    compute_profit, NewSale, Sale, SaleFilter, SalePage, SalePatch, SalesTotals, SumField,
};
use crate::storage::traits::SaleRepository;

/// Rows per page when the caller has no preference.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// CRUD and aggregate queries over the sales ledger.
///
/// Keeps `profit` consistent with quantity and prices: it is computed on
/// insert and recomputed on every update touching one of its inputs, before
/// anything reaches the repository. Totals are always summed by the
/// repository over the full dataset, never cached here.
pub struct SalesLedger<R: SaleRepository> {
    repository: R,
}

impl<R: SaleRepository> SalesLedger<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// One page of sales matching `filter`, in insertion order.
    ///
    /// `page` is 1-based. A page past the end is empty but still reports the
    /// real total.
    pub async fn list_sales(
        &self,
        page: u32,
        page_size: u32,
        filter: &SaleFilter,
    ) -> Result<SalePage, CoreError> {
        if page == 0 {
            return Err(CoreError::Validation("Page numbers start at 1".into()));
        }
        if page_size == 0 {
            return Err(CoreError::Validation("Page size must be positive".into()));
        }

        debug!(page, page_size, filter = ?filter, "Listing sales");
        let (sales, total) = self.repository.query(filter, page, page_size).await?;
        Ok(SalePage {
            sales,
            total,
            page,
            page_size,
        })
    }

    pub async fn get_sale(&self, id: u64) -> Result<Option<Sale>, CoreError> {
        self.repository.get(id).await
    }

    /// Insert a new sale and return it as stored (with its id and profit).
    pub async fn add_sale(&self, new: NewSale) -> Result<Sale, CoreError> {
        validate_name(&new.item_name)?;
        validate_price("cost price", new.cost_price)?;
        validate_price("sell price", new.sell_price)?;

        let mut sale = Sale::from_new(new);
        let id = self.repository.insert(sale.clone()).await?;
        sale.id = id;
        info!(sale_id = id, item = %sale.item_name, "Sale added");
        Ok(sale)
    }

    /// Merge `patch` into sale `id`, recomputing profit when quantity or a
    /// price changes. Any `profit` supplied by the caller is ignored.
    pub async fn update_sale(&self, id: u64, mut patch: SalePatch) -> Result<(), CoreError> {
        let current = self
            .repository
            .get(id)
            .await?
            .ok_or(CoreError::SaleNotFound(id))?;

        if let Some(name) = &patch.item_name {
            validate_name(name)?;
        }
        if let Some(cost) = patch.cost_price {
            validate_price("cost price", cost)?;
        }
        if let Some(sell) = patch.sell_price {
            validate_price("sell price", sell)?;
        }

        patch.profit = None;
        if patch.touches_profit() {
            patch.profit = Some(compute_profit(
                patch.quantity.unwrap_or(current.quantity),
                patch.cost_price.unwrap_or(current.cost_price),
                patch.sell_price.unwrap_or(current.sell_price),
            ));
        }

        if patch.is_empty() {
            return Ok(());
        }

        self.repository.update(id, &patch).await?;
        info!(sale_id = id, "Sale updated");
        Ok(())
    }

    pub async fn delete_sale(&self, id: u64) -> Result<(), CoreError> {
        self.repository.delete(id).await?;
        info!(sale_id = id, "Sale deleted");
        Ok(())
    }

    /// Insert a copy of sale `id` under a new id, dated now.
    pub async fn duplicate_sale(&self, id: u64) -> Result<Sale, CoreError> {
        let source = self
            .repository
            .get(id)
            .await?
            .ok_or(CoreError::SaleNotFound(id))?;

        let mut copy = source.to_new_sale();
        copy.added_date = Some(Utc::now());
        let sale = self.add_sale(copy).await?;
        debug!(source_id = id, sale_id = sale.id, "Sale duplicated");
        Ok(sale)
    }

    /// Profit and turnover summed over every sale, regardless of paging.
    pub async fn get_totals(&self) -> Result<SalesTotals, CoreError> {
        let total_profit = self.repository.aggregate_sum(SumField::Profit).await?;
        let total_turnover = self.repository.aggregate_sum(SumField::Turnover).await?;
        Ok(SalesTotals {
            total_profit,
            total_turnover,
        })
    }
}

fn validate_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation("Item name must not be empty".into()));
    }
    Ok(())
}

fn validate_price(label: &str, value: f64) -> Result<(), CoreError> {
    if !value.is_finite() || value < 0.0 {
        return Err(CoreError::Validation(format!(
            "Invalid {label}: {value} (must be finite and non-negative)"
        )));
    }
    Ok(())
}
