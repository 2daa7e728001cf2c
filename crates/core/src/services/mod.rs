pub mod catalog_cache;
pub mod sales_ledger;
