pub mod json_ledger;
pub mod local;
pub mod memory;
pub mod traits;
