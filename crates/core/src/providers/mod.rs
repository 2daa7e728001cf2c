pub mod reqwest_client;
pub mod traits;
