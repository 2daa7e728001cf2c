pub mod catalog;
pub mod ingredient;
pub mod sale;
pub mod settings;
