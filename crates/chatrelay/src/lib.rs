pub mod catalog;
pub mod errors;
pub mod formatter;
pub mod models;
pub mod providers;
pub mod relay;
