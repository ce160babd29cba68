//! Typed access to the scraper backend's HTTP contract

pub mod client;
pub mod error;
pub mod models;
pub mod validation;

pub use client::{ApiClient, ExportFormat};
pub use error::ClientError;
pub use validation::ValidationError;
