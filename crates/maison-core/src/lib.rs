// Marketplace data-access core - the brain of the operation
pub mod catalog;
pub mod config;
pub mod error;
pub mod mock;
pub mod models;
pub mod notifications;
pub mod provider;
pub mod service;

pub use catalog::{CatalogManager, MarketplaceStats};
pub use config::Config;
pub use error::Error;
pub use notifications::NotificationManager;
pub use provider::ProviderKind;
pub use service::DataService;

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
