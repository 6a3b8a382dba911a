pub mod client;
pub mod config;
pub mod inventory;
pub mod location;
pub mod offers;

pub use client::{MarketplaceClient, MarketplaceError};
pub use config::MarketplaceConfig;
