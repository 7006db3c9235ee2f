pub mod config;
pub mod config_loader;
pub mod config_watcher;
pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod venue_client;

pub use config::{AppConfig, ControllerConfig, DatabaseConfig, FeeConfig, RiskConfig};
pub use config_loader::ConfigLoader;
pub use config_watcher::ConfigWatcher;
pub use error::ErrorKind;
pub use venue_client::{
    BookUpdate, DiscoveryFilter, MarketEvent, MarketMetadata, OrderBook, OrderFillStatus,
    OrderState, OutcomeSide, PriceLevel, Venue, VenueClient, CALL_DEADLINE,
};
