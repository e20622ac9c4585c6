//! Application state management

use std::sync::Arc;
use warden_discovery::DiscoveryScanner;

use crate::config::Config;

/// Shared application state
pub struct AppState {
    /// Discovery scanner
    pub scanner: DiscoveryScanner,
    /// Configuration
    pub config: Config,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config) -> Arc<Self> {
        let scanner = DiscoveryScanner::new(config.to_scanner_config());
        Arc::new(Self { scanner, config })
    }
}
