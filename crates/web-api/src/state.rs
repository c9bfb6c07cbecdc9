use std::sync::Arc;

use application::Hub;
use config::HubConfig;

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub config: Arc<HubConfig>,
}

impl AppState {
    pub fn new(hub: Arc<Hub>, config: HubConfig) -> Self {
        Self {
            hub,
            config: Arc::new(config),
        }
    }
}
