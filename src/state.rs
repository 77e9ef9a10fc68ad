use crate::config::AppConfig;
use crate::services::scheduling::BookingEngine;

pub struct AppState {
    pub engine: BookingEngine,
    pub config: AppConfig,
}
