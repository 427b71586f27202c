use std::collections::HashMap;
use std::sync::Arc;

use skylane_booking::BookingService;
use skylane_catalog::FlightRepository;
use skylane_core::airport::AirportRepository;
use skylane_core::events::EventPublisher;
use skylane_core::user::{User, UserRepository};
use skylane_loyalty::LedgerService;
use skylane_store::app_config::CacheConfig;
use skylane_store::RedisClient;

use crate::error::AppError;
use crate::middleware::auth::GatewayUser;

#[derive(Clone)]
pub struct AppState {
    pub redis: Arc<RedisClient>,
    pub events: Arc<dyn EventPublisher>,
    pub flights: Arc<dyn FlightRepository>,
    pub airports: Arc<dyn AirportRepository>,
    pub users: Arc<dyn UserRepository>,
    pub booking: Arc<BookingService>,
    pub ledger: LedgerService,
    pub cache: CacheConfig,
    pub airline_api_keys: HashMap<String, String>,
}

impl AppState {
    /// Mirrors the gateway-asserted identity into the users table before the
    /// orchestration layer resolves it.
    pub async fn sync_user(&self, user: &GatewayUser) -> Result<User, AppError> {
        let record = User::new(
            user.id,
            user.email.clone(),
            user.full_name.clone(),
            user.role.clone(),
        );
        self.users
            .upsert(&record)
            .await
            .map_err(AppError::internal)
    }
}
