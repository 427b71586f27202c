pub mod airport_repo;
pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod events;
pub mod flight_repo;
pub mod miles_repo;
pub mod redis_repo;
pub mod user_repo;

pub use airport_repo::PgAirportRepository;
pub use booking_repo::PgBookingRepository;
pub use database::DbClient;
pub use events::EventProducer;
pub use flight_repo::PgFlightRepository;
pub use miles_repo::PgMilesRepository;
pub use redis_repo::RedisClient;
pub use user_repo::PgUserRepository;
