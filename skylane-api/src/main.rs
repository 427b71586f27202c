use std::net::SocketAddr;
use std::sync::Arc;

use skylane_api::{app, worker, AppState};
use skylane_booking::repository::BookingRepository;
use skylane_booking::BookingService;
use skylane_catalog::FlightRepository;
use skylane_core::airport::AirportRepository;
use skylane_core::events::EventPublisher;
use skylane_core::user::UserRepository;
use skylane_loyalty::repository::MilesRepository;
use skylane_loyalty::LedgerService;
use skylane_store::{
    DbClient, EventProducer, PgAirportRepository, PgBookingRepository, PgFlightRepository,
    PgMilesRepository, PgUserRepository, RedisClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skylane_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = skylane_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Skylane API on port {}", config.server.port);

    // Postgres
    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    // Redis
    let redis = Arc::new(
        RedisClient::new(&config.redis.url)
            .await
            .expect("Failed to connect to Redis"),
    );

    // Message broker
    let kafka = Arc::new(EventProducer::new(&config.kafka.brokers).expect("Failed to create event producer"));
    let events: Arc<dyn EventPublisher> = kafka;

    let flights: Arc<dyn FlightRepository> = Arc::new(PgFlightRepository::new(db.pool.clone()));
    let bookings: Arc<dyn BookingRepository> = Arc::new(PgBookingRepository::new(db.pool.clone()));
    let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(db.pool.clone()));
    let airports: Arc<dyn AirportRepository> = Arc::new(PgAirportRepository::new(db.pool.clone()));
    let miles: Arc<dyn MilesRepository> = Arc::new(PgMilesRepository::new(db.pool.clone()));

    let ledger = LedgerService::new(miles);
    let booking = Arc::new(BookingService::new(
        flights.clone(),
        bookings,
        users.clone(),
        ledger.clone(),
        events.clone(),
    ));

    // Notification worker drains the email queues in the background.
    tokio::spawn(worker::start_notification_worker(
        config.kafka.brokers.clone(),
        config.kafka.group_id.clone(),
        Arc::new(worker::LogEmailSender),
    ));

    // Config sources may fold key case; partner codes are matched uppercase.
    let airline_api_keys = config
        .gateway
        .airline_api_keys
        .iter()
        .map(|(code, key)| (code.to_ascii_uppercase(), key.clone()))
        .collect();

    let app_state = AppState {
        redis,
        events,
        flights,
        airports,
        users,
        booking,
        ledger,
        cache: config.cache.clone(),
        airline_api_keys,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
