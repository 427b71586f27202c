use rust_decimal::Decimal;
use uuid::Uuid;

/// Queue drained by the welcome-email worker.
pub const WELCOME_EMAILS_TOPIC: &str = "welcome-emails";
/// Queue drained by the miles-update worker.
pub const MILES_UPDATES_TOPIC: &str = "miles-updates";

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct WelcomeEmailEvent {
    pub member_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub member_number: String,
    pub enqueued_at: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct MilesUpdateEvent {
    pub member_id: Uuid,
    pub email: String,
    pub miles_delta: Decimal,
    pub new_balance: Decimal,
    pub flight_id: Option<Uuid>,
    pub airline_code: Option<String>,
    pub reason: Option<String>,
    pub enqueued_at: i64,
}
