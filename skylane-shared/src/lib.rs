pub mod events;

pub use events::{MilesUpdateEvent, WelcomeEmailEvent, MILES_UPDATES_TOPIC, WELCOME_EMAILS_TOPIC};
