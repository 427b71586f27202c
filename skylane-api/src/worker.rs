use std::sync::Arc;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use skylane_shared::{
    MilesUpdateEvent, WelcomeEmailEvent, MILES_UPDATES_TOPIC, WELCOME_EMAILS_TOPIC,
};

/// Outbound mail seam. SMTP delivery lives behind this trait; the default
/// implementation records the rendered mail in the logs.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!("Email to {}: {} | {}", to, subject, body.replace('\n', " "));
        Ok(())
    }
}

/// Drains the welcome and miles-update queues and hands rendered emails to
/// the sender. Per-message failures are logged and left to broker redelivery;
/// the loop itself never exits.
pub async fn start_notification_worker(
    brokers: String,
    group_id: String,
    mailer: Arc<dyn EmailSender>,
) {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &brokers)
        .set("group.id", &group_id)
        .set("enable.auto.commit", "true")
        .set("auto.offset.reset", "earliest")
        .create()
        .expect("Consumer creation failed");

    consumer
        .subscribe(&[WELCOME_EMAILS_TOPIC, MILES_UPDATES_TOPIC])
        .expect("Can't subscribe to notification topics");

    info!("Notification worker started, draining email queues...");

    loop {
        match consumer.recv().await {
            Err(e) => error!("Queue error: {}", e),
            Ok(m) => {
                let payload = match m.payload_view::<str>() {
                    Some(Ok(payload)) => payload,
                    Some(Err(e)) => {
                        error!("Non-UTF8 payload on {}: {}", m.topic(), e);
                        continue;
                    }
                    None => continue,
                };
                if let Err(err) = handle_message(m.topic(), payload, mailer.as_ref()).await {
                    error!("Failed to process {} message: {}", m.topic(), err);
                }
            }
        }
    }
}

async fn handle_message(
    topic: &str,
    payload: &str,
    mailer: &dyn EmailSender,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match topic {
        WELCOME_EMAILS_TOPIC => {
            let event: WelcomeEmailEvent = serde_json::from_str(payload)?;
            let (subject, body) = render_welcome(&event);
            mailer.send(&event.email, &subject, &body).await
        }
        MILES_UPDATES_TOPIC => {
            let event: MilesUpdateEvent = serde_json::from_str(payload)?;
            let (subject, body) = render_miles_update(&event);
            mailer.send(&event.email, &subject, &body).await
        }
        other => {
            warn!("Ignoring message on unexpected topic {}", other);
            Ok(())
        }
    }
}

fn render_welcome(event: &WelcomeEmailEvent) -> (String, String) {
    let subject = "Welcome to Skylane Miles".to_string();
    let body = format!(
        "Hello {},\n\nWelcome aboard! Your membership number is {}.\n\
         Start earning miles on your next flight.\n",
        event.full_name, event.member_number
    );
    (subject, body)
}

fn render_miles_update(event: &MilesUpdateEvent) -> (String, String) {
    let subject = "Your Skylane Miles balance changed".to_string();
    let direction = if event.miles_delta >= Decimal::ZERO {
        "credited to"
    } else {
        "deducted from"
    };
    let mut body = format!(
        "Hello,\n\n{} miles were {} your account. Your new balance is {}.\n",
        event.miles_delta.abs(),
        direction,
        event.new_balance
    );
    if let Some(reason) = &event.reason {
        body.push_str(&format!("Reason: {}\n", reason));
    }
    if let Some(code) = &event.airline_code {
        body.push_str(&format!("Partner airline: {}\n", code));
    }
    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_render_welcome() {
        let event = WelcomeEmailEvent {
            member_id: Uuid::new_v4(),
            email: "ayse@example.com".to_string(),
            full_name: "Ayse Yilmaz".to_string(),
            member_number: "SL17000000001234".to_string(),
            enqueued_at: 0,
        };
        let (subject, body) = render_welcome(&event);
        assert!(subject.contains("Welcome"));
        assert!(body.contains("Ayse Yilmaz"));
        assert!(body.contains("SL17000000001234"));
    }

    #[test]
    fn test_render_miles_update_directions() {
        let mut event = MilesUpdateEvent {
            member_id: Uuid::new_v4(),
            email: "pax@example.com".to_string(),
            miles_delta: dec!(120),
            new_balance: dec!(320),
            flight_id: None,
            airline_code: Some("XQ".to_string()),
            reason: Some("Flight SL101 completed".to_string()),
            enqueued_at: 0,
        };
        let (_, body) = render_miles_update(&event);
        assert!(body.contains("120 miles were credited to"));
        assert!(body.contains("320"));
        assert!(body.contains("Flight SL101 completed"));
        assert!(body.contains("Partner airline: XQ"));

        event.miles_delta = dec!(-3000);
        let (_, body) = render_miles_update(&event);
        assert!(body.contains("3000 miles were deducted from"));
    }
}
