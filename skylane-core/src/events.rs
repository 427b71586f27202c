use async_trait::async_trait;

/// Outbound event seam. The production implementation publishes to the
/// message broker; domain crates only ever see this trait, and callers on
/// the request path treat failures as best-effort.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
