use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Airport {
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
}

/// Uppercases a 3-letter IATA code, rejecting anything else.
pub fn normalize_iata(code: &str) -> CoreResult<String> {
    let trimmed = code.trim();
    if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(CoreError::ValidationError(format!(
            "Invalid IATA code: {}",
            code
        )))
    }
}

#[async_trait]
pub trait AirportRepository: Send + Sync {
    async fn find(
        &self,
        code: &str,
    ) -> Result<Option<Airport>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list(&self) -> Result<Vec<Airport>, Box<dyn std::error::Error + Send + Sync>>;

    /// Returns false when the code is already taken.
    async fn create(
        &self,
        airport: &Airport,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Returns false when no row matched the code.
    async fn update(
        &self,
        airport: &Airport,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Returns false when no row matched the code.
    async fn delete(
        &self,
        code: &str,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_iata() {
        assert_eq!(normalize_iata("ist").unwrap(), "IST");
        assert_eq!(normalize_iata(" JFK ").unwrap(), "JFK");
        assert!(normalize_iata("").is_err());
        assert!(normalize_iata("J1K").is_err());
        assert!(normalize_iata("LHRX").is_err());
    }
}
