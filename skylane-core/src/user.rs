use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity record mirrored from the upstream gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: Uuid, email: String, full_name: String, role: String) -> Self {
        Self {
            id,
            email,
            full_name,
            role,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find(
        &self,
        id: Uuid,
    ) -> Result<Option<User>, Box<dyn std::error::Error + Send + Sync>>;

    /// The gateway is the identity source of truth; callers sync the
    /// header-derived identity into the local table before orchestration.
    async fn upsert(&self, user: &User)
        -> Result<User, Box<dyn std::error::Error + Send + Sync>>;
}
