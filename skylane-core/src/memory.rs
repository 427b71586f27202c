use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::events::EventPublisher;
use crate::user::{User, UserRepository};

/// In-memory user directory, used by tests and local tooling.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserDirectory {
    async fn find(
        &self,
        id: Uuid,
    ) -> Result<Option<User>, Box<dyn std::error::Error + Send + Sync>> {
        let users = self.users.lock().unwrap();
        Ok(users.get(&id).cloned())
    }

    async fn upsert(
        &self,
        user: &User,
    ) -> Result<User, Box<dyn std::error::Error + Send + Sync>> {
        let mut users = self.users.lock().unwrap();
        users.insert(user.id, user.clone());
        Ok(user.clone())
    }
}

/// Publisher that records everything it is handed instead of producing to a
/// broker. Tests assert against the captured (topic, key, payload) triples.
#[derive(Default)]
pub struct RecordingEventPublisher {
    published: Mutex<Vec<(String, String, String)>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<(String, String, String)> {
        self.published.lock().unwrap().clone()
    }

    pub fn topics(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(topic, _, _)| topic.clone())
            .collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut published = self.published.lock().unwrap();
        published.push((topic.to_string(), key.to_string(), payload.to_string()));
        Ok(())
    }
}
