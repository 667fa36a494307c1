use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::chat::{ChatTurn, MessageRole};

const TITLE_CHARS: usize = 60;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub title: String,
    pub messages: Vec<ChatTurn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.session_id.clone(),
            title: session.title.clone(),
            updated_at: session.updated_at,
        }
    }
}

/// Persists `{sessionId, messages}` on behalf of the chat routes.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Replaces the session's messages, creating the session if needed.
    async fn save(&self, session_id: &str, messages: Vec<ChatTurn>) -> Result<Session>;
    async fn get(&self, session_id: &str) -> Result<Option<Session>>;
    /// Most recently updated first.
    async fn list(&self) -> Result<Vec<SessionSummary>>;
    /// Returns whether a session was removed.
    async fn delete(&self, session_id: &str) -> Result<bool>;
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<IndexMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, session_id: &str, messages: Vec<ChatTurn>) -> Result<Session> {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        let title = title_for(&messages);

        // shift_remove + insert keeps the map ordered by last update
        let session = match sessions.shift_remove(session_id) {
            Some(existing) => Session {
                title,
                messages,
                updated_at: now,
                ..existing
            },
            None => Session {
                session_id: session_id.to_string(),
                title,
                messages,
                created_at: now,
                updated_at: now,
            },
        };

        sessions.insert(session_id.to_string(), session.clone());

        Ok(session)
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn list(&self) -> Result<Vec<SessionSummary>> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .rev()
            .map(SessionSummary::from)
            .collect())
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        Ok(self
            .sessions
            .write()
            .await
            .shift_remove(session_id)
            .is_some())
    }
}

fn title_for(messages: &[ChatTurn]) -> String {
    let first = messages
        .iter()
        .find(|turn| turn.role == MessageRole::User)
        .map(|turn| turn.content.trim())
        .unwrap_or_default();

    match first.chars().count() > TITLE_CHARS {
        true => format!("{}...", first.chars().take(TITLE_CHARS).collect::<String>()),
        false => first.to_string(),
    }
}
