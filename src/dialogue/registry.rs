//! Per-session state for concurrent callers

use super::client::CompletionClient;
use super::session::DialogueSession;
use crate::config::ContextManageConfig;
use crate::context::Tokenizer;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Shared handle to one session; lock it to mutate the transcript
pub type SessionHandle = Arc<Mutex<DialogueSession>>;

/// Independent dialogue sessions keyed by id.
///
/// Each session owns its own transcript. The per-session mutex serializes
/// input handling within a session while different sessions proceed in
/// parallel.
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionHandle>,
    tokenizer: Arc<dyn Tokenizer>,
    client: Arc<dyn CompletionClient>,
    config: ContextManageConfig,
}

impl SessionRegistry {
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        client: Arc<dyn CompletionClient>,
        config: ContextManageConfig,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            tokenizer,
            client,
            config,
        }
    }

    /// Start a new session and return its id
    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let session = DialogueSession::new(
            self.tokenizer.clone(),
            self.client.clone(),
            self.config.clone(),
        );
        self.sessions.insert(id, Arc::new(Mutex::new(session)));
        debug!("Created session {}", id);
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Drop a session, returning whether it existed
    pub fn remove(&self, id: &Uuid) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            debug!("Removed session {}", id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CharCountTokenizer, Role, Turn};
    use crate::dialogue::client::{Completion, Usage};
    use crate::error::Result;
    use async_trait::async_trait;

    struct FixedClient;

    #[async_trait]
    impl CompletionClient for FixedClient {
        async fn complete(&self, _turns: &[Turn]) -> Result<Completion> {
            Ok(Completion {
                content: "pong".to_string(),
                usage: Usage {
                    prompt_tokens: 4,
                    completion_tokens: 4,
                    total_tokens: 8,
                },
            })
        }
    }

    fn registry() -> SessionRegistry {
        SessionRegistry::new(
            Arc::new(CharCountTokenizer),
            Arc::new(FixedClient),
            ContextManageConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let registry = registry();
        let first = registry.create();
        let second = registry.create();
        assert_eq!(registry.len(), 2);

        let handle = registry.get(&first).unwrap();
        handle.lock().await.handle_input("ping").await.unwrap();

        let first_session = registry.get(&first).unwrap();
        let first_session = first_session.lock().await;
        assert_eq!(first_session.transcript().len(), 2);
        assert_eq!(first_session.transcript().turns()[1], Turn::new(Role::Assistant, "pong"));

        let second_session = registry.get(&second).unwrap();
        assert!(second_session.lock().await.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_remove_session() {
        let registry = registry();
        let id = registry.create();

        assert!(registry.remove(&id));
        assert!(!registry.remove(&id));
        assert!(registry.get(&id).is_none());
        assert!(registry.is_empty());
    }
}
