//! One conversation: transcript plus the append/complete/trim loop

use super::client::CompletionClient;
use crate::config::ContextManageConfig;
use crate::context::{Role, Tokenizer, Transcript};
use crate::error::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Input that resets the session instead of being sent to the model
const CLEAR_COMMAND: &str = "clear";

/// What handling one input produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The transcript was reset
    Cleared,
    /// The model's reply, leading newlines stripped
    Reply(String),
}

/// A single dialogue session.
///
/// Not meant to be shared between concurrent callers without a lock; see
/// [`super::SessionRegistry`].
pub struct DialogueSession {
    transcript: Transcript,
    tokenizer: Arc<dyn Tokenizer>,
    client: Arc<dyn CompletionClient>,
    config: ContextManageConfig,
}

impl DialogueSession {
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        client: Arc<dyn CompletionClient>,
        config: ContextManageConfig,
    ) -> Self {
        let mut session = Self {
            transcript: Transcript::new(),
            tokenizer,
            client,
            config,
        };
        session.seed_system_prompt();
        session
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Reset the conversation, keeping the configured system prompt
    pub fn clear(&mut self) {
        self.transcript.clear();
        self.seed_system_prompt();
        info!("Started a new session");
    }

    /// Handle one line of user input
    pub async fn handle_input(&mut self, input: &str) -> Result<SessionEvent> {
        if input.trim() == CLEAR_COMMAND {
            self.clear();
            return Ok(SessionEvent::Cleared);
        }

        let input_length = self.tokenizer.count(input);
        self.transcript.append(Role::User, input, input_length);

        let completion = self.client.complete(self.transcript.turns()).await?;
        let reply = completion.content.trim_start_matches('\n').to_string();
        self.transcript
            .append(Role::Assistant, reply.clone(), completion.usage.completion_tokens);

        let total = completion.usage.total_tokens;
        if total > self.config.max_context {
            let report = self.transcript.trim(
                total,
                self.config.max_context,
                self.tokenizer.as_ref(),
                &self.config.eviction,
            )?;
            debug!(
                "Context trimmed: {} -> {} tokens, {} turns kept",
                total,
                report.remaining_total,
                self.transcript.len()
            );
        }

        Ok(SessionEvent::Reply(reply))
    }

    fn seed_system_prompt(&mut self) {
        if let Some(ref prompt) = self.config.system_prompt {
            let length = self.tokenizer.count(prompt);
            self.transcript.append(Role::System, prompt.clone(), length);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CharCountTokenizer, EvictionConfig, Turn};
    use crate::dialogue::client::{Completion, Usage};
    use crate::error::ContextError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a fixed text and reports usage from the turns it was sent
    struct EchoClient {
        reply: String,
        overhead: usize,
        seen: Mutex<Vec<Vec<Turn>>>,
    }

    impl EchoClient {
        fn new(reply: &str, overhead: usize) -> Self {
            Self {
                reply: reply.to_string(),
                overhead,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for EchoClient {
        async fn complete(&self, turns: &[Turn]) -> Result<Completion> {
            self.seen.lock().unwrap().push(turns.to_vec());
            let prompt: usize = turns.iter().map(|t| t.content.chars().count()).sum();
            let completion = self.reply.trim_start_matches('\n').chars().count();
            Ok(Completion {
                content: self.reply.clone(),
                usage: Usage {
                    prompt_tokens: prompt,
                    completion_tokens: completion,
                    total_tokens: prompt + completion + self.overhead,
                },
            })
        }
    }

    struct FailingClient;

    #[async_trait]
    impl CompletionClient for FailingClient {
        async fn complete(&self, _turns: &[Turn]) -> Result<Completion> {
            Err(ContextError::Api {
                status: 500,
                body: "boom".to_string(),
            })
        }
    }

    fn session(client: Arc<dyn CompletionClient>, config: ContextManageConfig) -> DialogueSession {
        DialogueSession::new(Arc::new(CharCountTokenizer), client, config)
    }

    #[tokio::test]
    async fn test_reply_appended_with_usage_lengths() {
        let client = Arc::new(EchoClient::new("\n\nhi there", 0));
        let mut session = session(client.clone(), ContextManageConfig::default());

        let event = session.handle_input("hello").await.unwrap();

        assert_eq!(event, SessionEvent::Reply("hi there".to_string()));
        let transcript = session.transcript();
        assert_eq!(
            transcript.turns(),
            &[
                Turn::new(Role::User, "hello"),
                Turn::new(Role::Assistant, "hi there")
            ]
        );
        assert_eq!(transcript.lengths(), &[5, 8]);
        assert_eq!(client.seen.lock().unwrap()[0], vec![Turn::new(Role::User, "hello")]);
    }

    #[tokio::test]
    async fn test_clear_command_resets_without_request() {
        let client = Arc::new(EchoClient::new("ok", 0));
        let config = ContextManageConfig {
            system_prompt: Some("be brief".to_string()),
            ..ContextManageConfig::default()
        };
        let mut session = session(client.clone(), config);

        session.handle_input("hello").await.unwrap();
        assert_eq!(session.transcript().len(), 3);

        let event = session.handle_input("  clear ").await.unwrap();

        assert_eq!(event, SessionEvent::Cleared);
        assert_eq!(session.transcript().turns(), &[Turn::new(Role::System, "be brief")]);
        assert_eq!(client.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_over_budget_exchange_is_trimmed() {
        let client = Arc::new(EchoClient::new(&"r".repeat(40), 0));
        let config = ContextManageConfig {
            max_context: 100,
            system_prompt: None,
            eviction: EvictionConfig {
                max_keep_turns: 4,
                ..EvictionConfig::default()
            },
        };
        let mut session = session(client, config);

        for _ in 0..4 {
            session.handle_input(&"q".repeat(20)).await.unwrap();
        }

        let transcript = session.transcript();
        assert!(transcript.len() <= 4);
        assert!(transcript.ledger_total() <= 100);
        assert_eq!(transcript.turns().len(), transcript.lengths().len());
        assert_eq!(transcript.turns().last().unwrap().role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_client_error_propagates() {
        let mut session = session(Arc::new(FailingClient), ContextManageConfig::default());

        let err = session.handle_input("hello").await.unwrap_err();

        assert!(matches!(err, ContextError::Api { status: 500, .. }));
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_unshrinkable_context_propagates() {
        // Provider overhead alone exceeds the budget
        let client = Arc::new(EchoClient::new("ok", 1000));
        let config = ContextManageConfig {
            max_context: 50,
            ..ContextManageConfig::default()
        };
        let mut session = session(client, config);

        let err = session.handle_input("hello").await.unwrap_err();

        assert!(matches!(err, ContextError::ContextUnshrinkable { max: 50, .. }));
    }
}
