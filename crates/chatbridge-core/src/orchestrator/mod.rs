//! Conversation orchestration - one inbound user message to one reply.
//!
//! Drives a fixed sequence of backend calls. Each step gates the next:
//!
//! ```text
//! ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐
//! │ 1. account   │→→│ 2. thread    │→→│ 3. user turn │→→│ 4. history   │→→│ 5. inference │→→│ 6. reply     │
//! │ get-or-create│  │ first-or-new │  │ append       │  │ fetch        │  │ run          │  │ append       │
//! └──────────────┘  └──────────────┘  └──────────────┘  └──────────────┘  └──────────────┘  └──────────────┘
//!     fail-fast         fail-fast         fail-fast         fail-fast         fail-fast         fail-soft
//! ```
//!
//! The orchestrator keeps nothing between invocations; account and thread ids
//! are resolved fresh every time and passed explicitly from step to step.

mod error;

pub use error::{OrchestrationError, GENERIC_SERVER_ERROR};

use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::backend::ChatBackend;
use crate::types::{AccountId, ChatMessage, Delivery, IdentityHint, InferenceReply, Role, ThreadId};

/// Model used when the caller names none
pub const DEFAULT_MODEL: &str = "llama3.1";

/// Title given to threads created on first use
pub const DEFAULT_THREAD_TITLE: &str = "New chat";

/// Defaults applied by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub default_model: String,
    pub default_thread_title: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            default_thread_title: DEFAULT_THREAD_TITLE.to_string(),
        }
    }
}

/// One inbound "send message" request
#[derive(Debug, Clone, Default)]
pub struct MessageRequest {
    pub identity: Option<IdentityHint>,
    pub content: String,
    pub model: Option<String>,
    /// Explicit thread; when absent the account's first thread is used
    pub thread_id: Option<ThreadId>,
}

impl MessageRequest {
    pub fn new(identity: impl Into<IdentityHint>, content: impl Into<String>) -> Self {
        Self {
            identity: Some(identity.into()),
            content: content.into(),
            model: None,
            thread_id: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_thread(mut self, thread_id: ThreadId) -> Self {
        self.thread_id = Some(thread_id);
        self
    }
}

/// Runs the message flow against a [`ChatBackend`]
pub struct Orchestrator<B> {
    backend: B,
    config: OrchestratorConfig,
}

impl<B: ChatBackend> Orchestrator<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, OrchestratorConfig::default())
    }

    pub fn with_config(backend: B, config: OrchestratorConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Turn one user message into one reply.
    ///
    /// Steps 1-5 abort on the first failure. A failed assistant-turn append
    /// still delivers the reply, with `persisted` set to false.
    pub async fn handle_message(&self, request: MessageRequest) -> Result<Delivery, OrchestrationError> {
        let identity = match request.identity {
            Some(identity) if !identity.is_blank() => identity,
            _ => return Err(OrchestrationError::CallerInputMissing),
        };
        let model = request
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.config.default_model.clone());

        let span = info_span!("handle_message", identity = %identity, model = %model);
        self.run(identity, request.content, model, request.thread_id)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        identity: IdentityHint,
        content: String,
        model: String,
        explicit_thread: Option<ThreadId>,
    ) -> Result<Delivery, OrchestrationError> {
        let account = self.resolve_account(&identity).await?;

        let thread = match explicit_thread {
            Some(thread) => {
                debug!(thread = %thread, "Using caller-selected thread");
                thread
            }
            None => self.resolve_thread(account, &model).await?,
        };

        self.append_user_turn(&thread, &content).await?;
        let history = self.fetch_history(&thread).await?;
        let reply = self.invoke_inference(&thread, &history, &model).await?;
        let persisted = self.append_assistant_turn(&thread, &reply.reply).await;

        Ok(Delivery::new(reply, persisted))
    }

    /// Step 1: get-or-create the account for an identity
    pub async fn resolve_account(&self, identity: &IdentityHint) -> Result<AccountId, OrchestrationError> {
        let existing = self
            .backend
            .get_account(identity)
            .await
            .map_err(OrchestrationError::AccountResolutionFailed)?;

        if let Some(account) = existing {
            debug!(account = %account, "Account found");
            return Ok(account);
        }

        let account = self
            .backend
            .create_account(identity)
            .await
            .map_err(OrchestrationError::AccountResolutionFailed)?;
        info!(account = %account, "Created account");
        Ok(account)
    }

    /// Step 2: first listed thread, or a new one.
    ///
    /// A failed list is treated exactly like an empty one.
    pub async fn resolve_thread(&self, account: AccountId, model: &str) -> Result<ThreadId, OrchestrationError> {
        let threads = match self.backend.list_threads(account).await {
            Ok(threads) => threads,
            Err(e) => {
                warn!(account = %account, "Thread list failed, creating a new thread: {}", e);
                Vec::new()
            }
        };

        if let Some(first) = threads.into_iter().next() {
            debug!(thread = %first.thread_id, "Using first listed thread");
            return Ok(first.thread_id);
        }

        let thread = self
            .backend
            .create_thread(account, &self.config.default_thread_title, model)
            .await
            .map_err(OrchestrationError::ThreadResolutionFailed)?;
        info!(account = %account, thread = %thread, "Created thread");
        Ok(thread)
    }

    /// Step 3: persist the user's turn before anything is sent to inference
    pub async fn append_user_turn(&self, thread: &ThreadId, content: &str) -> Result<(), OrchestrationError> {
        self.backend
            .append_message(thread, Role::User, content)
            .await
            .map_err(OrchestrationError::MessagePersistFailed)?;
        debug!(thread = %thread, "Appended user turn");
        Ok(())
    }

    /// Step 4: read the full history, including the turn just appended
    pub async fn fetch_history(&self, thread: &ThreadId) -> Result<Vec<ChatMessage>, OrchestrationError> {
        let history = self
            .backend
            .get_history(thread)
            .await
            .map_err(OrchestrationError::HistoryFetchFailed)?;
        debug!(thread = %thread, turns = history.len(), "Fetched history");
        Ok(history)
    }

    /// Step 5: run inference over the history
    pub async fn invoke_inference(
        &self,
        thread: &ThreadId,
        history: &[ChatMessage],
        model: &str,
    ) -> Result<InferenceReply, OrchestrationError> {
        let reply = self
            .backend
            .run_inference(thread, history, model)
            .await
            .map_err(OrchestrationError::inference)?;
        debug!(thread = %thread, "Inference succeeded");
        Ok(reply)
    }

    /// Step 6: persist the assistant's turn. Returns whether it landed.
    pub async fn append_assistant_turn(&self, thread: &ThreadId, reply: &str) -> bool {
        match self.backend.append_message(thread, Role::Assistant, reply).await {
            Ok(()) => {
                debug!(thread = %thread, "Appended assistant turn");
                true
            }
            Err(e) => {
                error!(thread = %thread, "Reply delivered but not persisted: {}", e);
                false
            }
        }
    }
}
