//! Backend trait defining the remote chat store and inference interface.
//!
//! The orchestrator only ever talks to this trait. Implementations:
//! - [`crate::client::BackendClient`]: REST backend over reqwest
//! - [`InMemoryBackend`]: process-local store with failure injection

mod memory;

pub use memory::{BackendOp, InMemoryBackend};

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{AccountId, ChatMessage, IdentityHint, InferenceReply, Role, ThreadId, ThreadSummary};

/// Remote store of accounts, threads and messages plus the inference endpoint.
///
/// Every method is one independent request/response call; implementations
/// hold no per-conversation state.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Look up the account for an identity; `None` is the distinguished
    /// not-found answer.
    async fn get_account(&self, identity: &IdentityHint) -> Result<Option<AccountId>>;

    /// Create an account for an identity.
    async fn create_account(&self, identity: &IdentityHint) -> Result<AccountId>;

    /// List an account's threads in backend order. No threads is an empty vec.
    async fn list_threads(&self, account: AccountId) -> Result<Vec<ThreadSummary>>;

    /// Create a thread owned by `account`.
    async fn create_thread(&self, account: AccountId, title: &str, model: &str) -> Result<ThreadId>;

    /// Append one turn to a thread.
    async fn append_message(&self, thread: &ThreadId, role: Role, content: &str) -> Result<()>;

    /// Read a thread's full ordered history.
    async fn get_history(&self, thread: &ThreadId) -> Result<Vec<ChatMessage>>;

    /// Run inference over `history`. A non-success answer must surface as
    /// [`crate::Error::Api`] with the upstream status and body untouched.
    async fn run_inference(
        &self,
        thread: &ThreadId,
        history: &[ChatMessage],
        model: &str,
    ) -> Result<InferenceReply>;
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Arc<T> {
    async fn get_account(&self, identity: &IdentityHint) -> Result<Option<AccountId>> {
        (**self).get_account(identity).await
    }

    async fn create_account(&self, identity: &IdentityHint) -> Result<AccountId> {
        (**self).create_account(identity).await
    }

    async fn list_threads(&self, account: AccountId) -> Result<Vec<ThreadSummary>> {
        (**self).list_threads(account).await
    }

    async fn create_thread(&self, account: AccountId, title: &str, model: &str) -> Result<ThreadId> {
        (**self).create_thread(account, title, model).await
    }

    async fn append_message(&self, thread: &ThreadId, role: Role, content: &str) -> Result<()> {
        (**self).append_message(thread, role, content).await
    }

    async fn get_history(&self, thread: &ThreadId) -> Result<Vec<ChatMessage>> {
        (**self).get_history(thread).await
    }

    async fn run_inference(
        &self,
        thread: &ThreadId,
        history: &[ChatMessage],
        model: &str,
    ) -> Result<InferenceReply> {
        (**self).run_inference(thread, history, model).await
    }
}
