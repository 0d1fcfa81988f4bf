//! In-memory chat backend.
//!
//! Keeps accounts, threads and messages in process memory and answers
//! inference with a canned reply. Any operation can be scripted to fail, which
//! makes it the backend of choice for exercising orchestration paths and for
//! running the server without a live store.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::ChatBackend;
use crate::error::{Error, Result};
use crate::types::{AccountId, ChatMessage, IdentityHint, InferenceReply, Role, ThreadId, ThreadSummary};

/// One backend call, as recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    GetAccount,
    CreateAccount,
    ListThreads,
    CreateThread,
    AppendMessage(Role),
    GetHistory,
    RunInference,
}

/// Scripted failure: `status` of `None` models a transport error.
#[derive(Debug, Clone)]
struct Failure {
    status: Option<u16>,
    body: String,
}

impl Failure {
    fn to_error(&self) -> Error {
        match self.status {
            Some(status) => Error::api(status, self.body.clone()),
            None => Error::Other(self.body.clone()),
        }
    }
}

#[derive(Debug)]
struct StoredThread {
    id: ThreadId,
    account: AccountId,
    title: String,
    model: String,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<String, AccountId>,
    threads: Vec<StoredThread>,
    messages: HashMap<ThreadId, Vec<ChatMessage>>,
    next_account: i64,
    next_thread: u64,
    failures: HashMap<BackendOp, Failure>,
    /// Keep `calls` and `inference_inputs`; off for long-running servers
    record: bool,
    calls: Vec<BackendOp>,
    inference_inputs: Vec<Vec<ChatMessage>>,
    reply: Option<InferenceReply>,
}

impl State {
    /// Log the call when recording, then fail it if a failure is scripted.
    fn enter(&mut self, op: BackendOp) -> Result<()> {
        if self.record {
            self.calls.push(op);
        }
        match self.failures.get(&op) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    fn insert_account(&mut self, identity: &IdentityHint) -> AccountId {
        self.next_account += 1;
        let id = AccountId(self.next_account);
        self.accounts.insert(identity.as_str().to_string(), id);
        id
    }

    fn insert_thread(&mut self, account: AccountId, title: &str, model: &str) -> ThreadId {
        self.next_thread += 1;
        let id = ThreadId(format!("thread-{}", self.next_thread));
        self.threads.push(StoredThread {
            id: id.clone(),
            account,
            title: title.to_string(),
            model: model.to_string(),
        });
        self.messages.insert(id.clone(), Vec::new());
        id
    }
}

/// Process-local [`ChatBackend`].
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    /// Store without call logging, for serving traffic
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that also logs every call and every inference input.
    ///
    /// The logs are never trimmed; use this for tests and short sessions.
    pub fn recording() -> Self {
        let state = State {
            record: true,
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Seeding
    // ─────────────────────────────────────────────────────────────────────────

    /// Create an account directly, bypassing the call log
    pub async fn seed_account(&self, identity: impl Into<IdentityHint>) -> AccountId {
        self.state.lock().await.insert_account(&identity.into())
    }

    /// Create a thread directly, bypassing the call log
    pub async fn seed_thread(&self, account: AccountId, title: &str) -> ThreadId {
        self.state.lock().await.insert_thread(account, title, "llama3.1")
    }

    /// Append a turn directly, bypassing the call log
    pub async fn seed_message(&self, thread: &ThreadId, message: ChatMessage) {
        let mut state = self.state.lock().await;
        state.messages.entry(thread.clone()).or_default().push(message);
    }

    /// Answer every inference call with `reply` instead of the echo reply
    pub async fn set_reply(&self, reply: InferenceReply) {
        self.state.lock().await.reply = Some(reply);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Failure injection
    // ─────────────────────────────────────────────────────────────────────────

    /// Make `op` answer with a non-success status and body
    pub async fn fail_with_status(&self, op: BackendOp, status: u16, body: impl Into<String>) {
        let failure = Failure {
            status: Some(status),
            body: body.into(),
        };
        self.state.lock().await.failures.insert(op, failure);
    }

    /// Make `op` fail before any status is received
    pub async fn fail_transport(&self, op: BackendOp, reason: impl Into<String>) {
        let failure = Failure {
            status: None,
            body: reason.into(),
        };
        self.state.lock().await.failures.insert(op, failure);
    }

    pub async fn clear_failures(&self) {
        self.state.lock().await.failures.clear();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn account_count(&self) -> usize {
        self.state.lock().await.accounts.len()
    }

    pub async fn thread_count(&self) -> usize {
        self.state.lock().await.threads.len()
    }

    /// Threads owned by `account`, in creation order, with their title and model
    pub async fn threads_of(&self, account: AccountId) -> Vec<(ThreadId, String, String)> {
        self.state
            .lock()
            .await
            .threads
            .iter()
            .filter(|t| t.account == account)
            .map(|t| (t.id.clone(), t.title.clone(), t.model.clone()))
            .collect()
    }

    pub async fn messages(&self, thread: &ThreadId) -> Vec<ChatMessage> {
        self.state
            .lock()
            .await
            .messages
            .get(thread)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn message_count(&self) -> usize {
        self.state.lock().await.messages.values().map(Vec::len).sum()
    }

    /// Every backend call made so far, in order (empty unless recording)
    pub async fn calls(&self) -> Vec<BackendOp> {
        self.state.lock().await.calls.clone()
    }

    /// The history each inference call received, in call order (empty unless recording)
    pub async fn inference_inputs(&self) -> Vec<Vec<ChatMessage>> {
        self.state.lock().await.inference_inputs.clone()
    }
}

#[async_trait]
impl ChatBackend for InMemoryBackend {
    async fn get_account(&self, identity: &IdentityHint) -> Result<Option<AccountId>> {
        let mut state = self.state.lock().await;
        state.enter(BackendOp::GetAccount)?;
        Ok(state.accounts.get(identity.as_str()).copied())
    }

    async fn create_account(&self, identity: &IdentityHint) -> Result<AccountId> {
        let mut state = self.state.lock().await;
        state.enter(BackendOp::CreateAccount)?;
        if state.accounts.contains_key(identity.as_str()) {
            return Err(Error::api(409, "User already exists"));
        }
        Ok(state.insert_account(identity))
    }

    async fn list_threads(&self, account: AccountId) -> Result<Vec<ThreadSummary>> {
        let mut state = self.state.lock().await;
        state.enter(BackendOp::ListThreads)?;
        Ok(state
            .threads
            .iter()
            .filter(|t| t.account == account)
            .map(|t| ThreadSummary {
                thread_id: t.id.clone(),
                title: t.title.clone(),
            })
            .collect())
    }

    async fn create_thread(&self, account: AccountId, title: &str, model: &str) -> Result<ThreadId> {
        let mut state = self.state.lock().await;
        state.enter(BackendOp::CreateThread)?;
        if !state.accounts.values().any(|a| *a == account) {
            return Err(Error::api(409, format!("Unknown user {}", account)));
        }
        Ok(state.insert_thread(account, title, model))
    }

    async fn append_message(&self, thread: &ThreadId, role: Role, content: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.enter(BackendOp::AppendMessage(role))?;
        match state.messages.get_mut(thread) {
            Some(messages) => {
                messages.push(ChatMessage::new(role, content));
                Ok(())
            }
            None => Err(Error::api(409, format!("Unknown chat {}", thread))),
        }
    }

    async fn get_history(&self, thread: &ThreadId) -> Result<Vec<ChatMessage>> {
        let mut state = self.state.lock().await;
        state.enter(BackendOp::GetHistory)?;
        state
            .messages
            .get(thread)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("chat {}", thread)))
    }

    async fn run_inference(
        &self,
        _thread: &ThreadId,
        history: &[ChatMessage],
        model: &str,
    ) -> Result<InferenceReply> {
        let mut state = self.state.lock().await;
        if state.record {
            state.inference_inputs.push(history.to_vec());
        }
        state.enter(BackendOp::RunInference)?;

        if let Some(reply) = &state.reply {
            return Ok(reply.clone());
        }

        let last = history
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let mut reply = InferenceReply::new(format!("echo: {}", last));
        reply
            .metadata
            .insert("model".to_string(), serde_json::Value::String(model.to_string()));
        Ok(reply)
    }
}
