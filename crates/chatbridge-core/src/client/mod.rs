//! REST client for the chat backend.
//!
//! Speaks the backend's `/users`, `/chats`, `/messages` and `/neuro` routes.
//! CRUD responses arrive wrapped in a `{"data": ..., "meta": {}}` envelope;
//! the inference route answers with a bare object.
//!
//! # Usage
//!
//! ```rust,no_run
//! use chatbridge_core::backend::ChatBackend;
//! use chatbridge_core::client::{BackendClient, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = BackendClient::new(ClientConfig::new("http://localhost:8000/api/v1"))?;
//!     let account = client.get_account(&"42".into()).await?;
//!     println!("{:?}", account);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::backend::ChatBackend;
use crate::error::{Error, Result};
use crate::types::{AccountId, ChatMessage, IdentityHint, InferenceReply, Role, ThreadId, ThreadSummary};

/// Default transport timeout; inference on a local model can be slow
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection settings for [`BackendClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL the backend routes hang off, without a trailing slash
    pub base_url: String,
    /// Bearer token attached to every request
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// API client for the chat backend
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the backend answers at all.
    ///
    /// Backends without a `/health` route answer 404, which still counts as
    /// reachable; only a 5xx marks the backend unhealthy.
    pub async fn health_check(&self) -> Result<bool> {
        let resp = self.builder(reqwest::Method::GET, "/health").send().await?;
        Ok(!resp.status().is_server_error())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // HTTP Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn builder(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("Backend request: {} {}", method, url);

        let mut req = self.client.request(method, &url);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let req = self.builder(reqwest::Method::GET, path).query(query);
        Self::send(req, path).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let req = self.builder(reqwest::Method::POST, path).json(body);
        Self::send(req, path).await
    }

    /// POST where only the status matters; the body is ignored
    async fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let req = self.builder(reqwest::Method::POST, path).json(body);
        Self::checked(req.send().await?, path).await?;
        Ok(())
    }

    async fn send<T: DeserializeOwned>(req: reqwest::RequestBuilder, path: &str) -> Result<T> {
        let resp = Self::checked(req.send().await?, path).await?;
        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Every non-2xx becomes `Error::Api` carrying the upstream body as-is.
    /// Routes that give 404 a meaning translate it themselves.
    async fn checked(resp: reqwest::Response, path: &str) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!("Failed to read error body from {}: {}", path, e);
                format!("<unreadable response body: {}>", e)
            }
        };
        Err(Error::api(status.as_u16(), body))
    }

    /// Map the backend's "nothing here" 404 to an empty list
    fn empty_on_not_found<T>(result: Result<Vec<T>>) -> Result<Vec<T>> {
        match result {
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            other => other,
        }
    }
}

#[async_trait]
impl ChatBackend for BackendClient {
    async fn get_account(&self, identity: &IdentityHint) -> Result<Option<AccountId>> {
        let result: Result<Envelope<UserData>> = self
            .get("/users/get", &[("telegram_id", identity.as_str())])
            .await;
        match result {
            Ok(env) => Ok(Some(env.data.user_id)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_account(&self, identity: &IdentityHint) -> Result<AccountId> {
        let req = CreateUserRequest {
            telegram_id: identity.as_str(),
        };
        let env: Envelope<UserData> = self.post("/users/add", &req).await?;
        Ok(env.data.user_id)
    }

    async fn list_threads(&self, account: AccountId) -> Result<Vec<ThreadSummary>> {
        let user_id = account.to_string();
        let result: Result<Envelope<ChatsData>> = self
            .get("/chats/get_all_chats", &[("user_id", user_id.as_str())])
            .await;
        Self::empty_on_not_found(result.map(|env| env.data.chats))
    }

    async fn create_thread(&self, account: AccountId, title: &str, model: &str) -> Result<ThreadId> {
        let req = CreateChatRequest {
            user_id: account,
            chat_title: title,
            model,
        };
        let env: Envelope<CreatedChatData> = self.post("/chats/create", &req).await?;
        Ok(env.data.chat_id)
    }

    async fn append_message(&self, thread: &ThreadId, role: Role, content: &str) -> Result<()> {
        let req = AddMessageRequest {
            chat_id: thread,
            role,
            content,
        };
        self.post_unit("/messages/add", &req).await
    }

    /// The backend answers 404 for a thread with no messages; that stays an
    /// error here, since a fetch right after an append must see the turn.
    async fn get_history(&self, thread: &ThreadId) -> Result<Vec<ChatMessage>> {
        let env: Envelope<MessagesData> = self
            .get("/messages/get_all_messages", &[("chat_id", thread.as_str())])
            .await?;
        Ok(env.data.messages)
    }

    async fn run_inference(
        &self,
        thread: &ThreadId,
        history: &[ChatMessage],
        model: &str,
    ) -> Result<InferenceReply> {
        let req = InferenceRequest {
            chat_id: thread,
            messages: history,
            model,
        };
        self.post("/neuro/chat", &req).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

/// `{"data": ..., "meta": {}}` wrapper around backend CRUD responses
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct UserData {
    pub user_id: AccountId,
}

#[derive(Debug, Deserialize)]
pub struct ChatsData {
    #[serde(default)]
    pub chats: Vec<ThreadSummary>,
}

#[derive(Debug, Deserialize)]
pub struct CreatedChatData {
    pub chat_id: ThreadId,
}

#[derive(Debug, Deserialize)]
pub struct MessagesData {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct CreateUserRequest<'a> {
    telegram_id: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateChatRequest<'a> {
    user_id: AccountId,
    chat_title: &'a str,
    model: &'a str,
}

#[derive(Debug, Serialize)]
struct AddMessageRequest<'a> {
    chat_id: &'a ThreadId,
    role: Role,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    chat_id: &'a ThreadId,
    messages: &'a [ChatMessage],
    model: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = BackendClient::new(ClientConfig::new("http://localhost:8000/api/v1/")).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/api/v1");
    }

    #[test]
    fn test_client_config_builders() {
        let config = ClientConfig::new("http://backend")
            .with_token("secret")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_user_envelope_decoding() {
        let env: Envelope<UserData> = serde_json::from_value(json!({
            "data": {"user_id": 7, "status": "found"},
            "meta": {}
        }))
        .unwrap();
        assert_eq!(env.data.user_id, AccountId(7));
    }

    #[test]
    fn test_chats_envelope_decoding() {
        let env: Envelope<ChatsData> = serde_json::from_value(json!({
            "data": {
                "chats": [
                    {"chat_id": "a1", "title": "New chat"},
                    {"chat_id": "b2", "title": "Second"}
                ],
                "status": "found"
            },
            "meta": {}
        }))
        .unwrap();
        let ids: Vec<_> = env.data.chats.iter().map(|c| c.thread_id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "b2"]);
    }

    #[test]
    fn test_messages_envelope_decoding() {
        let env: Envelope<MessagesData> = serde_json::from_value(json!({
            "data": {
                "messages": [
                    {"message_id": "m1", "role": "user", "content": "hello"},
                    {"message_id": "m2", "role": "assistant", "content": "hi"}
                ]
            }
        }))
        .unwrap();
        assert_eq!(
            env.data.messages,
            vec![ChatMessage::user("hello"), ChatMessage::assistant("hi")]
        );
    }

    #[test]
    fn test_request_wire_format() {
        let thread = ThreadId::new("c-1");
        let history = vec![ChatMessage::user("hello")];
        let req = InferenceRequest {
            chat_id: &thread,
            messages: &history,
            model: "llama3.1",
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "chat_id": "c-1",
                "messages": [{"role": "user", "content": "hello"}],
                "model": "llama3.1"
            })
        );

        let req = CreateChatRequest {
            user_id: AccountId(3),
            chat_title: "New chat",
            model: "llama3.1",
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"user_id": 3, "chat_title": "New chat", "model": "llama3.1"})
        );
    }

    #[test]
    fn test_empty_on_not_found() {
        let result: Result<Vec<ThreadSummary>> = Err(Error::api(404, "No chats found"));
        assert!(BackendClient::empty_on_not_found(result).unwrap().is_empty());

        let result: Result<Vec<ThreadSummary>> = Err(Error::api(500, "boom"));
        assert!(BackendClient::empty_on_not_found(result).is_err());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Against a local backend
    // ─────────────────────────────────────────────────────────────────────────

    mod live {
        use super::*;
        use crate::orchestrator::{MessageRequest, OrchestrationError, Orchestrator};
        use axum::http::{HeaderMap, StatusCode};
        use axum::routing::{get, post, MethodRouter};
        use axum::{Json, Router};

        const NOT_FOUND_BODY: &str = r#"{"detail":"model not found"}"#;

        /// Serve `router` on an ephemeral port and return its base URL
        async fn bind(router: Router) -> String {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, router).await.unwrap();
            });
            format!("http://{}", addr)
        }

        async fn serve(router: Router) -> BackendClient {
            BackendClient::new(ClientConfig::new(bind(router).await)).unwrap()
        }

        fn history_ok() -> MethodRouter {
            get(|| async {
                Json(json!({"data": {"messages": [{"role": "user", "content": "hello"}]}, "meta": {}}))
            })
        }

        /// Backend with one user (id 1) owning one chat; history and inference are supplied
        fn backend_routes(history: MethodRouter, inference: MethodRouter) -> Router {
            Router::new()
                .route(
                    "/users/get",
                    get(|| async { Json(json!({"data": {"user_id": 1, "status": "found"}, "meta": {}})) }),
                )
                .route(
                    "/chats/get_all_chats",
                    get(|| async {
                        Json(json!({"data": {"chats": [{"chat_id": "c-1", "title": "New chat"}]}, "meta": {}}))
                    }),
                )
                .route("/messages/add", post(|| async { StatusCode::CREATED }))
                .route("/messages/get_all_messages", history)
                .route("/neuro/chat", inference)
        }

        #[tokio::test]
        async fn test_missing_user_is_none() {
            let client = serve(Router::new().route(
                "/users/get",
                get(|| async { (StatusCode::NOT_FOUND, r#"{"detail":"User not found"}"#) }),
            ))
            .await;

            assert_eq!(client.get_account(&"42".into()).await.unwrap(), None);
        }

        #[tokio::test]
        async fn test_found_user_and_bearer_token() {
            let router = Router::new().route(
                "/users/get",
                get(|headers: HeaderMap| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    if auth == "Bearer s3cret" {
                        (StatusCode::OK, Json(json!({"data": {"user_id": 7}, "meta": {}})))
                    } else {
                        (StatusCode::UNAUTHORIZED, Json(json!({"detail": "no token"})))
                    }
                }),
            );
            let base_url = bind(router).await;
            let client = BackendClient::new(ClientConfig::new(base_url).with_token("s3cret")).unwrap();

            assert_eq!(client.get_account(&"42".into()).await.unwrap(), Some(AccountId(7)));
        }

        #[tokio::test]
        async fn test_no_chats_is_empty_list() {
            let client = serve(Router::new().route(
                "/chats/get_all_chats",
                get(|| async { (StatusCode::NOT_FOUND, r#"{"detail":"No chats found"}"#) }),
            ))
            .await;

            assert!(client.list_threads(AccountId(1)).await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_chat_list_server_error_is_kept() {
            let client = serve(Router::new().route(
                "/chats/get_all_chats",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error") }),
            ))
            .await;

            let err = client.list_threads(AccountId(1)).await.unwrap_err();
            assert_eq!(err.status(), Some(500));
        }

        #[tokio::test]
        async fn test_history_not_found_is_an_error() {
            let client = serve(Router::new().route(
                "/messages/get_all_messages",
                get(|| async { (StatusCode::NOT_FOUND, r#"{"detail":"No messages found"}"#) }),
            ))
            .await;

            let err = client.get_history(&ThreadId::new("c-1")).await.unwrap_err();
            assert!(err.is_not_found());
        }

        #[tokio::test]
        async fn test_append_accepts_empty_success_body() {
            let client = serve(backend_routes(history_ok(), post(|| async { StatusCode::OK }))).await;

            client
                .append_message(&ThreadId::new("c-1"), Role::User, "hello")
                .await
                .unwrap();
        }

        #[tokio::test]
        async fn test_inference_error_keeps_status_and_body() {
            let client = serve(Router::new().route(
                "/neuro/chat",
                post(|| async { (StatusCode::NOT_FOUND, NOT_FOUND_BODY) }),
            ))
            .await;

            let err = client
                .run_inference(&ThreadId::new("c-1"), &[ChatMessage::user("hello")], "qwen")
                .await
                .unwrap_err();

            match err {
                Error::Api { status, body } => {
                    assert_eq!(status, 404);
                    assert_eq!(body, NOT_FOUND_BODY);
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_orchestrated_inference_404_reaches_caller_verbatim() {
            let router = backend_routes(
                history_ok(),
                post(|| async { (StatusCode::NOT_FOUND, NOT_FOUND_BODY) }),
            );
            let orch = Orchestrator::new(serve(router).await);

            let err = orch
                .handle_message(MessageRequest::new("42", "hello"))
                .await
                .unwrap_err();

            assert_eq!(err.kind(), "INFERENCE_FAILED");
            assert_eq!(err.status(), 404);
            assert_eq!(err.detail(), NOT_FOUND_BODY);
        }

        #[tokio::test]
        async fn test_orchestrated_history_404_aborts_before_inference() {
            let router = backend_routes(
                get(|| async { (StatusCode::NOT_FOUND, r#"{"detail":"No messages found"}"#) }),
                post(|| async { Json(json!({"reply": "should not be reached"})) }),
            );
            let orch = Orchestrator::new(serve(router).await);

            let err = orch
                .handle_message(MessageRequest::new("42", "hello"))
                .await
                .unwrap_err();

            assert!(matches!(err, OrchestrationError::HistoryFetchFailed(_)));
            assert_eq!(err.status(), 404);
        }

        #[tokio::test]
        async fn test_orchestrated_happy_path() {
            let router = backend_routes(
                history_ok(),
                post(|| async { Json(json!({"reply": "hi!", "model": "llama3.1"})) }),
            );
            let orch = Orchestrator::new(serve(router).await);

            let delivery = orch
                .handle_message(MessageRequest::new("42", "hello"))
                .await
                .unwrap();

            assert_eq!(delivery.reply.reply, "hi!");
            assert!(delivery.persisted);
        }

        #[tokio::test]
        async fn test_truncated_error_body_still_reports_status() {
            use tokio::io::{AsyncReadExt, AsyncWriteExt};

            // Promise 64 bytes of body, send 5, then hang up
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                socket
                    .write_all(b"HTTP/1.1 502 Bad Gateway\r\nContent-Length: 64\r\n\r\nshort")
                    .await
                    .unwrap();
            });
            let client =
                BackendClient::new(ClientConfig::new(format!("http://{}", addr))).unwrap();

            let err = client
                .run_inference(&ThreadId::new("c-1"), &[ChatMessage::user("hello")], "qwen")
                .await
                .unwrap_err();

            match err {
                Error::Api { status, body } => {
                    assert_eq!(status, 502);
                    assert!(body.starts_with("<unreadable response body:"), "{}", body);
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_health_check_reachability() {
            // No /health route: the 404 still proves the backend is up
            let client = serve(Router::new()).await;
            assert!(client.health_check().await.unwrap());

            let client = serve(Router::new().route(
                "/health",
                get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
            ))
            .await;
            assert!(!client.health_check().await.unwrap());
        }
    }
}
