//! Authenticated request pipeline
//!
//! Every outbound call goes through [`AuthGateway::send`], which attaches the
//! bearer token and observes the completed response. A 401 from any endpoint
//! forces the session back to the login overlay.

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

use super::overlay::LoginOverlay;
use super::session::SessionState;
use super::storage::{FileTokenStore, TokenStore};
use crate::core::config::Config;
use crate::core::error::{Error, Result};

/// Login endpoint (the only request sent without a bearer token)
pub const LOGIN_PATH: &str = "/auth/login";

/// Identity endpoint
pub const WHOAMI_PATH: &str = "/auth/whoami";

/// Shown in the login form when a 401 is observed
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please login again.";

const LOGIN_FAILED_MESSAGE: &str = "Login failed";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Identity returned by `/auth/whoami`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Identity {
    pub user: Option<String>,
    #[serde(flatten)]
    pub details: serde_json::Map<String, Value>,
}

pub struct AuthGateway {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
    overlay: Arc<LoginOverlay>,
    session: watch::Sender<SessionState>,
}

impl AuthGateway {
    pub fn new(base_url: &str, tokens: Arc<dyn TokenStore>, timeout: Duration) -> Result<Self> {
        // Validate early so every later join is infallible in practice
        Url::parse(base_url)?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("siterm-console/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let (session, _) = watch::channel(SessionState::Unauthenticated);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            overlay: Arc::new(LoginOverlay::new()),
            session,
        })
    }

    /// Gateway for the configured API, storing the token under the console home
    pub fn from_config(config: &Config) -> Result<Self> {
        Config::ensure_home()?;
        let tokens = Arc::new(FileTokenStore::new(Config::token_path()?));
        Self::new(&config.api.base_url, tokens, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub fn overlay(&self) -> &Arc<LoginOverlay> {
        &self.overlay
    }

    /// Watch the authenticated/unauthenticated state
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    pub fn session_state(&self) -> SessionState {
        *self.session.borrow()
    }

    pub(crate) fn set_session_state(&self, state: SessionState) {
        let previous = self.session.send_replace(state);
        if previous != state {
            info!(?previous, current = ?state, "Session state changed");
        }
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> Result<Url> {
        let joined = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        Ok(Url::parse(&joined)?)
    }

    /// Start a request; pass the builder to [`send`](Self::send) to dispatch it
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        Ok(self.client.request(method, self.url(path)?))
    }

    /// Dispatch a request through the pipeline: attach the bearer token, send,
    /// then observe the response status.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let builder = match self.tokens.get() {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => builder,
        };

        let response = builder.send().await?;
        debug!(url = %response.url(), status = %response.status(), "Request completed");
        self.observe(response.status());
        Ok(response)
    }

    /// Authenticated request for call sites that need the raw response
    pub async fn auth_fetch(&self, method: Method, path: &str) -> Result<Response> {
        self.send(self.request(method, path)?).await
    }

    fn observe(&self, status: StatusCode) {
        if status == StatusCode::UNAUTHORIZED {
            warn!("Received 401, forcing re-authentication");
            self.overlay.show_error(SESSION_EXPIRED_MESSAGE);
            self.force_logout();
        }
    }

    /// Exchange credentials for a bearer token
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        self.overlay.show_error("");

        let response = self
            .client
            .post(self.url(LOGIN_PATH)?)
            .json(&LoginRequest { username, password })
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                self.overlay.show_error(&e.to_string());
                return Err(e.into());
            }
        };

        let status = response.status();
        let body: Value = response.json().await.unwrap_or_else(|_| Value::Object(Default::default()));

        let token = body
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty());

        match (status.is_success(), token) {
            (true, Some(token)) => {
                if let Err(e) = self.tokens.set(token) {
                    warn!("Failed to store token: {:#}", e);
                    self.overlay.show_error("Could not store the access token");
                    return Err(Error::Storage(e));
                }
                self.overlay.hide();
                self.set_session_state(SessionState::Authenticated);
                info!(username, "Logged in");
                Ok(())
            }
            _ => {
                let message =
                    extract_message(&body).unwrap_or_else(|| LOGIN_FAILED_MESSAGE.to_string());
                warn!(%status, %message, "Login rejected");
                self.overlay.show_error(&message);
                Err(Error::LoginFailed { message })
            }
        }
    }

    /// Forget the credential locally; the bearer token is stateless on the server.
    ///
    /// The session ends even when the stored token could not be removed; that
    /// failure is returned so the caller can report it.
    pub fn logout(&self) -> Result<()> {
        let cleared = self.tokens.clear();
        self.overlay.show();
        self.set_session_state(SessionState::Unauthenticated);
        cleared.map_err(Error::Storage)
    }

    fn force_logout(&self) {
        if let Err(e) = self.logout() {
            warn!("{}", e);
        }
    }

    /// Current identity, or `None` after forcing a logout. Never errors.
    pub async fn whoami(&self) -> Option<Identity> {
        let response = match self.auth_fetch(Method::GET, WHOAMI_PATH).await {
            Ok(r) => r,
            Err(e) => {
                warn!("whoami failed: {}", e);
                self.force_logout();
                return None;
            }
        };

        if !response.status().is_success() {
            self.force_logout();
            return None;
        }

        match response.json::<Identity>().await {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!("Unreadable whoami response: {}", e);
                self.force_logout();
                None
            }
        }
    }

    /// GET a JSON document, mapping non-2xx answers to errors
    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let builder = self.request(Method::GET, path)?.query(query);
        let response = self.send(builder).await?;
        json_body(response).await
    }

    /// GET a raw text document
    pub async fn get_text(&self, path: &str) -> Result<String> {
        let response = self.auth_fetch(Method::GET, path).await?;
        let response = ensure_success(response).await?;
        Ok(response.text().await?)
    }

    /// Send a JSON body and read a JSON answer
    pub async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Value> {
        let builder = self.request(method, path)?.json(body);
        let response = self.send(builder).await?;
        json_body(response).await
    }
}

/// Pull the operator-facing message out of an error body (`detail`, then `message`)
pub fn extract_message(body: &Value) -> Option<String> {
    ["detail", "message"].iter().find_map(|field| match body.get(*field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    })
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Unauthorized);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|body| extract_message(&body))
        .or_else(|| (!text.trim().is_empty()).then(|| text.trim().to_string()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

    warn!(%status, %message, "Server reported failure");
    Err(Error::Server {
        status: status.as_u16(),
        message,
    })
}

async fn json_body(response: Response) -> Result<Value> {
    let response = ensure_success(response).await?;
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::MemoryTokenStore;
    use crate::test_support::{bearer_of, StubServer};
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    fn gateway(base_url: &str, store: Arc<MemoryTokenStore>) -> AuthGateway {
        AuthGateway::new(base_url, store, Duration::from_secs(5)).unwrap()
    }

    fn login_router() -> Router {
        Router::new()
            .route(
                "/auth/login",
                post(|Json(body): Json<Value>| async move {
                    match (body["username"].as_str(), body["password"].as_str()) {
                        (Some("admin"), Some("secret")) => {
                            (AxumStatus::OK, Json(json!({"access_token": "tok-1"})))
                        }
                        (Some("locked"), _) => (
                            AxumStatus::FORBIDDEN,
                            Json(json!({"message": "Account locked"})),
                        ),
                        (Some("mute"), _) => (AxumStatus::UNAUTHORIZED, Json(json!({}))),
                        _ => (
                            AxumStatus::UNAUTHORIZED,
                            Json(json!({"detail": "Invalid credentials"})),
                        ),
                    }
                }),
            )
            .route(
                "/auth/whoami",
                get(|headers: HeaderMap| async move {
                    match bearer_of(&headers).as_deref() {
                        Some("tok-1") => (AxumStatus::OK, Json(json!({"user": "admin"}))),
                        _ => (AxumStatus::UNAUTHORIZED, Json(json!({"detail": "expired"}))),
                    }
                }),
            )
            .route("/api/alive", get(|| async { Json(json!({"status": "alive"})) }))
    }

    #[tokio::test]
    async fn test_login_stores_token_and_attaches_bearer() {
        let server = StubServer::start(login_router()).await;
        let store = Arc::new(MemoryTokenStore::new());
        let gw = gateway(&server.base_url, store.clone());

        gw.login("admin", "secret").await.unwrap();
        assert_eq!(store.get().as_deref(), Some("tok-1"));
        assert!(!gw.overlay().is_visible());
        assert_eq!(gw.session_state(), SessionState::Authenticated);

        gw.get_json("/api/alive", &[]).await.unwrap();
        gw.whoami().await.unwrap();

        let calls = server.calls();
        let login = calls.iter().find(|c| c.path == "/auth/login").unwrap();
        assert_eq!(login.authorization, None);
        for call in calls.iter().filter(|c| c.path != "/auth/login") {
            assert_eq!(call.authorization.as_deref(), Some("Bearer tok-1"));
        }
    }

    #[tokio::test]
    async fn test_new_login_replaces_bearer() {
        let router = Router::new()
            .route(
                "/auth/login",
                post(|Json(body): Json<Value>| async move {
                    let token = format!("tok-{}", body["username"].as_str().unwrap_or("?"));
                    Json(json!({"access_token": token}))
                }),
            )
            .route("/api/alive", get(|| async { Json(json!({"status": "alive"})) }));
        let server = StubServer::start(router).await;
        let store = Arc::new(MemoryTokenStore::new());
        let gw = gateway(&server.base_url, store.clone());

        gw.login("a", "x").await.unwrap();
        gw.get_json("/api/alive", &[]).await.unwrap();
        gw.login("b", "x").await.unwrap();
        gw.get_json("/api/alive", &[]).await.unwrap();

        let seen: Vec<Option<String>> = server
            .calls()
            .into_iter()
            .filter(|c| c.path == "/api/alive")
            .map(|c| c.authorization)
            .collect();
        assert_eq!(
            seen,
            vec![Some("Bearer tok-a".to_string()), Some("Bearer tok-b".to_string())]
        );
        assert_eq!(store.get().as_deref(), Some("tok-b"));
    }

    #[tokio::test]
    async fn test_login_reports_unstorable_token() {
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join("home");
        std::fs::write(&blocker, "a regular file").unwrap();

        let server = StubServer::start(login_router()).await;
        let store = Arc::new(FileTokenStore::new(blocker.join("tokens.json")));
        let gw = AuthGateway::new(&server.base_url, store.clone(), Duration::from_secs(5)).unwrap();

        let err = gw.login("admin", "secret").await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(store.get(), None);
        assert_eq!(
            gw.overlay().error().as_deref(),
            Some("Could not store the access token")
        );
        assert_eq!(gw.session_state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_login_failure_messages() {
        let server = StubServer::start(login_router()).await;
        let store = Arc::new(MemoryTokenStore::new());
        let gw = gateway(&server.base_url, store.clone());

        let err = gw.login("admin", "wrong").await.unwrap_err();
        assert!(matches!(err, Error::LoginFailed { ref message } if message == "Invalid credentials"));

        let err = gw.login("locked", "x").await.unwrap_err();
        assert_eq!(err.user_message(), "Account locked");
        assert_eq!(gw.overlay().error().as_deref(), Some("Account locked"));

        let err = gw.login("mute", "x").await.unwrap_err();
        assert_eq!(err.user_message(), "Login failed");

        assert_eq!(store.get(), None);
        assert_eq!(gw.session_state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_logout_clears_token_and_shows_overlay() {
        let store = Arc::new(MemoryTokenStore::with_token("tok-1"));
        let gw = gateway("http://127.0.0.1:9", store.clone());
        gw.set_session_state(SessionState::Authenticated);

        gw.logout().unwrap();
        assert_eq!(store.get(), None);
        assert!(gw.overlay().is_visible());
        assert_eq!(gw.session_state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_any_401_clears_token_idempotently() {
        let server = StubServer::start(login_router()).await;
        let store = Arc::new(MemoryTokenStore::with_token("stale"));
        let gw = gateway(&server.base_url, store.clone());

        let response = gw.auth_fetch(Method::GET, WHOAMI_PATH).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(store.get(), None);
        assert!(gw.overlay().is_visible());
        assert_eq!(gw.overlay().error().as_deref(), Some(SESSION_EXPIRED_MESSAGE));

        // Second 401 converges to the same state
        gw.auth_fetch(Method::GET, WHOAMI_PATH).await.unwrap();
        assert_eq!(store.get(), None);
        assert!(gw.overlay().is_visible());
        assert_eq!(gw.session_state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_whoami_swallows_transport_failure() {
        let store = Arc::new(MemoryTokenStore::with_token("tok-1"));
        let gw = gateway(&crate::test_support::closed_port_url().await, store.clone());

        assert_eq!(gw.whoami().await, None);
        assert_eq!(store.get(), None);
        assert!(gw.overlay().is_visible());
    }

    #[test]
    fn test_extract_message_order() {
        assert_eq!(
            extract_message(&json!({"detail": "d", "message": "m"})).as_deref(),
            Some("d")
        );
        assert_eq!(extract_message(&json!({"message": "m"})).as_deref(), Some("m"));
        assert_eq!(extract_message(&json!({"detail": ""})), None);
        assert_eq!(
            extract_message(&json!({"detail": [{"msg": "field required"}]})).as_deref(),
            Some(r#"[{"msg":"field required"}]"#)
        );
    }

    #[test]
    fn test_url_joining() {
        let gw = gateway("https://fe.example.org/", Arc::new(MemoryTokenStore::new()));
        assert_eq!(
            gw.url("/api/T2_US_SDSC/hosts").unwrap().as_str(),
            "https://fe.example.org/api/T2_US_SDSC/hosts"
        );
        assert_eq!(
            gw.url("auth/whoami").unwrap().as_str(),
            "https://fe.example.org/auth/whoami"
        );
    }
}
