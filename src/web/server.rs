//! Axum server for the SiteRM web console

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::page::{self, LOGIN_ACTION, LOGOUT_ACTION};
use crate::api::SiteApi;
use crate::auth::{AuthGateway, SessionController};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::explorer::{Activation, SiteExplorer, TabState, DELETE_HOST_ACTION, RELOAD_CONFIG_ACTION};
use crate::render::alerts::{http_details, show_warning};
use crate::render::SharedDocument;
use crate::status::{HealthIndicator, LayoutGate, StatusPoller};

// =============================================================================
// STATIC FILES (EMBEDDED)
// =============================================================================

const CONSOLE_JS: &str = include_str!("static/console.js");
const CONSOLE_CSS: &str = include_str!("static/console.css");

const PAGE_TITLE: &str = "SiteRM Console";

// =============================================================================
// STATE
// =============================================================================

#[derive(Clone)]
pub struct ConsoleState {
    pub gateway: Arc<AuthGateway>,
    pub api: SiteApi,
    pub document: SharedDocument,
    pub poller: Arc<StatusPoller>,
    explorer: Arc<AsyncMutex<Option<Arc<SiteExplorer>>>>,
}

impl ConsoleState {
    pub fn new(gateway: Arc<AuthGateway>, document: SharedDocument, poller: Arc<StatusPoller>) -> Self {
        Self {
            api: SiteApi::new(gateway.clone()),
            gateway,
            document,
            poller,
            explorer: Arc::new(AsyncMutex::new(None)),
        }
    }

    pub async fn explorer(&self) -> Option<Arc<SiteExplorer>> {
        self.explorer.lock().await.clone()
    }

    /// Build the site explorer once per authenticated session
    pub async fn ensure_explorer(&self) -> Option<Arc<SiteExplorer>> {
        let mut slot = self.explorer.lock().await;
        if let Some(explorer) = slot.as_ref() {
            return Some(explorer.clone());
        }
        if !self.gateway.session_state().is_authenticated() {
            return None;
        }

        page::clear_sites(&mut self.document.lock());
        match SiteExplorer::load(self.api.clone(), self.document.clone()).await {
            Ok(explorer) => {
                let explorer = Arc::new(explorer);
                *slot = Some(explorer.clone());
                Some(explorer)
            }
            Err(e) => {
                warn!(error = %e, "Failed to build site explorer");
                let details = http_details(e.status(), &e.user_message());
                show_warning(
                    &mut self.document.lock(),
                    "Failed to load frontend configuration",
                    Some(details.as_str()),
                );
                None
            }
        }
    }

    /// Drop the explorer and its tabs
    pub async fn reset_explorer(&self) {
        let mut slot = self.explorer.lock().await;
        if slot.take().is_some() {
            info!("Session ended, clearing site tabs");
        }
        page::clear_sites(&mut self.document.lock());
    }
}

/// Keep the explorer in step with the session: built on login, dropped on
/// logout or a 401 seen anywhere.
pub fn spawn_session_watcher(state: ConsoleState) -> JoinHandle<()> {
    let mut session = state.gateway.subscribe();
    tokio::spawn(async move {
        loop {
            let current = *session.borrow_and_update();
            if current.is_authenticated() {
                state.ensure_explorer().await;
            } else {
                state.reset_explorer().await;
            }
            if session.changed().await.is_err() {
                return;
            }
        }
    })
}

// =============================================================================
// API TYPES
// =============================================================================

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct HostForm {
    pub hostname: String,
    #[serde(default)]
    pub ip: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub overlay_visible: bool,
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct PaneResponse {
    pub tab: String,
    pub state: Option<TabState>,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn index_html(State(state): State<ConsoleState>) -> Html<String> {
    let snapshot = state.gateway.overlay().snapshot();
    let mut doc = state.document.lock();
    page::sync_overlay(&mut doc, &snapshot);
    Html(page::render_html(&doc, PAGE_TITLE))
}

async fn console_js() -> Response {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        CONSOLE_JS,
    )
        .into_response()
}

async fn console_css() -> Response {
    ([(header::CONTENT_TYPE, "text/css")], CONSOLE_CSS).into_response()
}

async fn login(State(state): State<ConsoleState>, Form(form): Form<LoginForm>) -> Redirect {
    match state.gateway.login(&form.username, &form.password).await {
        Ok(()) => {
            state.ensure_explorer().await;
        }
        Err(e) => warn!(error = %e, "Console login failed"),
    }
    Redirect::to("/")
}

async fn logout(State(state): State<ConsoleState>) -> Redirect {
    if let Err(e) = state.gateway.logout() {
        warn!(error = %e, "Stored token was not removed");
    }
    state.reset_explorer().await;
    Redirect::to("/")
}

async fn api_session(State(state): State<ConsoleState>) -> Json<SessionResponse> {
    let snapshot = state.gateway.overlay().snapshot();
    Json(SessionResponse {
        authenticated: state.gateway.session_state().is_authenticated(),
        overlay_visible: snapshot.visible,
        error: snapshot.error,
    })
}

async fn api_status(State(state): State<ConsoleState>) -> Json<Vec<HealthIndicator>> {
    Json(state.poller.indicators())
}

async fn api_tab(State(state): State<ConsoleState>, Path(id): Path<String>) -> Response {
    tab_response(&state, &id, false).await
}

async fn api_tab_reload(State(state): State<ConsoleState>, Path(id): Path<String>) -> Response {
    tab_response(&state, &id, true).await
}

async fn tab_response(state: &ConsoleState, id: &str, reload: bool) -> Response {
    let Some(explorer) = state.explorer().await else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let outcome = if reload {
        explorer.reload(id).await
    } else {
        explorer.activate(id).await
    };

    let error = match outcome {
        Activation::Unknown => return StatusCode::NOT_FOUND.into_response(),
        Activation::Failed(message) => Some(message),
        _ => None,
    };

    let entry = explorer.tabs().entry(id);
    let html = entry
        .as_ref()
        .and_then(|entry| {
            let doc = state.document.lock();
            doc.by_id(&entry.pane_id).map(|pane| doc.inner_html(pane))
        })
        .unwrap_or_default();

    Json(PaneResponse {
        tab: id.to_string(),
        state: entry.map(|e| e.state),
        html,
        error,
    })
    .into_response()
}

async fn delete_host(State(state): State<ConsoleState>, Form(form): Form<HostForm>) -> Response {
    let Some(explorer) = state.explorer().await else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    // Outcome is reported into the page
    let _ = explorer.delete_host(&form.hostname, &form.ip).await;
    Redirect::to("/").into_response()
}

async fn reload_host(State(state): State<ConsoleState>, Form(form): Form<HostForm>) -> Response {
    let Some(explorer) = state.explorer().await else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let _ = explorer.reload_config(&form.hostname).await;
    Redirect::to("/").into_response()
}

// =============================================================================
// SERVER
// =============================================================================

pub fn router(state: ConsoleState) -> Router {
    Router::new()
        .route("/", get(index_html))
        .route("/static/console.js", get(console_js))
        .route("/static/console.css", get(console_css))
        .route(LOGIN_ACTION, post(login))
        .route(LOGOUT_ACTION, post(logout))
        .route("/console/session", get(api_session))
        .route("/console/status", get(api_status))
        .route("/console/tabs/:id", get(api_tab))
        .route("/console/tabs/:id/reload", post(api_tab_reload))
        .route(DELETE_HOST_ACTION, post(delete_host))
        .route(RELOAD_CONFIG_ACTION, post(reload_host))
        .with_state(state)
}

pub async fn run(config: &Config, port: u16, open_browser: bool) -> Result<()> {
    let gateway = Arc::new(AuthGateway::from_config(config)?);
    let document = page::skeleton().shared();

    let gate = LayoutGate::new();
    let poller = Arc::new(
        StatusPoller::new(gateway.clone(), config.poll_interval(), gate.clone())
            .with_document(document.clone()),
    );
    let state = ConsoleState::new(gateway.clone(), document, poller.clone());

    let _poller = poller.spawn();
    let _watcher = spawn_session_watcher(state.clone());
    gate.mark_ready();

    eprintln!("\x1b[36m>\x1b[0m Checking session against {}...", gateway.base_url());
    let initial = SessionController::new(gateway.clone()).boot().await;
    if !initial.is_authenticated() {
        eprintln!("\x1b[33m>\x1b[0m Not logged in; use the login form in the browser.");
    }

    let app = router(state);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    eprintln!();
    eprintln!(
        "\x1b[36m>\x1b[0m siterm-console web running at \x1b[36mhttp://{}\x1b[0m",
        addr
    );
    eprintln!("\x1b[90m  Press Ctrl+C to stop\x1b[0m");

    if open_browser {
        let url = format!("http://{}", addr);
        let _ = open::that(&url);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;
    use crate::test_support::{bearer_of, StubServer};
    use axum::extract::Query;
    use axum::http::HeaderMap;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::time::Duration;

    fn site_api() -> Router {
        Router::new()
            .route(
                "/auth/login",
                post(|Json(body): Json<Value>| async move {
                    if body["password"] == "secret" {
                        (StatusCode::OK, Json(json!({"access_token": "tok-1"})))
                    } else {
                        (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid credentials"})))
                    }
                }),
            )
            .route(
                "/api/frontend/configuration",
                get(|headers: HeaderMap| async move {
                    match bearer_of(&headers).as_deref() {
                        Some("tok-1") => (
                            StatusCode::OK,
                            Json(json!({"general": {"sitename": "T2_TEST"}})),
                        ),
                        _ => (StatusCode::UNAUTHORIZED, Json(json!({"detail": "expired"}))),
                    }
                }),
            )
            .route(
                "/api/:site/hosts",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    match q.get("hostname") {
                        None => Json(json!([{"hostname": "dtn1.example.org"}])),
                        Some(_) => Json(json!([{
                            "hostname": "dtn1.example.org",
                            "hostinfo": {"NetInfo": {"mtu": 9000}}
                        }])),
                    }
                }),
            )
            .route("/api/alive", get(|| async { Json(json!({"status": "alive"})) }))
    }

    async fn console(api: &StubServer) -> (StubServer, ConsoleState) {
        let store = Arc::new(MemoryTokenStore::new());
        let gateway = Arc::new(AuthGateway::new(&api.base_url, store, Duration::from_secs(5)).unwrap());
        let document = page::skeleton().shared();
        let poller = Arc::new(
            StatusPoller::new(gateway.clone(), Duration::from_secs(60), LayoutGate::open())
                .with_document(document.clone()),
        );
        let state = ConsoleState::new(gateway.clone(), document, poller);
        SessionController::new(gateway).boot().await;
        (StubServer::start(router(state.clone())).await, state)
    }

    #[tokio::test]
    async fn test_index_shows_overlay_without_token() {
        let api = StubServer::start(site_api()).await;
        let (web, _state) = console(&api).await;

        let html = reqwest::get(format!("{}/", web.base_url)).await.unwrap().text().await.unwrap();
        assert!(html.contains("id=\"login-overlay\""));
        assert!(html.contains("style=\"display:flex\""));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_login_builds_tabs_and_lazy_pane_loads_once() {
        let api = StubServer::start(site_api()).await;
        let (web, state) = console(&api).await;
        let client = reqwest::Client::new();

        let page = client
            .post(format!("{}/console/login", web.base_url))
            .form(&[("username", "admin"), ("password", "secret")])
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(page.contains("style=\"display:none\""));
        assert!(page.contains("T2_TEST FE"));
        assert!(state.explorer().await.is_some());

        let tab_url = format!("{}/console/tabs/tab_T2_TEST_dtn1_example_org", web.base_url);
        for _ in 0..2 {
            let pane: Value = client.get(&tab_url).send().await.unwrap().json().await.unwrap();
            assert_eq!(pane["state"], "loaded");
            assert!(pane["html"].as_str().unwrap().contains("mtu"));
        }
        // One listing plus exactly one detail fetch
        assert_eq!(api.calls_to("/api/T2_TEST/hosts"), 2);
    }

    #[tokio::test]
    async fn test_bad_login_keeps_overlay_with_error() {
        let api = StubServer::start(site_api()).await;
        let (web, state) = console(&api).await;

        let page = reqwest::Client::new()
            .post(format!("{}/console/login", web.base_url))
            .form(&[("username", "admin"), ("password", "wrong")])
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(page.contains("Invalid credentials"));
        assert!(state.explorer().await.is_none());

        let session: Value = reqwest::get(format!("{}/console/session", web.base_url))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(session["authenticated"], false);
        assert_eq!(session["overlay_visible"], true);
    }

    #[tokio::test]
    async fn test_tab_requires_session() {
        let api = StubServer::start(site_api()).await;
        let (web, _state) = console(&api).await;

        let response = reqwest::get(format!("{}/console/tabs/anything", web.base_url))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 401);
    }

    #[tokio::test]
    async fn test_status_reports_indicators() {
        let api = StubServer::start(site_api()).await;
        let (web, state) = console(&api).await;
        state.poller.tick().await;

        let indicators: Vec<Value> = reqwest::get(format!("{}/console/status", web.base_url))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(indicators.len(), 5);
        assert_eq!(indicators[0]["element_id"], "alive-status");
        assert_eq!(indicators[0]["text"], "Alive: ALIVE");
    }
}
