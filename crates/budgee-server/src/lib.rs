//! Budgee Web Server
//!
//! Axum-based REST API for the Budgee mood-aware budgeting tool.
//!
//! Security features:
//! - Authentication by API key, Cloudflare Access header or trusted network
//!   (secure by default, use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Input validation (pagination limits, request bodies rejected at the boundary)
//! - Audit logging for API access
//! - Sanitized error responses

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::{FixedOffset, Offset, Utc};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use budgee_core::{AIBackend, AIClient, Advisor, Database, EventBus};

mod handlers;
pub mod mcp;
mod scheduler;

pub use scheduler::{run_reset_check, start_reset_scheduler, ResetScheduleConfig};

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Cloudflare Access header for authenticated user email
pub(crate) const CF_ACCESS_USER_HEADER: &str = "cf-access-authenticated-user-email";

/// Authorization header for API key auth
pub(crate) const AUTHORIZATION_HEADER: &str = "authorization";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// API keys accepted as "Bearer <key>" in the Authorization header
    pub api_keys: Vec<String>,
    /// Networks that bypass authentication (e.g., "192.168.1.0/24", "10.0.0.5")
    pub trusted_networks: Vec<ipnet::IpNet>,
    /// Proxies whose X-Forwarded-For headers are trusted
    pub trusted_proxies: Vec<ipnet::IpNet>,
    /// Offset used to group expenses into calendar days
    pub utc_offset: FixedOffset,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
            trusted_networks: vec![],
            trusted_proxies: vec![],
            utc_offset: Utc.fix(),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    /// Mindful advisor, absent when no AI backend is configured
    pub advisor: Option<Advisor>,
    /// Change feed for live clients
    pub events: EventBus,
}

impl AppState {
    pub fn new(
        db: Database,
        config: ServerConfig,
        advisor: Option<Advisor>,
        events: EventBus,
    ) -> Self {
        Self {
            db,
            config,
            advisor,
            events,
        }
    }

    /// State with the advisor built from `BUDGEE_AI_BACKEND` / `OLLAMA_HOST`
    pub fn from_env(db: Database, config: ServerConfig) -> Self {
        let advisor = AIClient::from_env().map(Advisor::new);
        match advisor {
            Some(ref advisor) => {
                let client = advisor.client();
                let router_info = client.router_info();
                info!(
                    "AI backend configured: {} (default model: {}, fallback: {})",
                    client.host(),
                    router_info.default_model,
                    router_info.fallback_model.as_deref().unwrap_or("none")
                );
                for (task, model) in &router_info.task_models {
                    info!("  - {}: {}", task, model);
                }
            }
            None => info!("AI backend not configured (set OLLAMA_HOST to enable the advisor)"),
        }

        Self::new(db, config, advisor, EventBus::new())
    }

    /// The advisor, or a 503 when AI is not configured
    pub fn advisor(&self) -> Result<&Advisor, AppError> {
        self.advisor.as_ref().ok_or_else(|| {
            AppError::service_unavailable(
                "AI advisor not configured. Set OLLAMA_HOST or BUDGEE_AI_BACKEND.",
            )
        })
    }
}

/// Authentication middleware
///
/// Attaches the resolved [`handlers::auth::Identity`] to the request, or answers 401.
/// API keys are compared in constant time.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    match handlers::auth::identify(&state.config, &request, connect_info.as_ref()) {
        Some(identity) => {
            tracing::debug!(
                user = %identity.user,
                method = ?identity.auth_method,
                %path,
                "Authenticated"
            );
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        None => {
            warn!(%path, "Unauthorized request - no valid auth");
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "Authentication required" })),
            )
                .into_response()
        }
    }
}

/// Validate an API key against the configured keys in constant time
pub(crate) fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();
    valid_keys.iter().any(|key| {
        let key_bytes = key.as_bytes();
        provided_bytes.len() == key_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes))
    })
}

/// Extract client IP address, respecting trusted proxies
///
/// X-Forwarded-For is only read when the TCP peer is a configured trusted
/// proxy. Otherwise the peer address is used.
pub(crate) fn get_client_ip(
    request: &Request,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    trusted_proxies: &[ipnet::IpNet],
) -> Option<std::net::IpAddr> {
    let peer_ip = connect_info.map(|ci| ci.0.ip())?;

    if !trusted_proxies.iter().any(|net| net.contains(&peer_ip)) {
        return Some(peer_ip);
    }

    // "client, proxy1, proxy2": the first entry is the original client
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());
    if forwarded.is_some() {
        return forwarded;
    }

    request
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|ip| ip.trim().parse().ok())
        .or(Some(peer_ip))
}

/// Parse a comma-separated list of IP addresses and CIDR networks
///
/// Examples:
/// - "192.168.1.0/24" - entire subnet
/// - "10.0.0.5" - single IP (parsed as /32 for IPv4 or /128 for IPv6)
/// - "192.168.1.0/24,10.0.0.0/8" - multiple networks
pub fn parse_trusted_networks(input: &str) -> Vec<ipnet::IpNet> {
    input
        .split(',')
        .filter_map(|s| {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if let Ok(net) = s.parse::<ipnet::IpNet>() {
                return Some(net);
            }
            if let Ok(ip) = s.parse::<std::net::IpAddr>() {
                return Some(ipnet::IpNet::from(ip));
            }
            warn!(input = s, "Failed to parse trusted network entry");
            None
        })
        .collect()
}

/// Extract the user identifier from request headers (for audit logging)
///
/// Returns the CF Access email, "api-key" for API key auth, or "local-dev".
pub fn get_user_email(headers: &axum::http::HeaderMap) -> String {
    if let Some(email) = headers
        .get(CF_ACCESS_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
    {
        return email.to_string();
    }

    if headers
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .is_some()
    {
        return "api-key".to_string();
    }

    "local-dev".to_string()
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router, with the advisor taken from the environment
pub fn create_router(db: Database, static_dir: Option<&str>, config: ServerConfig) -> Router {
    create_router_with_state(Arc::new(AppState::from_env(db, config)), static_dir)
}

/// Create the application router around prepared state (for testing)
pub fn create_router_with_state(state: Arc<AppState>, static_dir: Option<&str>) -> Router {
    let config = state.config.clone();

    let api_routes = Router::new()
        // Auth
        .route("/me", get(handlers::get_me))
        // Transactions
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route("/transactions/totals", get(handlers::transaction_totals))
        .route(
            "/transactions/:id",
            get(handlers::get_transaction)
                .patch(handlers::update_transaction)
                .delete(handlers::delete_transaction),
        )
        // Budget and savings
        .route(
            "/budget",
            get(handlers::get_budget).put(handlers::set_budget),
        )
        .route("/budget/deposit", post(handlers::deposit_budget))
        .route("/budget/reset", post(handlers::reset_budget))
        .route("/savings/deposit", post(handlers::deposit_savings))
        .route("/savings/withdraw", post(handlers::withdraw_savings))
        // Mood
        .route("/mood/chart", get(handlers::get_mood_chart))
        .route("/mood/patterns", get(handlers::get_mood_patterns))
        // Advisor
        .route("/analysis", post(handlers::analyze_spending))
        .route("/ai/health", get(handlers::ai_health))
        // Notifications
        .route(
            "/notifications",
            get(handlers::list_notifications)
                .post(handlers::create_notification)
                .delete(handlers::clear_notifications),
        )
        .route("/notifications/:id", delete(handlers::remove_notification))
        // Conversations
        .route(
            "/conversations",
            get(handlers::list_conversations).post(handlers::create_conversation),
        )
        .route(
            "/conversations/:id",
            patch(handlers::rename_conversation).delete(handlers::delete_conversation),
        )
        .route(
            "/conversations/:id/messages",
            get(handlers::list_messages).post(handlers::send_message),
        )
        // Change feed
        .route("/events", get(handlers::stream_events))
        // Export
        .route("/export", get(handlers::export_transactions))
        // Audit log
        .route("/audit", get(handlers::list_audit_log))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        // Liveness stays outside authentication
        .route("/health", get(handlers::health));

    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    // CSP: scripts same-origin only, inline styles allowed for the chart
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' blob: data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    serve_with_config(db, host, port, static_dir, ServerConfig::default()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("Authentication disabled - do not expose to network!");
    }

    check_ai_connection().await;

    let state = Arc::new(AppState::from_env(db, config));

    if let Some(reset_config) = ResetScheduleConfig::from_env() {
        start_reset_scheduler(state.db.clone(), state.events.clone(), reset_config);
    }

    let app = create_router_with_state(state, static_dir)
        .into_make_service_with_connect_info::<SocketAddr>();
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log AI backend connection status
async fn check_ai_connection() {
    match AIClient::from_env() {
        Some(client) => {
            let router_info = client.router_info();

            if client.health_check().await {
                info!(
                    "AI backend connected: {} (default: {}, fallback: {})",
                    client.host(),
                    router_info.default_model,
                    router_info.fallback_model.as_deref().unwrap_or("none")
                );
            } else {
                warn!(
                    "AI backend configured but not responding: {} (default: {})",
                    client.host(),
                    router_info.default_model
                );
            }
        }
        None => {
            info!("AI backend not configured (set OLLAMA_HOST to enable the advisor)");
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn new(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn conflict(msg: &str) -> Self {
        Self::new(StatusCode::CONFLICT, msg)
    }

    pub fn service_unavailable(msg: &str) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, msg)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        use budgee_core::Error as CoreError;

        let err = err.into();
        let client_error = match err.downcast_ref::<CoreError>() {
            Some(CoreError::InvalidData(_))
            | Some(CoreError::InsufficientBudget { .. })
            | Some(CoreError::InsufficientSavings { .. }) => Some(StatusCode::BAD_REQUEST),
            Some(CoreError::NotFound(_)) => Some(StatusCode::NOT_FOUND),
            Some(CoreError::Ai(_)) | Some(CoreError::Http(_)) => {
                Some(StatusCode::SERVICE_UNAVAILABLE)
            }
            _ => None,
        };

        match client_error {
            // Validation and lookup failures carry no internals worth hiding
            Some(status) if status != StatusCode::SERVICE_UNAVAILABLE => Self {
                status,
                message: err.to_string(),
                internal: None,
            },
            Some(status) => Self {
                status,
                message: "AI backend unavailable".to_string(),
                internal: Some(err),
            },
            None => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "An internal error occurred".to_string(),
                internal: Some(err),
            },
        }
    }
}

#[cfg(test)]
mod tests;
