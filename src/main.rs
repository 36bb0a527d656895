mod config;
mod db;
mod discovery;
mod error;
mod routes;
mod store;
mod tier;

use axum::ServiceExt;
use axum::{
    Router,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine;
use clap::Parser;
use config::{Config, CorsMode};
use reqwest::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use store::{ModelStore, PromptStore, ProviderStore, TierStore, UserStore};
use subtle::ConstantTimeEq;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::normalize_path::NormalizePath;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa_axum::{router::OpenApiRouter, routes};

/// Session TTL: 24 hours (matches cookie Max-Age)
const SESSION_TTL_SECS: u64 = 86400;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_HASH: &str = env!("GIT_HASH");
pub const BUILD_TIME: &str = env!("BUILD_TIME");

pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

pub struct AppState {
    pub providers: ProviderStore,
    pub models: ModelStore,
    pub tiers: TierStore,
    pub users: UserStore,
    pub prompts: PromptStore,
    pub http_client: Client,
    pub admin_credentials: AdminCredentials,
    /// Whether to set Secure flag on cookies (true when not binding to localhost)
    pub secure_cookies: bool,
    /// When true, admin auth middleware is bypassed (for local development)
    pub disable_auth: bool,
}

/// Save a session token to the database
pub async fn save_session(token: &str, expires_at: u64) {
    if let Ok(conn) = db::get_conn()
        && let Err(e) = conn
            .execute(
                "INSERT OR REPLACE INTO admin_sessions (token, expires_at) VALUES (?, ?)",
                (token, expires_at as i64),
            )
            .await
    {
        tracing::warn!("Failed to save session: {e}");
    }
}

/// Validate a session token, returns true if valid and not expired
pub async fn validate_session(token: &str) -> bool {
    let Ok(conn) = db::get_conn() else {
        return false;
    };
    let Ok(mut rows) = conn
        .query(
            "SELECT expires_at FROM admin_sessions WHERE token = ?",
            [token],
        )
        .await
    else {
        return false;
    };
    let Some(row) = rows.next().await.ok().flatten() else {
        return false;
    };
    let Ok(expires_at) = row.get::<i64>(0) else {
        return false;
    };
    let now = now_secs() as i64;
    if now < expires_at {
        return true;
    }
    // Expired — clean it up
    let _ = conn
        .execute("DELETE FROM admin_sessions WHERE token = ?", [token])
        .await;
    false
}

/// Remove a session token from the database
pub async fn remove_session(token: &str) {
    if let Ok(conn) = db::get_conn() {
        let _ = conn
            .execute("DELETE FROM admin_sessions WHERE token = ?", [token])
            .await;
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[derive(Parser)]
#[command(name = "chat-admin")]
#[command(about = "Admin API for the chat product: providers, models, tiers, users")]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, env = "CHAT_ADMIN_HOST")]
    host: Option<String>,

    /// Port to bind to
    #[arg(short, long, env = "CHAT_ADMIN_PORT")]
    port: Option<u16>,
}

/// Parse a named cookie from the Cookie header
pub fn parse_cookie(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|cookie| {
        let (key, value) = cookie.trim().split_once('=')?;
        if key.trim() == name {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}

/// Extract the session token from a request: the session cookie or a
/// bearer Authorization header (the dashboard stores the token client-side
/// and sends it as a bearer credential).
pub fn session_token_from(headers: &HeaderMap) -> Option<String> {
    if let Some(cookie_header) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok())
        && let Some(token) = parse_cookie(cookie_header, "admin_session")
    {
        return Some(token);
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Middleware for admin routes authentication (session cookie, bearer
/// token, or Basic Auth). Every failure is the same uniform 401: the
/// dashboard treats any 401 as fatal-to-session.
async fn admin_auth_middleware(
    State(state): State<Arc<AppState>>,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    if state.disable_auth {
        return next.run(request).await;
    }

    let creds = &state.admin_credentials;

    // Check for a session token first (cookie or bearer)
    if let Some(token) = session_token_from(request.headers())
        && validate_session(&token).await
    {
        return next.run(request).await;
    }

    // Fall through to Basic Auth check
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let Some(auth_value) = auth_header else {
        return unauthorized_response();
    };

    let Some(encoded) = auth_value.strip_prefix("Basic ") else {
        return unauthorized_response();
    };

    let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(encoded) else {
        return unauthorized_response();
    };

    let Ok(credentials) = String::from_utf8(decoded) else {
        return unauthorized_response();
    };

    let Some((provided_user, provided_pass)) = credentials.split_once(':') else {
        return unauthorized_response();
    };

    // Constant-time comparison to prevent timing attacks
    let user_match = provided_user.as_bytes().ct_eq(creds.username.as_bytes());
    let pass_match = provided_pass.as_bytes().ct_eq(creds.password.as_bytes());

    if user_match.into() && pass_match.into() {
        next.run(request).await
    } else {
        unauthorized_response()
    }
}

fn unauthorized_response() -> Response {
    (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::from_env();

    // Initialize database (before moving fields out of config)
    db::init_db(&config.db_path())
        .await
        .expect("Failed to initialize database");

    let host = args.host.unwrap_or(config.host);
    let port = args.port.unwrap_or(config.port);

    // Shared HTTP client for upstream model discovery
    let http_client = Client::builder()
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(10)
        .build()
        .expect("Failed to create HTTP client");

    let admin_credentials = AdminCredentials {
        username: config.admin_username,
        password: config.admin_password,
    };

    let is_localhost = matches!(host.as_str(), "127.0.0.1" | "localhost" | "::1");
    let secure_cookies = !is_localhost;

    let disable_auth = config.disable_auth;
    if disable_auth {
        tracing::warn!("Admin authentication is DISABLED (CHAT_ADMIN_DISABLE_AUTH=1)");
    }

    let state = Arc::new(AppState {
        providers: ProviderStore::new(),
        models: ModelStore::new(),
        tiers: TierStore::new(),
        users: UserStore::new(),
        prompts: PromptStore::new(),
        http_client,
        admin_credentials,
        secure_cookies,
        disable_auth,
    });

    // CORS configuration based on environment
    let cors_origins = config.cors_mode.clone();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            let Ok(origin_str) = origin.to_str() else {
                return false;
            };

            match &cors_origins {
                CorsMode::AllowAll => true,
                CorsMode::LocalhostOnly => {
                    let Ok(url) = url::Url::parse(origin_str) else {
                        return false;
                    };
                    matches!(
                        url.host_str(),
                        Some("localhost") | Some("127.0.0.1") | Some("::1")
                    )
                }
                CorsMode::AllowList(allowed) => allowed.iter().any(|a| a == origin_str),
            }
        }))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    match &config.cors_mode {
        CorsMode::AllowAll => info!("CORS: Allowing all origins"),
        CorsMode::LocalhostOnly => info!("CORS: Localhost only"),
        CorsMode::AllowList(list) => info!("CORS: Allowing origins: {:?}", list),
    }

    // Admin API routes with OpenAPI spec generation
    let (api_router, openapi) = OpenApiRouter::with_openapi(Default::default())
        // Providers & keys
        .routes(routes!(
            routes::admin::list_providers,
            routes::admin::create_provider
        ))
        .routes(routes!(
            routes::admin::update_provider,
            routes::admin::delete_provider
        ))
        .routes(routes!(
            routes::admin::list_provider_keys,
            routes::admin::create_provider_key
        ))
        .routes(routes!(routes::admin::delete_api_key))
        // Model discovery
        .routes(routes!(routes::admin::fetch_models))
        .routes(routes!(routes::admin::fetch_provider_models))
        // Model assignments
        .routes(routes!(
            routes::admin::list_models,
            routes::admin::create_model
        ))
        .routes(routes!(
            routes::admin::update_model,
            routes::admin::delete_model
        ))
        // Tiers
        .routes(routes!(routes::admin::list_tiers))
        .routes(routes!(routes::admin::update_tier))
        // Users
        .routes(routes!(routes::admin::list_users))
        .routes(routes!(routes::admin::update_user))
        // System prompts
        .routes(routes!(routes::admin::list_prompts))
        .routes(routes!(routes::admin::update_prompt))
        // Analytics
        .routes(routes!(routes::admin::analytics_overview))
        .split_for_parts();

    // Swagger UI + OpenAPI spec (accessible without authentication)
    let swagger_routes = Router::new().merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger").url("/api-docs/openapi.json", openapi),
    );

    // Session endpoints (login/logout unprotected; /me checks itself)
    let session_routes = Router::new()
        .route("/login", post(routes::admin::login))
        .route("/logout", post(routes::admin::logout))
        .route("/me", get(routes::admin::me));

    // Protected admin routes (session cookie, bearer token, or Basic Auth)
    let protected_routes = api_router.layer(middleware::from_fn_with_state(
        state.clone(),
        admin_auth_middleware,
    ));

    let admin_routes = Router::new().merge(session_routes).merge(protected_routes);

    let app = NormalizePath::trim_trailing_slash(
        Router::new()
            .route("/health", get(routes::health::health))
            .route("/version", get(routes::health::version))
            .merge(swagger_routes)
            .nest("/api/admin", admin_routes)
            .layer(cors)
            .with_state(state),
    );

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("Invalid address");
    info!(
        "Starting chat-admin v{}-{} (built {})",
        VERSION, GIT_HASH, BUILD_TIME
    );
    info!("Listening on http://{}", addr);
    info!("Admin API: http://{}/api/admin", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(
        listener,
        ServiceExt::<axum::extract::Request>::into_make_service(app),
    )
    .await
    .expect("Server error");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie() {
        let header = "foo=bar; admin_session=abc123; other=x";
        assert_eq!(
            parse_cookie(header, "admin_session"),
            Some("abc123".to_string())
        );
        assert_eq!(parse_cookie(header, "missing"), None);
        assert_eq!(parse_cookie("", "admin_session"), None);
    }

    #[test]
    fn test_session_token_prefers_cookie_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("admin_session=from-cookie"),
        );
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-bearer"),
        );
        assert_eq!(session_token_from(&headers), Some("from-cookie".into()));
    }

    #[test]
    fn test_auth_failures_are_a_uniform_401() {
        // Every failure arm of the admin middleware funnels through here
        let response = unauthorized_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_session_token_from_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer tok-1"),
        );
        assert_eq!(session_token_from(&headers), Some("tok-1".into()));

        let mut basic = HeaderMap::new();
        basic.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert_eq!(session_token_from(&basic), None);
    }
}
