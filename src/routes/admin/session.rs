use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use utoipa::ToSchema;

use super::{ErrorResponse, SuccessResponse};
use crate::{AppState, SESSION_TTL_SECS, now_secs, parse_cookie, session_token_from};

// --- Types ---

#[derive(Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// The token is returned in the body (the dashboard keeps it in local
/// storage and sends it as a bearer credential) and also set as a cookie.
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub username: String,
    pub authenticated: bool,
}

// --- Handlers ---

/// Login with operator credentials, returns a session token
pub async fn login(State(state): State<Arc<AppState>>, Json(body): Json<LoginRequest>) -> Response {
    let creds = &state.admin_credentials;

    // Constant-time comparison to prevent timing attacks
    let user_match = body.username.as_bytes().ct_eq(creds.username.as_bytes());
    let pass_match = body.password.as_bytes().ct_eq(creds.password.as_bytes());

    if user_match.into() && pass_match.into() {
        let token = format!(
            "{:032x}{:032x}",
            rand::random::<u128>(),
            rand::random::<u128>()
        );
        let expires_at = now_secs() + SESSION_TTL_SECS;
        crate::save_session(&token, expires_at).await;

        let secure_flag = if state.secure_cookies { "; Secure" } else { "" };
        let cookie = format!(
            "admin_session={}; HttpOnly; SameSite=Strict; Path=/api/admin; Max-Age={}{}",
            token, SESSION_TTL_SECS, secure_flag
        );

        (
            StatusCode::OK,
            [(header::SET_COOKIE, cookie)],
            Json(LoginResponse {
                success: true,
                token,
            }),
        )
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Invalid credentials".into(),
            }),
        )
            .into_response()
    }
}

/// Who am I: 200 with the operator identity when the session is valid,
/// 401 otherwise
pub async fn me(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let authenticated = if state.disable_auth {
        true
    } else if let Some(token) = session_token_from(&headers) {
        crate::validate_session(&token).await
    } else {
        false
    };

    if authenticated {
        Json(MeResponse {
            username: state.admin_credentials.username.clone(),
            authenticated: true,
        })
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Not authenticated".into(),
            }),
        )
            .into_response()
    }
}

/// Logout and clear the session
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token_from(&headers) {
        crate::remove_session(&token).await;
    } else if let Some(cookie_header) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok())
        && let Some(token) = parse_cookie(cookie_header, "admin_session")
    {
        crate::remove_session(&token).await;
    }

    let secure_flag = if state.secure_cookies { "; Secure" } else { "" };
    let clear_cookie = format!(
        "admin_session=; HttpOnly; SameSite=Strict; Path=/api/admin; Max-Age=0{}",
        secure_flag
    );

    (
        StatusCode::OK,
        [(header::SET_COOKIE, clear_cookie)],
        Json(SuccessResponse { success: true }),
    )
        .into_response()
}
