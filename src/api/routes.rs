//! API route handlers

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::extract::JsonBody;
use super::server::SharedState;
use crate::auth::models::{AccessResponse, LoginRequest, RefreshRequest, UserInfo};
use crate::auth::{self, AuthUser, Dispatcher, RegisterRequest, Revocation, TokenPair};
use crate::error::{Error, FieldErrors, Result};

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";

fn required_field(errors: &mut FieldErrors, field: &str, value: Option<String>) -> String {
    match value {
        Some(value) if !value.is_empty() => value,
        Some(_) => {
            errors.insert(field.to_string(), vec![BLANK.to_string()]);
            String::new()
        }
        None => {
            errors.insert(field.to_string(), vec![REQUIRED.to_string()]);
            String::new()
        }
    }
}

/// Access token in the body, refresh token (if any) in the cookie
fn token_response(state: &SharedState, pair: TokenPair) -> Result<Response> {
    let mut response = Json(AccessResponse {
        access: pair.access,
    })
    .into_response();

    if let Some(refresh) = pair.refresh {
        let cookie = state.cookies.refresh_cookie(&refresh.token)?;
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    Ok(response)
}

// Health check

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// Token lifecycle

pub async fn obtain_token(
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Response> {
    let mut errors = FieldErrors::new();
    let username = required_field(&mut errors, "username", req.username);
    let password = required_field(&mut errors, "password", req.password);
    if !errors.is_empty() {
        return Err(Error::Validation(errors));
    }

    let pair = state.lifecycle.login(&username, &password).await?;
    token_response(&state, pair)
}

pub async fn refresh_token(
    State(state): State<SharedState>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> Result<Response> {
    let token = match req.refresh {
        Some(token) if token.is_empty() => return Err(Error::field("refresh", BLANK)),
        Some(token) => token,
        None => state
            .cookies
            .read(&headers)
            .ok_or_else(|| Error::field("refresh", REQUIRED))?,
    };

    let pair = state.lifecycle.refresh(&token).await?;
    token_response(&state, pair)
}

pub async fn logout(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    headers: HeaderMap,
) -> Result<Response> {
    let Some(token) = state.cookies.read(&headers) else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    match state.lifecycle.revoke(&token).await {
        Revocation::Recorded => {
            tracing::info!(username = %user.username, "Revoked refresh token on logout");
        }
        Revocation::Failed(reason) => {
            tracing::warn!(username = %user.username, "Refresh token not revoked on logout: {}", reason);
        }
    }

    let mut response = (StatusCode::OK, Json(json!({ "detail": "Logged out" }))).into_response();
    response
        .headers_mut()
        .append(SET_COOKIE, state.cookies.clear_cookie()?);
    Ok(response)
}

// Accounts

pub async fn register(
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let user = auth::register(state.users.as_ref(), &state.hasher, req).await?;
    Ok((StatusCode::CREATED, Json(UserInfo::from(user))))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<UserInfo> {
    Json(UserInfo::from(user))
}

pub async fn list_users(
    State(state): State<SharedState>,
    Dispatcher(_): Dispatcher,
) -> Result<Json<Vec<UserInfo>>> {
    let users = state.users.list_users().await?;
    Ok(Json(users.into_iter().map(UserInfo::from).collect()))
}
