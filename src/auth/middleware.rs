//! Authentication extractors and role guards

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};

use crate::api::SharedState;
use crate::auth::models::User;
use crate::error::{Error, Result};

/// Bearer token from the `Authorization` header.
/// `Ok(None)` when no bearer credentials were sent at all.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<String>> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| Error::TokenInvalid)?;

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme == "Bearer" => Ok(Some(token.to_string())),
        (Some(scheme), _, _) if scheme == "Bearer" => Err(Error::TokenInvalid),
        _ => Ok(None),
    }
}

/// An authenticated, active user resolved from an access token
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SharedState: FromRef<S>,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let token = bearer_token(&parts.headers)?.ok_or(Error::NotAuthenticated)?;
        let state = SharedState::from_ref(state);
        let user = state.lifecycle.authenticate(&token).await?;
        Ok(AuthUser(user))
    }
}

/// Authenticated user holding the dispatcher role
#[derive(Debug, Clone)]
pub struct Dispatcher(pub User);

impl<S> FromRequestParts<S> for Dispatcher
where
    S: Send + Sync,
    SharedState: FromRef<S>,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.is_dispatcher() {
            Ok(Dispatcher(user))
        } else {
            Err(Error::PermissionDenied)
        }
    }
}

/// Authenticated user holding the operator role
#[derive(Debug, Clone)]
pub struct Operator(pub User);

impl<S> FromRequestParts<S> for Operator
where
    S: Send + Sync,
    SharedState: FromRef<S>,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.is_operator() {
            Ok(Operator(user))
        } else {
            Err(Error::PermissionDenied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_no_authorization_header() {
        let headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers).unwrap(), None);
    }

    #[test]
    fn test_bearer_token_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).unwrap().as_deref(), Some("abc.def"));
    }

    #[test]
    fn test_other_scheme_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert_eq!(bearer_token(&headers).unwrap(), None);
    }

    #[test]
    fn test_malformed_bearer_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer"));
        assert!(matches!(bearer_token(&headers), Err(Error::TokenInvalid)));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer a b"));
        assert!(matches!(bearer_token(&headers), Err(Error::TokenInvalid)));
    }
}
