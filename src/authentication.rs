use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};

use crate::error::ApiError;
use crate::state::ServiceState;
use crate::user::{Role, User, query_user};

/// Extractor for the user authenticated by the presented session token.
///
/// Reads the token from the `token` cookie or a bearer `Authorization`
/// header, verifies it against the state-held session keys and loads the
/// user record.
pub struct AuthenticatedUser(pub User);

/// Extractor that additionally requires the admin role.
pub struct AdminUser(pub User);

impl FromRequestParts<ServiceState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token_from_headers(&parts.headers)
            .ok_or_else(|| ApiError::Auth("Please login to access this resource".to_string()))?;
        let user_id = state.session_keys.verify(&token)?;
        match query_user(&state.user_collection, user_id).await {
            Ok(user) => Ok(AuthenticatedUser(user)),
            // A valid token naming a deleted user is treated as a stale session.
            Err(ApiError::NotFound(_)) => {
                Err(ApiError::Auth("Session token is invalid or has expired".to_string()))
            }
            Err(error) => Err(error),
        }
    }
}

impl FromRequestParts<ServiceState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(ApiError::Forbidden(format!(
                "Role `{}` is not allowed to access this resource",
                user.role.as_str()
            )));
        }
        Ok(AdminUser(user))
    }
}

/// Pulls a session token out of the request headers.
///
/// The `token` cookie takes precedence; a bearer `Authorization` header is
/// accepted as a fallback for non-browser clients.
fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(cookie_header) = headers.get(header::COOKIE).and_then(|value| value.to_str().ok()) {
        for pair in cookie_header.split(';') {
            if let Some(value) = pair.trim().strip_prefix("token=") {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|value| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn token_cookie_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; token=abc123; lang=en"),
        );
        assert_eq!(session_token_from_headers(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn empty_token_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("token="));
        assert_eq!(session_token_from_headers(&headers), None);
    }

    #[test]
    fn bearer_header_is_a_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer xyz789"),
        );
        assert_eq!(session_token_from_headers(&headers).as_deref(), Some("xyz789"));
    }

    #[test]
    fn absent_credentials_yield_none() {
        assert_eq!(session_token_from_headers(&HeaderMap::new()), None);
    }
}
