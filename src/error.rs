use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mongodb::error::{ErrorKind, WriteFailure};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy of the service.
///
/// Every operation reports failures through this type; the [`IntoResponse`]
/// implementation is the single boundary translator that maps each kind to an
/// HTTP status code and the uniform `{success: false, error}` envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad or missing input, duplicate unique field, malformed identifier.
    #[error("{0}")]
    Validation(String),
    /// Bad credentials or an invalid/expired session token.
    #[error("{0}")]
    Auth(String),
    /// Authenticated, but the role does not permit the operation.
    #[error("{0}")]
    Forbidden(String),
    /// Missing entity.
    #[error("{0}")]
    NotFound(String),
    /// Opaque fallback for anything unrecognized, including email delivery
    /// failures. Never retried.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));
        (self.status_code(), body).into_response()
    }
}

/// A duplicate key write is a validation problem (unique field already
/// taken), everything else from the driver is opaque.
impl From<mongodb::error::Error> for ApiError {
    fn from(error: mongodb::error::Error) -> Self {
        if let ErrorKind::Write(WriteFailure::WriteError(ref write_error)) = *error.kind {
            if write_error.code == 11000 {
                return ApiError::Validation("Duplicate value entered for a unique field".to_string());
            }
        }
        ApiError::Internal(error.to_string())
    }
}

impl From<bson::ser::Error> for ApiError {
    fn from(error: bson::ser::Error) -> Self {
        ApiError::Internal(error.to_string())
    }
}

/// Parses a client-supplied identifier into a UUID.
///
/// A malformed identifier is a validation failure, mirroring how a cast
/// error on a path or query id surfaces as a 400.
pub fn parse_uuid(raw: &str) -> Result<bson::Uuid, ApiError> {
    let parsed = uuid::Uuid::parse_str(raw)
        .map_err(|_| ApiError::Validation(format!("Resource not found. Invalid id: `{raw}`")))?;
    Ok(bson::Uuid::from_uuid_1(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_error_kind() {
        assert_eq!(
            ApiError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Auth("nope".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("role".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("gone".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_carries_the_failure_envelope() {
        let response = ApiError::NotFound("Product not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn malformed_identifiers_are_validation_failures() {
        let error = parse_uuid("not-a-uuid").unwrap_err();
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn well_formed_identifiers_parse() {
        let id = bson::Uuid::new();
        assert_eq!(parse_uuid(&id.to_string()).unwrap(), id);
    }
}
