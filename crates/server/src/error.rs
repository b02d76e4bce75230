//! Unified error handling for the authorization service.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use warden_core::UserId;

use crate::services::authz::AuthzError;
use crate::store::StoreError;

/// Application-level error type for API handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Storage operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Request input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Caller identity is missing or could not be verified.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but not allowed to do this.
    ///
    /// Carries no detail on purpose. The response body must not reveal
    /// which permission was missing or whether the target exists.
    #[error("Forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AuthzError> for AppError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Denied => Self::Forbidden,
            AuthzError::Store(e) => Self::Store(e),
        }
    }
}

/// JSON error body returned to clients.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(
            self,
            Self::Store(StoreError::Database(_) | StoreError::DataCorruption(_)) | Self::Internal(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Warden request error"
            );
        }

        let status = match &self {
            Self::Store(StoreError::AlreadyBootstrapped | StoreError::Conflict(_)) => {
                StatusCode::CONFLICT
            }
            Self::Store(StoreError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Store(StoreError::AlreadyBootstrapped) => {
                "an administrator has already been bootstrapped".to_string()
            }
            Self::Store(StoreError::Conflict(msg)) => msg.clone(),
            Self::Store(StoreError::NotFound) => "not found".to_string(),
            Self::Store(StoreError::Unavailable(_)) => {
                "service temporarily unavailable".to_string()
            }
            Self::Store(_) | Self::Internal(_) => "internal server error".to_string(),
            Self::Forbidden => "access denied".to_string(),
            _ => self.to_string(),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Set the Sentry user context from the verified caller.
pub fn set_sentry_user(user_id: &UserId) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("admin record".to_string());
        assert_eq!(err.to_string(), "Not found: admin record");

        let err = AppError::Validation("unknown permission: fly".to_string());
        assert_eq!(err.to_string(), "Validation error: unknown permission: fly");
    }

    #[test]
    fn test_app_error_status_codes() {
        // Test that errors map to correct HTTP status codes
        fn get_status(err: AppError) -> StatusCode {
            let response = err.into_response();
            response.status()
        }

        assert_eq!(
            get_status(AppError::Validation("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(get_status(AppError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_error_status_codes() {
        fn get_status(err: StoreError) -> StatusCode {
            AppError::from(err).into_response().status()
        }

        assert_eq!(
            get_status(StoreError::AlreadyBootstrapped),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(StoreError::Conflict("duplicate".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(get_status(StoreError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            get_status(StoreError::Unavailable("pool timeout".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(StoreError::DataCorruption("bad row".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_denied_maps_to_forbidden() {
        let err: AppError = AuthzError::Denied.into();
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }
}
