use crate::Registry;
use crate::error::{AuthError, DomainError};
use crate::models::account::Account;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::sync::Arc;

/// Error as it leaves the process: status, kind and a message that is safe
/// to show. Internal details are logged here and dropped.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_failure", message)
    }

    pub fn invalid_credentials() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthenticated", "Invalid username or password")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        let status = match &e {
            DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
            DomainError::Validation { .. }
            | DomainError::IntegrityViolation(_)
            | DomainError::EmptyUpdate
            | DomainError::SelfParent(_)
            | DomainError::ParentCycle { .. } => StatusCode::BAD_REQUEST,
            DomainError::DuplicateUsername => StatusCode::CONFLICT,
            DomainError::Unauthenticated => StatusCode::UNAUTHORIZED,
            DomainError::TransientStore(_) => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if e.is_transient() {
            let cause = std::error::Error::source(&e).map(ToString::to_string).unwrap_or_default();
            tracing::warn!(error = %cause, "transient store failure");
            "Store temporarily unavailable, please retry".to_string()
        } else {
            match &e {
                DomainError::Internal(detail) => {
                    tracing::error!(error = %detail, "internal failure");
                    "Internal server error".to_string()
                }
                DomainError::EmptyUpdate => "No update fields provided".to_string(),
                DomainError::DuplicateUsername => "Username already exists".to_string(),
                DomainError::Unauthenticated => "Authentication required".to_string(),
                other => other.to_string(),
            }
        };

        Self::new(status, e.kind(), message)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "error": { "kind": self.kind, "message": self.message } });
        (self.status, axum::Json(body)).into_response()
    }
}

/// `axum::Json` that reports bad bodies as a 400 validation failure.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// The account behind the request's bearer token.
pub struct AuthAccount(pub Account);

impl FromRequestParts<Arc<Registry>> for AuthAccount {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, registry: &Arc<Registry>) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            tracing::debug!(reason = %AuthError::Missing, "bearer token rejected");
            return Err(DomainError::Unauthenticated.into());
        };

        let services = &registry.services;
        let account = services.auth.resolve(token, &services.account).await?;
        Ok(Self(account))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
