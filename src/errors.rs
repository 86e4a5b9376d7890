use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to clients. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Attaches the request location so the error can be rendered.
    pub fn at(self, req: &HttpRequest) -> ApiError {
        ApiError {
            error: self,
            path: req.path().to_string(),
            method: req.method().to_string(),
            errors: None,
        }
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Unauthenticated => AppError::Unauthorized,
            DomainError::Forbidden(msg) => AppError::Forbidden(msg),
            DomainError::NotFound(msg) => AppError::NotFound(msg),
            DomainError::Validation(msg) => AppError::BadRequest(msg),
            DomainError::Conflict(msg) => AppError::Conflict(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// An [`AppError`] bound to the request that produced it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ApiError {
    pub error: AppError,
    pub path: String,
    pub method: String,
    pub errors: Option<Vec<String>>,
}

impl ApiError {
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = Some(errors);
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [String]>,
    timestamp: String,
    path: &'a str,
    method: &'a str,
    code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    skip_toast: Option<bool>,
}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.error.status()
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Internal(detail) = &self.error {
            log::error!("{} {} failed: {}", self.method, self.path, detail);
        }
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorBody {
            success: false,
            message: self.error.public_message(),
            errors: self.errors.as_deref(),
            timestamp: Utc::now().to_rfc3339(),
            path: &self.path,
            method: &self.method,
            code: status.as_u16(),
            skip_toast: matches!(self.error, AppError::Unauthorized).then_some(true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::test::TestRequest;
    use actix_web::ResponseError;
    use serde_json::Value;

    fn api_error(error: AppError) -> ApiError {
        let req = TestRequest::get().uri("/orders/42").to_http_request();
        error.at(&req)
    }

    async fn body_of(err: &ApiError) -> Value {
        let bytes = to_bytes(err.error_response().into_body())
            .await
            .expect("body read failed");
        serde_json::from_slice(&bytes).expect("body is not json")
    }

    #[test]
    fn statuses_follow_the_error_kind() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn domain_errors_keep_their_message() {
        let app_err: AppError = DomainError::Validation("Số lượng sản phẩm không đủ".into()).into();
        assert!(matches!(app_err, AppError::BadRequest(_)));
        assert_eq!(app_err.public_message(), "Số lượng sản phẩm không đủ");

        let app_err: AppError = DomainError::order_not_found().into();
        assert!(matches!(app_err, AppError::NotFound(_)));

        let app_err: AppError = DomainError::Conflict("nope".into()).into();
        assert!(matches!(app_err, AppError::Conflict(_)));
    }

    #[test]
    fn internal_details_are_not_public() {
        let err = AppError::Internal("connection refused".to_string());
        assert_eq!(err.to_string(), "Internal error: connection refused");
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[actix_web::test]
    async fn envelope_carries_request_location() {
        let body = body_of(&api_error(AppError::NotFound("missing".into()))).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "missing");
        assert_eq!(body["path"], "/orders/42");
        assert_eq!(body["method"], "GET");
        assert_eq!(body["code"], 404);
        assert!(body.get("skipToast").is_none());
        assert!(body.get("errors").is_none());
        assert!(body["timestamp"].is_string());
    }

    #[actix_web::test]
    async fn unauthorized_sets_skip_toast() {
        let body = body_of(&api_error(AppError::Unauthorized)).await;
        assert_eq!(body["code"], 401);
        assert_eq!(body["skipToast"], true);
    }

    #[actix_web::test]
    async fn field_errors_are_listed() {
        let err = api_error(AppError::BadRequest("Invalid request body".into()))
            .with_errors(vec!["missing field `addressId`".to_string()]);
        let body = body_of(&err).await;
        assert_eq!(body["errors"][0], "missing field `addressId`");
    }
}
