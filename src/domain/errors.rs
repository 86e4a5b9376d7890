use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn order_not_found() -> Self {
        DomainError::NotFound("Không tìm thấy đơn hàng".to_string())
    }
}
