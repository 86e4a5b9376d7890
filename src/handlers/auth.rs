use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use uuid::Uuid;

use crate::domain::caller::{Caller, Role};
use crate::errors::{ApiError, AppError};

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Identity forwarded by the auth gateway. A missing or malformed user id is
/// a 401; an unknown role falls back to a plain user.
impl FromRequest for Caller {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(caller_from(req).ok_or_else(|| AppError::Unauthorized.at(req)))
    }
}

fn caller_from(req: &HttpRequest) -> Option<Caller> {
    let headers = req.headers();
    let user_id = headers
        .get(USER_ID_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<Uuid>()
        .ok()?;
    let role = headers
        .get(USER_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Role>().ok())
        .unwrap_or_default();
    Some(Caller::new(user_id, role))
}
