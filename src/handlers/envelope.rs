use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

/// Pagination block attached to list responses.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let limit = limit.max(1);
        Self {
            page,
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a, T> {
    success: bool,
    message: &'a str,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<PageMeta>,
    timestamp: String,
    code: u16,
}

fn respond<T: Serialize>(
    status: StatusCode,
    message: &str,
    data: T,
    meta: Option<PageMeta>,
) -> HttpResponse {
    HttpResponse::build(status).json(Envelope {
        success: true,
        message,
        data,
        meta,
        timestamp: Utc::now().to_rfc3339(),
        code: status.as_u16(),
    })
}

pub fn ok<T: Serialize>(message: &str, data: T) -> HttpResponse {
    respond(StatusCode::OK, message, data, None)
}

pub fn created<T: Serialize>(message: &str, data: T) -> HttpResponse {
    respond(StatusCode::CREATED, message, data, None)
}

pub fn paged<T: Serialize>(message: &str, data: T, meta: PageMeta) -> HttpResponse {
    respond(StatusCode::OK, message, data, Some(meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use serde_json::{json, Value};

    async fn body_of(resp: HttpResponse) -> Value {
        let bytes = to_bytes(resp.into_body()).await.expect("body read failed");
        serde_json::from_slice(&bytes).expect("body is not json")
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(PageMeta::new(1, 10, 0).total_pages, 0);
        assert_eq!(PageMeta::new(1, 10, 10).total_pages, 1);
        assert_eq!(PageMeta::new(2, 10, 11).total_pages, 2);
    }

    #[actix_web::test]
    async fn created_envelope() {
        let resp = created("Tạo đơn hàng thành công", json!({"id": 1}));
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = body_of(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["code"], 201);
        assert_eq!(body["data"]["id"], 1);
        assert!(body.get("meta").is_none());
    }

    #[actix_web::test]
    async fn paged_envelope_has_camel_case_meta() {
        let body = body_of(paged("ok", Vec::<u8>::new(), PageMeta::new(3, 5, 12))).await;
        assert_eq!(
            body["meta"],
            json!({"page": 3, "limit": 5, "total": 12, "totalPages": 3})
        );
    }
}
