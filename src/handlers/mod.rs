pub mod auth;
pub mod envelope;
pub mod orders;

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse};
use utoipa::OpenApi;

use crate::errors::AppError;

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::update_order,
        orders::update_order_status,
        orders::cancel_order,
        orders::delete_order,
    ),
    components(schemas(
        orders::CreateOrderRequest,
        orders::CreateOrderItemRequest,
        orders::UpdateOrderRequest,
        orders::UpdateStatusRequest,
        orders::CancelOrderRequest,
        orders::OrderResponse,
        orders::OrderItemResponse,
        orders::OrderHistoryResponse,
        envelope::PageMeta,
    )),
    tags((name = "orders", description = "Order placement and lifecycle")),
    info(title = "Shop orders API")
)]
pub struct ApiDoc;

/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "health"
)]
pub async fn health() -> HttpResponse {
    envelope::ok("OK", serde_json::json!({ "status": "UP" }))
}

pub fn json_error(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest("Dữ liệu không hợp lệ".to_string())
        .at(req)
        .with_errors(vec![err.to_string()])
        .into()
}

pub fn path_error(err: PathError, req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest("Đường dẫn không hợp lệ".to_string())
        .at(req)
        .with_errors(vec![err.to_string()])
        .into()
}

pub fn query_error(err: QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest("Tham số truy vấn không hợp lệ".to_string())
        .at(req)
        .with_errors(vec![err.to_string()])
        .into()
}
