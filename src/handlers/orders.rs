use std::str::FromStr;

use actix_web::{web, HttpRequest, HttpResponse};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::order_service::OrderService;
use crate::domain::caller::Caller;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    CreateOrderInput, CreateOrderItemInput, ListQuery, Order, OrderDetails, OrderHistoryEntry,
    OrderItem, OrderPatch, MSG_INVALID_SHIPPING_FEE,
};
use crate::errors::{ApiError, AppError};
use crate::infrastructure::order_repo::DieselOrderRepository;

use super::envelope::{self, PageMeta};

pub type Service = OrderService<DieselOrderRepository>;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderItemRequest {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    /// Defaults to 1; fractional values are floored.
    pub quantity: Option<f64>,
    pub tax: Option<f64>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// When omitted the shop of the first product is used.
    pub shop_id: Option<Uuid>,
    pub address_id: Uuid,
    #[serde(default)]
    pub payment_method: String,
    pub shipping_fee: Option<f64>,
    #[serde(default)]
    pub items: Vec<CreateOrderItemRequest>,
    pub notes: Option<String>,
    pub voucher_id: Option<Uuid>,
}

impl From<CreateOrderRequest> for CreateOrderInput {
    fn from(req: CreateOrderRequest) -> Self {
        CreateOrderInput {
            shop_id: req.shop_id,
            address_id: req.address_id,
            payment_method: req.payment_method,
            shipping_fee: req.shipping_fee,
            items: req
                .items
                .into_iter()
                .map(|i| CreateOrderItemInput {
                    product_id: i.product_id,
                    variant_id: i.variant_id,
                    quantity: i.quantity,
                    tax: i.tax,
                })
                .collect(),
            notes: req.notes,
            voucher_id: req.voucher_id,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub address_id: Option<Uuid>,
    /// Changing the fee re-derives the order total.
    pub shipping_fee: Option<f64>,
    pub notes: Option<String>,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub is_pay: Option<bool>,
}

impl TryFrom<UpdateOrderRequest> for OrderPatch {
    type Error = DomainError;

    fn try_from(req: UpdateOrderRequest) -> Result<Self, Self::Error> {
        let shipping_fee = req
            .shipping_fee
            .map(|fee| {
                if !fee.is_finite() {
                    return Err(DomainError::Validation(MSG_INVALID_SHIPPING_FEE.to_string()));
                }
                BigDecimal::from_str(&fee.to_string())
                    .map_err(|_| DomainError::Validation(MSG_INVALID_SHIPPING_FEE.to_string()))
            })
            .transpose()?;
        Ok(OrderPatch {
            address_id: req.address_id,
            shipping_fee,
            notes: req.notes,
            tracking_number: req.tracking_number,
            carrier: req.carrier,
            is_pay: req.is_pay,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// One of PENDING, PROCESSING, SHIPPED, DELIVERED, CANCELLED.
    pub status: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    pub page: Option<i64>,
    /// Items per page. Defaults to 10, maximum 100.
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub shop_id: Option<Uuid>,
    /// Only honoured for admins.
    pub user_id: Option<Uuid>,
    /// createdAt, updatedAt, totalAmount or status.
    pub sort_by: Option<String>,
    /// asc or desc.
    pub sort_order: Option<String>,
}

impl From<ListOrdersParams> for ListQuery {
    fn from(p: ListOrdersParams) -> Self {
        ListQuery {
            page: p.page,
            limit: p.limit,
            status: p.status,
            shop_id: p.shop_id,
            user_id: p.user_id,
            sort_by: p.sort_by,
            sort_order: p.sort_order,
        }
    }
}

/// Money is rendered as a decimal string rounded to two places.
fn money(value: &BigDecimal) -> String {
    value.round(2).to_string()
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub price: String,
    pub discounted_price: String,
    pub total_price: String,
    pub discount: String,
    pub tax: String,
    pub is_reviewed: bool,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(i: OrderItem) -> Self {
        Self {
            id: i.id,
            product_id: i.product_id,
            variant_id: i.variant_id,
            quantity: i.quantity,
            price: money(&i.price),
            discounted_price: money(&i.discounted_price),
            total_price: money(&i.total_price),
            discount: i.discount.to_string(),
            tax: money(&i.tax),
            is_reviewed: i.is_reviewed,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderHistoryResponse {
    pub status: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<OrderHistoryEntry> for OrderHistoryResponse {
    fn from(h: OrderHistoryEntry) -> Self {
        Self {
            status: h.status.to_string(),
            description: h.description,
            created_at: h.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shop_id: Uuid,
    pub status: String,
    pub total_amount: String,
    pub shipping_fee: String,
    pub discount_amount: String,
    pub is_pay: bool,
    pub wallet_transferred: bool,
    pub address_id: Uuid,
    pub payment_method: String,
    pub notes: Option<String>,
    pub voucher_id: Option<Uuid>,
    pub cancellation_reason: Option<String>,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Present on single-order responses only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<OrderItemResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<OrderHistoryResponse>>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            user_id: o.user_id,
            shop_id: o.shop_id,
            status: o.status.to_string(),
            total_amount: money(&o.total_amount),
            shipping_fee: money(&o.shipping_fee),
            discount_amount: money(&o.discount_amount),
            is_pay: o.is_pay,
            wallet_transferred: o.wallet_transferred,
            address_id: o.address_id,
            payment_method: o.payment_method,
            notes: o.notes,
            voucher_id: o.voucher_id,
            cancellation_reason: o.cancellation_reason,
            tracking_number: o.tracking_number,
            carrier: o.carrier,
            created_at: o.created_at,
            updated_at: o.updated_at,
            items: None,
            history: None,
        }
    }
}

impl From<OrderDetails> for OrderResponse {
    fn from(d: OrderDetails) -> Self {
        let mut resp = OrderResponse::from(d.order);
        resp.items = Some(d.items.into_iter().map(Into::into).collect());
        resp.history = Some(d.history.into_iter().map(Into::into).collect());
        resp
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// Runs blocking service work on the actix thread pool and maps failures to
/// the error envelope.
async fn blocking<T, F>(req: &HttpRequest, f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    web::block(f)
        .await
        .map_err(|e| AppError::Internal(e.to_string()).at(req))?
        .map_err(|e| AppError::from(e).at(req))
}

/// POST /orders
///
/// Reserves stock and creates the order with its items in one transaction.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Invalid items, shop mismatch or insufficient stock"),
        (status = 401, description = "Missing caller identity"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    service: web::Data<Service>,
    caller: Caller,
    req: HttpRequest,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let input = CreateOrderInput::from(body.into_inner());
    let details = blocking(&req, move || service.create(&caller, input)).await?;
    Ok(envelope::created(
        "Tạo đơn hàng thành công",
        OrderResponse::from(details),
    ))
}

/// GET /orders
///
/// Non-admin callers only see their own orders.
#[utoipa::path(
    get,
    path = "/orders",
    params(ListOrdersParams),
    responses(
        (status = 200, description = "One page of orders", body = Vec<OrderResponse>),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Missing caller identity"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    service: web::Data<Service>,
    caller: Caller,
    req: HttpRequest,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, ApiError> {
    let query = ListQuery::from(query.into_inner());
    let (result, filter) = blocking(&req, move || service.list(&caller, query)).await?;
    let items: Vec<OrderResponse> = result.items.into_iter().map(Into::into).collect();
    Ok(envelope::paged(
        "Lấy danh sách đơn hàng thành công",
        items,
        PageMeta::new(filter.page, filter.limit, result.total),
    ))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order with items and history", body = OrderResponse),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    service: web::Data<Service>,
    caller: Caller,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let details = blocking(&req, move || service.get(&caller, id)).await?;
    Ok(envelope::ok(
        "Lấy thông tin đơn hàng thành công",
        OrderResponse::from(details),
    ))
}

/// PUT /orders/{id}
#[utoipa::path(
    put,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Invalid shipping fee"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn update_order(
    service: web::Data<Service>,
    caller: Caller,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let body = body.into_inner();
    let order = blocking(&req, move || {
        let patch = OrderPatch::try_from(body)?;
        service.update(&caller, id, patch)
    })
    .await?;
    Ok(envelope::ok(
        "Cập nhật đơn hàng thành công",
        OrderResponse::from(order),
    ))
}

/// PUT /orders/{id}/status
#[utoipa::path(
    put,
    path = "/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = OrderResponse),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    service: web::Data<Service>,
    caller: Caller,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let UpdateStatusRequest {
        status,
        description,
    } = body.into_inner();
    let details = blocking(&req, move || {
        service.change_status(&caller, id, &status, description)
    })
    .await?;
    Ok(envelope::ok(
        "Cập nhật trạng thái đơn hàng thành công",
        OrderResponse::from(details),
    ))
}

/// PUT /orders/{id}/cancel
///
/// The body is optional.
#[utoipa::path(
    put,
    path = "/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Order cancelled and stock restored", body = OrderResponse),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order can no longer be cancelled"),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    service: web::Data<Service>,
    caller: Caller,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: Option<web::Json<CancelOrderRequest>>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let reason = body.and_then(|b| b.into_inner().reason);
    let details = blocking(&req, move || service.cancel_by_user(&caller, id, reason)).await?;
    Ok(envelope::ok(
        "Hủy đơn hàng thành công",
        OrderResponse::from(details),
    ))
}

/// DELETE /orders/{id}
#[utoipa::path(
    delete,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order deleted"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn delete_order(
    service: web::Data<Service>,
    caller: Caller,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    blocking(&req, move || service.delete(&caller, id)).await?;
    Ok(envelope::ok("Xóa đơn hàng thành công", serde_json::Value::Null))
}
