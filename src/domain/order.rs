use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const MSG_EMPTY_ITEMS: &str = "Đơn hàng phải có ít nhất một sản phẩm";
pub const MSG_PRODUCT_NOT_FOUND: &str = "Sản phẩm trong đơn hàng không tồn tại";
pub const MSG_PRODUCT_NOT_IN_SHOP: &str = "Sản phẩm không thuộc cửa hàng đã chọn";
pub const MSG_VARIANT_NOT_FOUND: &str = "Biến thể sản phẩm không tồn tại";
pub const MSG_VARIANT_OUT_OF_STOCK: &str = "Số lượng biến thể không đủ";
pub const MSG_PRODUCT_OUT_OF_STOCK: &str = "Số lượng sản phẩm không đủ";
pub const MSG_NOT_CANCELLABLE: &str = "Không thể hủy đơn hàng ở trạng thái hiện tại";
pub const MSG_ORDER_FORBIDDEN: &str = "Bạn không có quyền truy cập đơn hàng này";
pub const MSG_ADMIN_ONLY: &str = "Chỉ quản trị viên mới có quyền thực hiện thao tác này";
pub const MSG_INVALID_STATUS: &str = "Trạng thái đơn hàng không hợp lệ";
pub const MSG_INVALID_SHIPPING_FEE: &str = "Phí vận chuyển không hợp lệ";
pub const MSG_MISSING_PAYMENT_METHOD: &str = "Vui lòng chọn phương thức thanh toán";

pub const HISTORY_ORDER_CREATED: &str = "Order created";

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

// ── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Buyers may only withdraw an order before it leaves the shop.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    pub fn change_description(&self) -> String {
        format!("Order status changed to {}", self.as_str())
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(OrderStatus::Pending),
            "PROCESSING" => Ok(OrderStatus::Processing),
            "SHIPPED" => Ok(OrderStatus::Shipped),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status '{}'", other)),
        }
    }
}

// ── Catalog (consumed) ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Product {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    /// Percent, expected in 0..=100.
    pub discount: BigDecimal,
    pub stock: i32,
}

#[derive(Debug, Clone)]
pub struct ProductVariant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub stock: i32,
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shop_id: Uuid,
    pub status: OrderStatus,
    pub total_amount: BigDecimal,
    pub shipping_fee: BigDecimal,
    pub discount_amount: BigDecimal,
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
}

#[derive(Debug, Clone)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    /// Unit price before discount, snapshotted at creation.
    pub price: BigDecimal,
    pub discounted_price: BigDecimal,
    pub total_price: BigDecimal,
    pub discount: BigDecimal,
    pub tax: BigDecimal,
    pub is_reviewed: bool,
}

#[derive(Debug, Clone)]
pub struct OrderHistoryEntry {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// An order with its items and audit trail populated.
#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub history: Vec<OrderHistoryEntry>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub shop_id: Uuid,
    pub total_amount: BigDecimal,
    pub shipping_fee: BigDecimal,
    pub discount_amount: BigDecimal,
    pub address_id: Uuid,
    pub payment_method: String,
    pub notes: Option<String>,
    pub voucher_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub price: BigDecimal,
    pub discounted_price: BigDecimal,
    pub total_price: BigDecimal,
    pub discount: BigDecimal,
    pub tax: BigDecimal,
}

// ── Inputs ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CreateOrderItemInput {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: Option<f64>,
    pub tax: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    pub shop_id: Option<Uuid>,
    pub address_id: Uuid,
    pub payment_method: String,
    pub shipping_fee: Option<f64>,
    pub items: Vec<CreateOrderItemInput>,
    pub notes: Option<String>,
    pub voucher_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub address_id: Option<Uuid>,
    pub shipping_fee: Option<BigDecimal>,
    pub notes: Option<String>,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub is_pay: Option<bool>,
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        self.address_id.is_none()
            && self.shipping_fee.is_none()
            && self.notes.is_none()
            && self.tracking_number.is_none()
            && self.carrier.is_none()
            && self.is_pay.is_none()
    }
}

// ── Listing ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub shop_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    TotalAmount,
    Status,
}

impl SortField {
    /// Unknown fields fall back to creation time.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "updatedAt" | "updated_at" => SortField::UpdatedAt,
            "totalAmount" | "total_amount" => SortField::TotalAmount,
            "status" => SortField::Status,
            _ => SortField::CreatedAt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }
}

/// A fully resolved listing request, ready for the repository.
#[derive(Debug, Clone)]
pub struct OrderFilter {
    pub user_id: Option<Uuid>,
    pub shop_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub page: i64,
    pub limit: i64,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl OrderFilter {
    /// Saturates, so an absurd page number lands past the last row.
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<Order>,
    pub total: i64,
}

// ── Pricing ──────────────────────────────────────────────────────────────────

/// Pricing snapshot of one order line.
#[derive(Debug, Clone, PartialEq)]
pub struct LinePrice {
    pub discount: BigDecimal,
    pub discounted_price: BigDecimal,
    pub total_price: BigDecimal,
    /// `(base - discounted) * quantity`
    pub discount_amount: BigDecimal,
}

impl LinePrice {
    pub fn compute(base_price: &BigDecimal, discount: &BigDecimal, quantity: i32) -> Self {
        let discount = clamp_discount(discount);
        let qty = BigDecimal::from(quantity);
        let reduction = base_price * &discount / BigDecimal::from(100);
        let discounted_price = base_price - &reduction;
        let total_price = &discounted_price * &qty;
        let discount_amount = reduction * qty;
        Self {
            discount,
            discounted_price,
            total_price,
            discount_amount,
        }
    }
}

pub fn clamp_discount(discount: &BigDecimal) -> BigDecimal {
    let zero = BigDecimal::from(0);
    let hundred = BigDecimal::from(100);
    if *discount < zero {
        zero
    } else if *discount > hundred {
        hundred
    } else {
        discount.clone()
    }
}

/// Anything that is not a finite number of at least one unit counts as one.
pub fn normalize_quantity(quantity: Option<f64>) -> i32 {
    match quantity {
        Some(q) if q.is_finite() && q >= 1.0 => q.floor().min(i32::MAX as f64) as i32,
        _ => 1,
    }
}

/// Non-finite or negative amounts collapse to zero.
pub fn normalize_amount(amount: Option<f64>) -> BigDecimal {
    match amount {
        Some(a) if a.is_finite() && a >= 0.0 => {
            BigDecimal::from_str(&a.to_string()).unwrap_or_default()
        }
        _ => BigDecimal::from(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    #[test]
    fn offset_saturates_for_huge_pages() {
        let filter = OrderFilter {
            user_id: None,
            shop_id: None,
            status: None,
            page: i64::MAX,
            limit: MAX_PAGE_SIZE,
            sort_by: SortField::CreatedAt,
            sort_order: SortOrder::Desc,
        };
        assert_eq!(filter.offset(), i64::MAX);
        assert_eq!(OrderFilter { page: 3, limit: 10, ..filter }.offset(), 20);
    }

    #[test]
    fn line_price_applies_percent_discount() {
        let line = LinePrice::compute(&dec("100"), &dec("10"), 2);
        assert_eq!(line.discounted_price, dec("90"));
        assert_eq!(line.total_price, dec("180"));
        assert_eq!(line.discount_amount, dec("20"));
    }

    #[test]
    fn line_price_clamps_discount_above_hundred() {
        let line = LinePrice::compute(&dec("50"), &dec("150"), 3);
        assert_eq!(line.discount, dec("100"));
        assert_eq!(line.total_price, dec("0"));
        assert_eq!(line.discount_amount, dec("150"));
    }

    #[test]
    fn line_price_clamps_negative_discount() {
        let line = LinePrice::compute(&dec("19.99"), &dec("-5"), 1);
        assert_eq!(line.discount, dec("0"));
        assert_eq!(line.discounted_price, dec("19.99"));
        assert_eq!(line.discount_amount, dec("0"));
    }

    #[test]
    fn line_price_keeps_fractional_precision() {
        let line = LinePrice::compute(&dec("99.99"), &dec("15"), 2);
        assert_eq!(line.discounted_price, dec("84.9915"));
        assert_eq!(line.total_price, dec("169.983"));
    }

    #[test]
    fn quantity_defaults_to_one() {
        assert_eq!(normalize_quantity(None), 1);
        assert_eq!(normalize_quantity(Some(0.0)), 1);
        assert_eq!(normalize_quantity(Some(-3.0)), 1);
        assert_eq!(normalize_quantity(Some(f64::NAN)), 1);
        assert_eq!(normalize_quantity(Some(f64::INFINITY)), 1);
        assert_eq!(normalize_quantity(Some(4.0)), 4);
        assert_eq!(normalize_quantity(Some(2.7)), 2);
    }

    #[test]
    fn amount_defaults_to_zero() {
        assert_eq!(normalize_amount(None), dec("0"));
        assert_eq!(normalize_amount(Some(f64::NAN)), dec("0"));
        assert_eq!(normalize_amount(Some(-1.0)), dec("0"));
        assert_eq!(normalize_amount(Some(20.0)), dec("20"));
        assert_eq!(normalize_amount(Some(0.1)), dec("0.1"));
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert_eq!("shipped".parse::<OrderStatus>(), Ok(OrderStatus::Shipped));
        assert!("LOST".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn only_pending_and_processing_are_cancellable() {
        assert!(OrderStatus::Pending.is_cancellable());
        assert!(OrderStatus::Processing.is_cancellable());
        assert!(!OrderStatus::Shipped.is_cancellable());
        assert!(!OrderStatus::Delivered.is_cancellable());
        assert!(!OrderStatus::Cancelled.is_cancellable());
    }

    #[test]
    fn sort_parameters_fall_back_to_defaults() {
        assert_eq!(SortField::parse("totalAmount"), SortField::TotalAmount);
        assert_eq!(SortField::parse("bogus"), SortField::CreatedAt);
        assert_eq!(SortOrder::parse("ASC"), SortOrder::Asc);
        assert_eq!(SortOrder::parse("sideways"), SortOrder::Desc);
    }
}
