use chrono::Utc;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::events::{OrderEvent, AGGREGATE_TYPE};
use crate::domain::order::{
    ListResult, NewOrder, NewOrderItem, Order, OrderDetails, OrderFilter, OrderHistoryEntry,
    OrderItem, OrderPatch, OrderStatus, Product, ProductVariant, SortField, SortOrder,
};
use crate::domain::ports::{OrderRepository, UnitOfWork};
use crate::schema::{order_history, order_items, order_outbox, orders, product_variants, products};

use super::models::{
    NewOrderHistoryRow, NewOrderItemRow, NewOrderRow, NewOutboxEventRow, OrderChangeset,
    OrderHistoryRow, OrderItemRow, OrderRow, ProductRow, ProductVariantRow, StatusChangeset,
};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Unit of work ─────────────────────────────────────────────────────────────

/// A `UnitOfWork` bound to a connection that is inside an open transaction.
pub struct DieselUnitOfWork<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> DieselUnitOfWork<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

impl UnitOfWork for DieselUnitOfWork<'_> {
    fn find_product(&mut self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let row = products::table
            .find(id)
            .select(ProductRow::as_select())
            .first::<ProductRow>(self.conn)
            .optional()?;
        Ok(row.map(Product::from))
    }

    fn find_variant(
        &mut self,
        product_id: Uuid,
        variant_id: Uuid,
    ) -> Result<Option<ProductVariant>, DomainError> {
        let row = product_variants::table
            .filter(product_variants::id.eq(variant_id))
            .filter(product_variants::product_id.eq(product_id))
            .select(ProductVariantRow::as_select())
            .first::<ProductVariantRow>(self.conn)
            .optional()?;
        Ok(row.map(ProductVariant::from))
    }

    fn reserve_product_stock(
        &mut self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<bool, DomainError> {
        // Conditional decrement: the row is only touched while enough stock
        // remains, so concurrent orders cannot oversell.
        let updated = diesel::update(
            products::table
                .filter(products::id.eq(product_id))
                .filter(products::stock.ge(quantity)),
        )
        .set((
            products::stock.eq(products::stock - quantity),
            products::updated_at.eq(Utc::now()),
        ))
        .execute(self.conn)?;
        Ok(updated == 1)
    }

    fn reserve_variant_stock(
        &mut self,
        variant_id: Uuid,
        quantity: i32,
    ) -> Result<bool, DomainError> {
        let updated = diesel::update(
            product_variants::table
                .filter(product_variants::id.eq(variant_id))
                .filter(product_variants::stock.ge(quantity)),
        )
        .set(product_variants::stock.eq(product_variants::stock - quantity))
        .execute(self.conn)?;
        Ok(updated == 1)
    }

    fn restock_product(&mut self, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        diesel::update(products::table.find(product_id))
            .set((
                products::stock.eq(products::stock + quantity),
                products::updated_at.eq(Utc::now()),
            ))
            .execute(self.conn)?;
        Ok(())
    }

    fn restock_variant(&mut self, variant_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        diesel::update(product_variants::table.find(variant_id))
            .set(product_variants::stock.eq(product_variants::stock + quantity))
            .execute(self.conn)?;
        Ok(())
    }

    fn insert_order(&mut self, order: NewOrder) -> Result<Order, DomainError> {
        let row = diesel::insert_into(orders::table)
            .values(&NewOrderRow {
                id: Uuid::new_v4(),
                user_id: order.user_id,
                shop_id: order.shop_id,
                status: OrderStatus::Pending.as_str().to_string(),
                total_amount: order.total_amount,
                shipping_fee: order.shipping_fee,
                discount_amount: order.discount_amount,
                address_id: order.address_id,
                payment_method: order.payment_method,
                notes: order.notes,
                voucher_id: order.voucher_id,
            })
            .returning(OrderRow::as_returning())
            .get_result::<OrderRow>(self.conn)?;
        row.try_into()
    }

    fn insert_items(&mut self, items: Vec<NewOrderItem>) -> Result<Vec<OrderItem>, DomainError> {
        let rows: Vec<NewOrderItemRow> = items
            .into_iter()
            .map(|i| NewOrderItemRow {
                id: Uuid::new_v4(),
                order_id: i.order_id,
                product_id: i.product_id,
                variant_id: i.variant_id,
                quantity: i.quantity,
                price: i.price,
                discounted_price: i.discounted_price,
                total_price: i.total_price,
                discount: i.discount,
                tax: i.tax,
            })
            .collect();
        let inserted: Vec<OrderItemRow> = diesel::insert_into(order_items::table)
            .values(&rows)
            .returning(OrderItemRow::as_returning())
            .get_results(self.conn)?;
        Ok(inserted.into_iter().map(OrderItem::from).collect())
    }

    fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>, DomainError> {
        orders::table
            .find(id)
            .select(OrderRow::as_select())
            .for_update()
            .first::<OrderRow>(self.conn)
            .optional()?
            .map(Order::try_from)
            .transpose()
    }

    fn order_items(&mut self, order_id: Uuid) -> Result<Vec<OrderItem>, DomainError> {
        let rows: Vec<OrderItemRow> = order_items::table
            .filter(order_items::order_id.eq(order_id))
            .select(OrderItemRow::as_select())
            .load(self.conn)?;
        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    fn set_status(
        &mut self,
        id: Uuid,
        status: OrderStatus,
        cancellation_reason: Option<&str>,
    ) -> Result<Option<Order>, DomainError> {
        diesel::update(orders::table.find(id))
            .set(&StatusChangeset {
                status: status.as_str(),
                cancellation_reason,
                updated_at: Utc::now(),
            })
            .returning(OrderRow::as_returning())
            .get_result::<OrderRow>(self.conn)
            .optional()?
            .map(Order::try_from)
            .transpose()
    }

    fn append_history(
        &mut self,
        order_id: Uuid,
        status: OrderStatus,
        description: &str,
    ) -> Result<OrderHistoryEntry, DomainError> {
        let row = diesel::insert_into(order_history::table)
            .values(&NewOrderHistoryRow {
                id: Uuid::new_v4(),
                order_id,
                status: status.as_str(),
                description,
            })
            .returning(OrderHistoryRow::as_returning())
            .get_result::<OrderHistoryRow>(self.conn)?;
        row.try_into()
    }

    fn record_event(&mut self, event: &OrderEvent) -> Result<(), DomainError> {
        diesel::insert_into(order_outbox::table)
            .values(&NewOutboxEventRow {
                id: Uuid::new_v4(),
                aggregate_type: AGGREGATE_TYPE.to_string(),
                aggregate_id: event.order_id().to_string(),
                event_type: event.event_type().to_string(),
                payload: serde_json::to_value(event)?,
            })
            .execute(self.conn)?;
        Ok(())
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn filtered<'a>(filter: &OrderFilter) -> orders::BoxedQuery<'a, Pg> {
    let mut query = orders::table.into_boxed();
    if let Some(user_id) = filter.user_id {
        query = query.filter(orders::user_id.eq(user_id));
    }
    if let Some(shop_id) = filter.shop_id {
        query = query.filter(orders::shop_id.eq(shop_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(orders::status.eq(status.as_str()));
    }
    query
}

impl OrderRepository for DieselOrderRepository {
    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T, DomainError>,
    {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let mut uow = DieselUnitOfWork::new(conn);
            f(&mut uow)
        })
    }

    fn find_details(&self, id: Uuid) -> Result<Option<OrderDetails>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .find(id)
            .select(OrderRow::as_select())
            .first::<OrderRow>(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items: Vec<OrderItemRow> = OrderItemRow::belonging_to(&order)
            .select(OrderItemRow::as_select())
            .order(order_items::created_at.asc())
            .load(&mut conn)?;

        let history: Vec<OrderHistoryRow> = OrderHistoryRow::belonging_to(&order)
            .select(OrderHistoryRow::as_select())
            .order(order_history::created_at.asc())
            .load(&mut conn)?;

        Ok(Some(OrderDetails {
            order: order.try_into()?,
            items: items.into_iter().map(OrderItem::from).collect(),
            history: history
                .into_iter()
                .map(OrderHistoryEntry::try_from)
                .collect::<Result<_, _>>()?,
        }))
    }

    fn list(&self, filter: &OrderFilter) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = filtered(filter).count().get_result(conn)?;

            let query = filtered(filter).select(OrderRow::as_select());
            let query = match (filter.sort_by, filter.sort_order) {
                (SortField::CreatedAt, SortOrder::Asc) => query.order(orders::created_at.asc()),
                (SortField::CreatedAt, SortOrder::Desc) => query.order(orders::created_at.desc()),
                (SortField::UpdatedAt, SortOrder::Asc) => query.order(orders::updated_at.asc()),
                (SortField::UpdatedAt, SortOrder::Desc) => query.order(orders::updated_at.desc()),
                (SortField::TotalAmount, SortOrder::Asc) => {
                    query.order(orders::total_amount.asc())
                }
                (SortField::TotalAmount, SortOrder::Desc) => {
                    query.order(orders::total_amount.desc())
                }
                (SortField::Status, SortOrder::Asc) => query.order(orders::status.asc()),
                (SortField::Status, SortOrder::Desc) => query.order(orders::status.desc()),
            };

            let rows: Vec<OrderRow> = query
                .limit(filter.limit)
                .offset(filter.offset())
                .load(conn)?;

            Ok(ListResult {
                items: rows
                    .into_iter()
                    .map(Order::try_from)
                    .collect::<Result<_, _>>()?,
                total,
            })
        })
    }

    fn update(&self, id: Uuid, patch: &OrderPatch) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let current = orders::table
                .find(id)
                .select(OrderRow::as_select())
                .for_update()
                .first::<OrderRow>(conn)
                .optional()?;
            let Some(current) = current else {
                return Ok(None);
            };

            // Keep total = items + shipping when the fee moves.
            let total_amount = patch
                .shipping_fee
                .as_ref()
                .map(|fee| &current.total_amount - &current.shipping_fee + fee);

            let row = diesel::update(orders::table.find(id))
                .set(&OrderChangeset {
                    address_id: patch.address_id,
                    shipping_fee: patch.shipping_fee.clone(),
                    total_amount,
                    notes: patch.notes.clone(),
                    tracking_number: patch.tracking_number.clone(),
                    carrier: patch.carrier.clone(),
                    is_pay: patch.is_pay,
                    updated_at: Utc::now(),
                })
                .returning(OrderRow::as_returning())
                .get_result::<OrderRow>(conn)?;
            Ok(Some(row.try_into()?))
        })
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(orders::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}
