use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::domain::caller::Caller;
use crate::domain::errors::DomainError;
use crate::domain::events::OrderEvent;
use crate::domain::order::*;
use crate::domain::ports::{OrderRepository, UnitOfWork};

pub struct OrderService<R> {
    repo: R,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Places an order: reserves stock, snapshots prices and writes the
    /// order, its items, the first history entry and an `OrderPlaced` event
    /// in one transaction. Any failure leaves the store untouched.
    pub fn create(
        &self,
        caller: &Caller,
        input: CreateOrderInput,
    ) -> Result<OrderDetails, DomainError> {
        if input.items.is_empty() {
            return Err(DomainError::Validation(MSG_EMPTY_ITEMS.to_string()));
        }
        if input.payment_method.trim().is_empty() {
            return Err(DomainError::Validation(
                MSG_MISSING_PAYMENT_METHOD.to_string(),
            ));
        }

        let user_id = caller.user_id;
        let details = self.repo.transaction(|uow| {
            let mut shop_id = input.shop_id;
            let mut subtotal = BigDecimal::from(0);
            let mut discount_amount = BigDecimal::from(0);
            let mut lines = Vec::with_capacity(input.items.len());

            for item in &input.items {
                let product = uow
                    .find_product(item.product_id)?
                    .ok_or_else(|| DomainError::Validation(MSG_PRODUCT_NOT_FOUND.to_string()))?;

                match shop_id {
                    Some(expected) if expected != product.shop_id => {
                        return Err(DomainError::Validation(
                            MSG_PRODUCT_NOT_IN_SHOP.to_string(),
                        ));
                    }
                    Some(_) => {}
                    None => shop_id = Some(product.shop_id),
                }

                let quantity = normalize_quantity(item.quantity);
                let base_price = reserve_stock(uow, &product, item.variant_id, quantity)?;
                let line = LinePrice::compute(&base_price, &product.discount, quantity);

                subtotal += &line.total_price;
                discount_amount += &line.discount_amount;
                lines.push((item, quantity, base_price, line));
            }

            let shipping_fee = normalize_amount(input.shipping_fee);
            let order = uow.insert_order(NewOrder {
                user_id,
                shop_id: shop_id.ok_or_else(|| {
                    DomainError::Validation(MSG_PRODUCT_NOT_FOUND.to_string())
                })?,
                total_amount: &subtotal + &shipping_fee,
                shipping_fee,
                discount_amount,
                address_id: input.address_id,
                payment_method: input.payment_method.trim().to_string(),
                notes: input.notes.clone(),
                voucher_id: input.voucher_id,
            })?;

            let new_items = lines
                .into_iter()
                .map(|(item, quantity, price, line)| NewOrderItem {
                    order_id: order.id,
                    product_id: item.product_id,
                    variant_id: item.variant_id,
                    quantity,
                    price,
                    discounted_price: line.discounted_price,
                    total_price: line.total_price,
                    discount: line.discount,
                    tax: normalize_amount(item.tax),
                })
                .collect();
            let items = uow.insert_items(new_items)?;

            let history =
                uow.append_history(order.id, OrderStatus::Pending, HISTORY_ORDER_CREATED)?;
            uow.record_event(&OrderEvent::placed(&order, &items))?;

            Ok(OrderDetails {
                order,
                items,
                history: vec![history],
            })
        })?;

        log::info!(
            "Order {} placed by user {} for shop {} (total {})",
            details.order.id,
            details.order.user_id,
            details.order.shop_id,
            details.order.total_amount
        );
        Ok(details)
    }

    pub fn get(&self, caller: &Caller, id: Uuid) -> Result<OrderDetails, DomainError> {
        let details = self
            .repo
            .find_details(id)?
            .ok_or_else(DomainError::order_not_found)?;
        if !caller.can_access(details.order.user_id) {
            return Err(DomainError::Forbidden(MSG_ORDER_FORBIDDEN.to_string()));
        }
        Ok(details)
    }

    /// Non-admin callers only ever see their own orders, whatever the query
    /// says.
    pub fn list(
        &self,
        caller: &Caller,
        query: ListQuery,
    ) -> Result<(ListResult, OrderFilter), DomainError> {
        let status = query
            .status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.parse::<OrderStatus>()
                    .map_err(|_| DomainError::Validation(MSG_INVALID_STATUS.to_string()))
            })
            .transpose()?;

        let user_id = if caller.is_admin() {
            query.user_id
        } else {
            Some(caller.user_id)
        };

        let filter = OrderFilter {
            user_id,
            shop_id: query.shop_id,
            status,
            page: query.page.unwrap_or(1).max(1),
            limit: query
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
            sort_by: query
                .sort_by
                .as_deref()
                .map(SortField::parse)
                .unwrap_or_default(),
            sort_order: query
                .sort_order
                .as_deref()
                .map(SortOrder::parse)
                .unwrap_or_default(),
        };

        let result = self.repo.list(&filter)?;
        Ok((result, filter))
    }

    pub fn update(
        &self,
        caller: &Caller,
        id: Uuid,
        patch: OrderPatch,
    ) -> Result<Order, DomainError> {
        require_admin(caller)?;
        if let Some(fee) = &patch.shipping_fee {
            if *fee < BigDecimal::from(0) {
                return Err(DomainError::Validation(MSG_INVALID_SHIPPING_FEE.to_string()));
            }
        }
        let order = self
            .repo
            .update(id, &patch)?
            .ok_or_else(DomainError::order_not_found)?;
        log::info!("Order {} updated by {}", order.id, caller.user_id);
        Ok(order)
    }

    /// Moves an order to `status`, appends a history entry and queues an
    /// `OrderStatusChanged` event. Wallet and notification work happens when
    /// the event is relayed, so it can never undo the transition.
    pub fn update_status(
        &self,
        caller: &Caller,
        id: Uuid,
        status: OrderStatus,
        description: Option<String>,
    ) -> Result<OrderDetails, DomainError> {
        require_admin(caller)?;
        let description = description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| status.change_description());

        self.repo.transaction(|uow| {
            let order = uow
                .set_status(id, status, None)?
                .ok_or_else(DomainError::order_not_found)?;
            uow.append_history(order.id, status, &description)?;
            uow.record_event(&OrderEvent::status_changed(&order, &description))?;
            Ok(())
        })?;

        log::info!("Order {} moved to {} by {}", id, status, caller.user_id);
        self.repo
            .find_details(id)?
            .ok_or_else(DomainError::order_not_found)
    }

    /// [`Self::update_status`] for a status name taken off the wire. The
    /// admin check runs before the name is parsed.
    pub fn change_status(
        &self,
        caller: &Caller,
        id: Uuid,
        status: &str,
        description: Option<String>,
    ) -> Result<OrderDetails, DomainError> {
        require_admin(caller)?;
        let status = status
            .parse::<OrderStatus>()
            .map_err(|_| DomainError::Validation(MSG_INVALID_STATUS.to_string()))?;
        self.update_status(caller, id, status, description)
    }

    /// Buyer-initiated cancellation. Stock goes back on the shelf in the same
    /// transaction that flips the status.
    pub fn cancel_by_user(
        &self,
        caller: &Caller,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<OrderDetails, DomainError> {
        let reason = reason.filter(|r| !r.trim().is_empty());

        self.repo.transaction(|uow| {
            let order = uow.lock_order(id)?.ok_or_else(DomainError::order_not_found)?;
            if !caller.can_access(order.user_id) {
                return Err(DomainError::Forbidden(MSG_ORDER_FORBIDDEN.to_string()));
            }
            if !order.status.is_cancellable() {
                return Err(DomainError::Conflict(MSG_NOT_CANCELLABLE.to_string()));
            }

            let order = uow
                .set_status(id, OrderStatus::Cancelled, reason.as_deref())?
                .ok_or_else(DomainError::order_not_found)?;
            restore_inventory(uow, order.id)?;

            let description = match &reason {
                Some(r) => format!("Order cancelled by user: {}", r),
                None => "Order cancelled by user".to_string(),
            };
            uow.append_history(order.id, OrderStatus::Cancelled, &description)?;
            uow.record_event(&OrderEvent::cancelled(&order))?;
            Ok(())
        })?;

        log::info!("Order {} cancelled by {}", id, caller.user_id);
        self.repo
            .find_details(id)?
            .ok_or_else(DomainError::order_not_found)
    }

    pub fn delete(&self, caller: &Caller, id: Uuid) -> Result<(), DomainError> {
        require_admin(caller)?;
        if !self.repo.delete(id)? {
            return Err(DomainError::order_not_found());
        }
        log::info!("Order {} deleted by {}", id, caller.user_id);
        Ok(())
    }
}

fn require_admin(caller: &Caller) -> Result<(), DomainError> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(DomainError::Forbidden(MSG_ADMIN_ONLY.to_string()))
    }
}

/// Takes `quantity` units from the variant (if any) or the product itself and
/// returns the base unit price of what was reserved.
fn reserve_stock(
    uow: &mut dyn UnitOfWork,
    product: &Product,
    variant_id: Option<Uuid>,
    quantity: i32,
) -> Result<BigDecimal, DomainError> {
    match variant_id {
        Some(variant_id) => {
            let variant = uow
                .find_variant(product.id, variant_id)?
                .ok_or_else(|| DomainError::Validation(MSG_VARIANT_NOT_FOUND.to_string()))?;
            if variant.stock < quantity || !uow.reserve_variant_stock(variant.id, quantity)? {
                return Err(DomainError::Validation(MSG_VARIANT_OUT_OF_STOCK.to_string()));
            }
            Ok(variant.price)
        }
        None => {
            if product.stock < quantity || !uow.reserve_product_stock(product.id, quantity)? {
                return Err(DomainError::Validation(MSG_PRODUCT_OUT_OF_STOCK.to_string()));
            }
            Ok(product.price.clone())
        }
    }
}

/// Puts every item of the order back into stock. Exact inverse of the
/// reservation done at creation.
pub fn restore_inventory(uow: &mut dyn UnitOfWork, order_id: Uuid) -> Result<(), DomainError> {
    for item in uow.order_items(order_id)? {
        match item.variant_id {
            Some(variant_id) => uow.restock_variant(variant_id, item.quantity)?,
            None => uow.restock_product(item.product_id, item.quantity)?,
        }
    }
    Ok(())
}
