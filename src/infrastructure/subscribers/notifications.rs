use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::events::OrderEvent;
use crate::domain::ports::OrderEventHandler;
use crate::infrastructure::models::NewNotificationRow;
use crate::schema::notifications;

use super::shop_owner;

pub const KIND_ORDER_PLACED: &str = "ORDER_PLACED";
pub const KIND_NEW_ORDER: &str = "NEW_ORDER";
pub const KIND_ORDER_STATUS: &str = "ORDER_STATUS";
pub const KIND_ORDER_UPDATE: &str = "ORDER_UPDATE";

/// Writes in-app notifications for buyers and shop owners.
pub struct NotificationSubscriber {
    pool: DbPool,
}

impl NotificationSubscriber {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn notification(
    user_id: Uuid,
    order_id: Uuid,
    kind: &str,
    title: &str,
    message: String,
) -> NewNotificationRow {
    NewNotificationRow {
        id: Uuid::new_v4(),
        user_id,
        order_id: Some(order_id),
        kind: kind.to_string(),
        title: title.to_string(),
        message,
    }
}

fn short_id(order_id: Uuid) -> String {
    order_id.simple().to_string()[..8].to_uppercase()
}

impl OrderEventHandler for NotificationSubscriber {
    fn name(&self) -> &'static str {
        "notifications"
    }

    fn handle(&self, event: &OrderEvent) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        match event {
            OrderEvent::OrderPlaced(e) => {
                // The buyer's row goes in first so a missing shop only costs
                // the owner's notification.
                insert(
                    &mut conn,
                    &notification(
                        e.user_id,
                        e.order_id,
                        KIND_ORDER_PLACED,
                        "Đặt hàng thành công",
                        format!(
                            "Đơn hàng #{} của bạn đã được đặt thành công",
                            short_id(e.order_id)
                        ),
                    ),
                )?;
                let owner = shop_owner(&mut conn, e.shop_id)?;
                insert(
                    &mut conn,
                    &notification(
                        owner,
                        e.order_id,
                        KIND_NEW_ORDER,
                        "Bạn có đơn hàng mới",
                        format!(
                            "Đơn hàng #{} trị giá {} vừa được đặt",
                            short_id(e.order_id),
                            e.total_amount.round(2)
                        ),
                    ),
                )
            }
            OrderEvent::OrderStatusChanged(e) => insert(
                &mut conn,
                &notification(
                    e.user_id,
                    e.order_id,
                    KIND_ORDER_STATUS,
                    "Cập nhật đơn hàng",
                    format!(
                        "Đơn hàng #{} đã chuyển sang trạng thái {}",
                        short_id(e.order_id),
                        e.status
                    ),
                ),
            ),
            OrderEvent::OrderCancelled(e) => {
                let owner = shop_owner(&mut conn, e.shop_id)?;
                let message = match &e.reason {
                    Some(reason) => format!(
                        "Khách hàng đã hủy đơn hàng #{}: {}",
                        short_id(e.order_id),
                        reason
                    ),
                    None => format!("Khách hàng đã hủy đơn hàng #{}", short_id(e.order_id)),
                };
                insert(
                    &mut conn,
                    &notification(
                        owner,
                        e.order_id,
                        KIND_ORDER_UPDATE,
                        "Đơn hàng bị hủy",
                        message,
                    ),
                )
            }
        }
    }
}

fn insert(conn: &mut PgConnection, row: &NewNotificationRow) -> Result<(), DomainError> {
    diesel::insert_into(notifications::table)
        .values(row)
        .execute(conn)?;
    Ok(())
}
