use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::upsert::excluded;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::events::OrderEvent;
use crate::domain::order::OrderStatus;
use crate::domain::ports::OrderEventHandler;
use crate::infrastructure::models::{NewWalletTransactionRow, OrderRow};
use crate::schema::{orders, wallet_transactions, wallets};

use super::shop_owner;

pub const KIND_SHOP_TRANSFER: &str = "SHOP_TRANSFER";
pub const KIND_REFUND: &str = "REFUND";
pub const KIND_SHOP_REVERSAL: &str = "SHOP_REVERSAL";

/// Moves money between wallets when paid orders are delivered or cancelled.
///
/// Each operation locks the order row and records a ledger entry keyed by
/// `(order_id, kind)`, so replaying an event never pays twice.
pub struct WalletSubscriber {
    pool: DbPool,
}

impl WalletSubscriber {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Credits the shop owner with the order total once the order is
    /// delivered and paid.
    pub fn transfer_to_shop_wallet(&self, order_id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let Some(order) = lock_order(conn, order_id)? else {
                return Ok(false);
            };
            let delivered = order.status == OrderStatus::Delivered.as_str();
            if !order.is_pay || order.wallet_transferred || !delivered {
                return Ok(false);
            }

            let owner = shop_owner(conn, order.shop_id)?;
            let amount = &order.total_amount;
            if !record_transaction(conn, order.id, owner, KIND_SHOP_TRANSFER, amount)? {
                return Ok(false);
            }
            adjust_balance(conn, owner, &order.total_amount)?;
            diesel::update(orders::table.find(order.id))
                .set((
                    orders::wallet_transferred.eq(true),
                    orders::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;

            log::info!(
                "Transferred {} to wallet of shop owner {} for order {}",
                order.total_amount,
                owner,
                order.id
            );
            Ok(true)
        })
    }

    /// Returns the order total to the buyer. If the shop had already been
    /// paid out, the payout is clawed back.
    pub fn refund_order(&self, order_id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let Some(order) = lock_order(conn, order_id)? else {
                return Ok(false);
            };
            if !order.is_pay {
                return Ok(false);
            }
            let amount = &order.total_amount;
            if !record_transaction(conn, order.id, order.user_id, KIND_REFUND, amount)? {
                return Ok(false);
            }
            adjust_balance(conn, order.user_id, &order.total_amount)?;

            if order.wallet_transferred {
                let owner = shop_owner(conn, order.shop_id)?;
                let clawback = -order.total_amount.clone();
                record_transaction(conn, order.id, owner, KIND_SHOP_REVERSAL, &clawback)?;
                adjust_balance(conn, owner, &clawback)?;
                diesel::update(orders::table.find(order.id))
                    .set((
                        orders::wallet_transferred.eq(false),
                        orders::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)?;
            }

            log::info!(
                "Refunded {} to user {} for order {}",
                order.total_amount,
                order.user_id,
                order.id
            );
            Ok(true)
        })
    }
}

fn lock_order(conn: &mut PgConnection, order_id: Uuid) -> Result<Option<OrderRow>, DomainError> {
    Ok(orders::table
        .find(order_id)
        .select(OrderRow::as_select())
        .for_update()
        .first::<OrderRow>(conn)
        .optional()?)
}

/// Returns `false` when an entry of this kind already exists for the order.
fn record_transaction(
    conn: &mut PgConnection,
    order_id: Uuid,
    owner_id: Uuid,
    kind: &str,
    amount: &BigDecimal,
) -> Result<bool, DomainError> {
    let inserted = diesel::insert_into(wallet_transactions::table)
        .values(&NewWalletTransactionRow {
            id: Uuid::new_v4(),
            order_id,
            owner_id,
            kind,
            amount: amount.clone(),
        })
        .on_conflict((wallet_transactions::order_id, wallet_transactions::kind))
        .do_nothing()
        .execute(conn)?;
    Ok(inserted == 1)
}

fn adjust_balance(
    conn: &mut PgConnection,
    owner_id: Uuid,
    delta: &BigDecimal,
) -> Result<(), DomainError> {
    diesel::insert_into(wallets::table)
        .values((
            wallets::owner_id.eq(owner_id),
            wallets::balance.eq(delta),
            wallets::updated_at.eq(Utc::now()),
        ))
        .on_conflict(wallets::owner_id)
        .do_update()
        .set((
            wallets::balance.eq(wallets::balance + excluded(wallets::balance)),
            wallets::updated_at.eq(excluded(wallets::updated_at)),
        ))
        .execute(conn)?;
    Ok(())
}

impl OrderEventHandler for WalletSubscriber {
    fn name(&self) -> &'static str {
        "wallet"
    }

    fn handle(&self, event: &OrderEvent) -> Result<(), DomainError> {
        match event {
            OrderEvent::OrderStatusChanged(e) if e.is_pay => {
                if e.status == OrderStatus::Delivered.as_str() && !e.wallet_transferred {
                    self.transfer_to_shop_wallet(e.order_id)?;
                } else if e.status == OrderStatus::Cancelled.as_str() {
                    self.refund_order(e.order_id)?;
                }
            }
            OrderEvent::OrderCancelled(e) if e.is_pay => {
                self.refund_order(e.order_id)?;
            }
            _ => {}
        }
        Ok(())
    }
}
