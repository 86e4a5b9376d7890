use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use chrono::Utc;
use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::events::OrderEvent;
use crate::domain::ports::OrderEventHandler;
use crate::schema::order_outbox;

use super::models::OutboxEventRow;

/// Delivers outbox events to in-process subscribers.
///
/// Rows are claimed with `FOR UPDATE SKIP LOCKED` and marked processed in the
/// same short transaction, so several relays can run side by side and every
/// event is handed out at most once. Subscribers run after the claim has
/// committed; a failing subscriber is logged and skipped.
#[derive(Clone)]
pub struct OutboxRelay {
    pool: DbPool,
    handlers: Vec<Arc<dyn OrderEventHandler>>,
    batch_size: i64,
}

impl OutboxRelay {
    pub fn new(pool: DbPool, batch_size: i64) -> Self {
        Self {
            pool,
            handlers: Vec::new(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn with_handler<H: OrderEventHandler>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    fn claim_pending(&self) -> Result<Vec<OutboxEventRow>, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let rows: Vec<OutboxEventRow> = order_outbox::table
                .filter(order_outbox::processed_at.is_null())
                .order(order_outbox::created_at.asc())
                .limit(self.batch_size)
                .select(OutboxEventRow::as_select())
                .for_update()
                .skip_locked()
                .load(conn)?;

            if !rows.is_empty() {
                let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
                diesel::update(order_outbox::table.filter(order_outbox::id.eq_any(ids)))
                    .set(order_outbox::processed_at.eq(Utc::now()))
                    .execute(conn)?;
            }
            Ok(rows)
        })
    }

    /// Claims one batch and dispatches it. Returns the number of rows claimed.
    pub fn dispatch_pending(&self) -> Result<usize, DomainError> {
        let rows = self.claim_pending()?;
        for row in &rows {
            let event: OrderEvent = match serde_json::from_value(row.payload.clone()) {
                Ok(event) => event,
                Err(e) => {
                    log::error!(
                        "Dropping undecodable outbox event {} ({}): {}",
                        row.id,
                        row.event_type,
                        e
                    );
                    continue;
                }
            };
            self.dispatch(&event);
        }
        Ok(rows.len())
    }

    fn dispatch(&self, event: &OrderEvent) {
        for handler in &self.handlers {
            if let Err(e) = handler.handle(event) {
                log::warn!(
                    "{} failed to handle {} for order {}: {}",
                    handler.name(),
                    event.event_type(),
                    event.order_id(),
                    e
                );
            }
        }
    }

    /// Polls the outbox forever on the current actix runtime. Database work
    /// runs on the blocking thread pool.
    pub async fn run(self, interval: Duration) {
        let relay = Arc::new(self);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let relay = Arc::clone(&relay);
            match web::block(move || relay.dispatch_pending()).await {
                Ok(Ok(0)) => {}
                Ok(Ok(n)) => log::debug!("Relayed {} outbox event(s)", n),
                Ok(Err(e)) => log::error!("Outbox relay failed: {}", e),
                Err(e) => log::error!("Outbox relay task failed: {}", e),
            }
        }
    }
}
