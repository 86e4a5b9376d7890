use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::events::{OrderEvent, PlacedLine};
use crate::domain::ports::OrderEventHandler;
use crate::infrastructure::models::CartItemRow;
use crate::schema::{cart_items, carts};

/// Removes what was just ordered from the buyer's cart.
pub struct CartSubscriber {
    pool: DbPool,
}

impl CartSubscriber {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Matches cart rows on product and variant and takes away at most the
    /// ordered quantity. Rows that reach zero are deleted. Returns the number
    /// of units removed.
    pub fn prune(&self, user_id: Uuid, lines: &[PlacedLine]) -> Result<i32, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let cart_ids: Vec<Uuid> = carts::table
                .filter(carts::user_id.eq(user_id))
                .select(carts::id)
                .load(conn)?;
            if cart_ids.is_empty() {
                return Ok(0);
            }

            let mut removed = 0;
            for line in lines {
                let rows: Vec<CartItemRow> = cart_items::table
                    .filter(cart_items::cart_id.eq_any(&cart_ids))
                    .filter(cart_items::product_id.eq(line.product_id))
                    .filter(cart_items::variant_id.is_not_distinct_from(line.variant_id))
                    .order(cart_items::created_at.asc())
                    .select(CartItemRow::as_select())
                    .for_update()
                    .load(conn)?;

                let mut remaining = line.quantity;
                for row in rows {
                    if remaining <= 0 {
                        break;
                    }
                    let take = row.quantity.min(remaining);
                    if take == row.quantity {
                        diesel::delete(cart_items::table.find(row.id)).execute(conn)?;
                    } else {
                        diesel::update(cart_items::table.find(row.id))
                            .set(cart_items::quantity.eq(cart_items::quantity - take))
                            .execute(conn)?;
                    }
                    remaining -= take;
                    removed += take;
                }
            }
            Ok(removed)
        })
    }
}

impl OrderEventHandler for CartSubscriber {
    fn name(&self) -> &'static str {
        "cart"
    }

    fn handle(&self, event: &OrderEvent) -> Result<(), DomainError> {
        if let OrderEvent::OrderPlaced(e) = event {
            let removed = self.prune(e.user_id, &e.lines)?;
            if removed > 0 {
                log::debug!(
                    "Removed {} unit(s) from cart of user {} after order {}",
                    removed,
                    e.user_id,
                    e.order_id
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use diesel::prelude::*;
    use uuid::Uuid;

    use super::*;
    use crate::infrastructure::models::NewCartItemRow;
    use crate::infrastructure::test_support::setup_db;

    fn seed_cart(pool: &DbPool, user_id: Uuid, items: &[(Uuid, Option<Uuid>, i32)]) {
        let mut conn = pool.get().expect("Failed to get connection");
        let cart_id = Uuid::new_v4();
        diesel::insert_into(carts::table)
            .values((carts::id.eq(cart_id), carts::user_id.eq(user_id)))
            .execute(&mut conn)
            .expect("insert cart failed");
        let rows: Vec<NewCartItemRow> = items
            .iter()
            .map(|(product_id, variant_id, quantity)| NewCartItemRow {
                id: Uuid::new_v4(),
                cart_id,
                product_id: *product_id,
                variant_id: *variant_id,
                quantity: *quantity,
            })
            .collect();
        diesel::insert_into(cart_items::table)
            .values(&rows)
            .execute(&mut conn)
            .expect("insert cart items failed");
    }

    fn cart_contents(pool: &DbPool) -> Vec<(Uuid, Option<Uuid>, i32)> {
        let mut conn = pool.get().expect("Failed to get connection");
        cart_items::table
            .select((
                cart_items::product_id,
                cart_items::variant_id,
                cart_items::quantity,
            ))
            .load(&mut conn)
            .expect("query failed")
    }

    #[tokio::test]
    async fn prune_respects_variant_and_quantity() {
        let (_container, pool) = setup_db().await;
        let user = Uuid::new_v4();
        let shirt = Uuid::new_v4();
        let size_m = Uuid::new_v4();
        let mug = Uuid::new_v4();
        seed_cart(
            &pool,
            user,
            &[(shirt, Some(size_m), 3), (shirt, None, 1), (mug, None, 1)],
        );

        let subscriber = CartSubscriber::new(pool.clone());
        let removed = subscriber
            .prune(
                user,
                &[
                    PlacedLine {
                        product_id: shirt,
                        variant_id: Some(size_m),
                        quantity: 2,
                    },
                    PlacedLine {
                        product_id: mug,
                        variant_id: None,
                        quantity: 4,
                    },
                ],
            )
            .expect("prune failed");

        assert_eq!(removed, 3);
        let mut contents = cart_contents(&pool);
        contents.sort_by_key(|(_, variant, _)| variant.is_none());
        assert_eq!(contents, vec![(shirt, Some(size_m), 1), (shirt, None, 1)]);
    }

    #[tokio::test]
    async fn prune_without_cart_is_a_no_op() {
        let (_container, pool) = setup_db().await;
        let subscriber = CartSubscriber::new(pool);
        let removed = subscriber
            .prune(
                Uuid::new_v4(),
                &[PlacedLine {
                    product_id: Uuid::new_v4(),
                    variant_id: None,
                    quantity: 1,
                }],
            )
            .expect("prune failed");
        assert_eq!(removed, 0);
    }
}
