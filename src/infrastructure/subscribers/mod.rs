//! Outbox subscribers carrying out the side effects of order changes.

mod cart;
mod notifications;
mod wallet;

pub use cart::CartSubscriber;
pub use notifications::NotificationSubscriber;
pub use wallet::WalletSubscriber;

use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::schema::shops;

use super::models::ShopRow;

fn shop_owner(conn: &mut PgConnection, shop_id: Uuid) -> Result<Uuid, DomainError> {
    shops::table
        .find(shop_id)
        .select(ShopRow::as_select())
        .first::<ShopRow>(conn)
        .optional()?
        .map(|shop| shop.owner_id)
        .ok_or_else(|| DomainError::NotFound(format!("shop {} not found", shop_id)))
}
