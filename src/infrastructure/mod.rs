pub mod models;
pub mod order_repo;
pub mod outbox_relay;
pub mod subscribers;

#[cfg(test)]
pub mod test_support;
