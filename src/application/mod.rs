pub mod order_service;

#[cfg(test)]
mod in_memory;
