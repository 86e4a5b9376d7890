pub mod caller;
pub mod errors;
pub mod events;
pub mod order;
pub mod ports;
