pub mod carts;
pub mod chat;
pub mod checkout;
pub mod common;
pub mod orders;
pub mod products;
pub mod users;
pub mod webhooks;
