//! Domain operations over a `Store`. No transaction stays open while mail is sent.

pub mod addresses;
pub mod carts;
pub mod catalog;
pub mod orders;
pub mod stock_notifications;
