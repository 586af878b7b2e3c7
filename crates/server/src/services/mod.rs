//! External service clients.

pub mod relay;

pub use relay::{
    HttpRelay, LogRelay, OrderNotification, Relay, RelayError, RelayMessage, TokenNotification,
};
