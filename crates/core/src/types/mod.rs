//! Shared newtype wrappers.

mod shop;
mod topic;

pub use shop::{ShopDomain, ShopDomainError};
pub use topic::{UnknownTopic, WebhookTopic};
