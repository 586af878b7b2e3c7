//! Magic Checkout Core - Shared types library.
//!
//! This crate provides common types used across all Magic Checkout components:
//! - `server` - Shopify app backend (OAuth entry point, webhooks, relay)
//! - `cli` - Command-line tools for setup and migrations
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for shop domains and webhook topics

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
