//! Domain models for the app server.

pub mod session;

pub use session::Session;
