//! # armory_core
//!
//! Client-side core for Armory: session storage, the authenticated
//! session client, the QR scan controller and the backend service calls
//! built on top of them.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod inventory;
pub mod models;
pub mod navigation;
pub mod scan;
pub mod storage;

pub use client::{RequestBody, SessionClient};
pub use error::{ClientError, ClientResult};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
