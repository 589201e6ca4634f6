//! TechPredictor authentication service
//!
//! Login issues a short-lived access token in the response body and a
//! refresh token in an httpOnly cookie scoped to the refresh endpoint.
//! Refresh rotates that cookie, logout blacklists the refresh token, and
//! registration creates role-tagged accounts with bcrypt-hashed passwords.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod store;

pub use config::Config;
pub use error::Error;
