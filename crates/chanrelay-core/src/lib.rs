//! Core routing + transform engine for the channel relay bot.
//!
//! This crate is intentionally framework-agnostic. The Telegram transport lives
//! behind the `MessageBus` port (trait) implemented in the adapter crate.

pub mod admin;
pub mod config;
pub mod dialog;
pub mod domain;
pub mod errors;
pub mod forwarder;
pub mod logging;
pub mod messaging;
pub mod relay;
pub mod roles;
pub mod routing;
pub mod store;
pub mod transform;

pub use errors::{Error, Result};
