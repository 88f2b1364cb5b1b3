//! Realtime event pipeline for the Fuega operator console.
//!
//! The pipeline has four pieces:
//!
//! - [`ConnectionManager`] owns the single shared push connection, its
//!   reconnect loop, and the rolling inbound event buffer
//! - [`InstrumentationBus`] is the in-process pub/sub channel that local
//!   components publish their own activity to
//! - [`fuega_events::classify`] turns raw push events into display entries
//! - [`ActivityConsole`] merges both streams into one bounded, newest-first
//!   operator view
//!
//! [`ApiClient`] is the bus's in-repo producer: REST calls surface in the
//! console alongside push events.

#![deny(unsafe_code)]

pub mod api;
pub mod bus;
pub mod config;
pub mod connection;
pub mod console;
pub mod errors;

pub use api::ApiClient;
pub use bus::InstrumentationBus;
pub use config::ConsoleConfig;
pub use connection::{ConnectionManager, ConnectionNotice, ConnectionState, ListenerHandle};
pub use console::ActivityConsole;
pub use errors::{ConsoleError, Result};
