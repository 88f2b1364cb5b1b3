//! # fuega-core
//!
//! Foundation types for the Fuega operator console.
//!
//! This crate provides the shared vocabulary the realtime pipeline is built
//! on:
//!
//! - **Branded IDs**: `EntryId` as a newtype for type safety
//! - **Activity records**: `ActivityEntry` and the `ActivityKind` taxonomy
//! - **Rolling buffers**: fixed-capacity, newest-first `RingBuffer`
//! - **Constants**: buffer capacities and the reconnection delay
//! - **Logging**: `tracing` subscriber initialization

#![deny(unsafe_code)]

pub mod activity;
pub mod constants;
pub mod ids;
pub mod logging;
pub mod ring;

pub use activity::{ActivityEntry, ActivityKind};
pub use ids::EntryId;
pub use ring::RingBuffer;
