//! Core types and service wiring for the kelvin temperature aggregator.

/// JSON-over-HTTP helper used by provider crates.
pub mod http;
/// Domain models shared by all providers.
pub mod model;
/// Ordered registry of the providers behind the aggregator.
pub mod plugin;
/// Traits describing the provider interface.
pub mod ports;
/// Aggregation service used by clients.
pub mod service;

pub use model::*;
pub use plugin::*;
pub use ports::*;
pub use service::*;
