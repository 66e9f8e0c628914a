//! County conquest engine: proximity partitioning of regions among sites,
//! contiguity-preserving area rebalancing, and a copy-on-write conquest ledger.

pub mod config;
pub mod data;
pub mod error;
pub mod geo;
pub mod territory;

pub use config::{AppConfig, EngineConfig};
pub use error::EngineError;
