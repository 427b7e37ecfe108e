//! In-memory registry model.
//!
//! `RegistryCollector` owns every `ServiceContract` touched during a pass and
//! a reverse index from declaring type to the contracts it contributed to,
//! which makes stale removal proportional to what the type actually touched.

pub mod collector;
pub mod contract;

pub use collector::RegistryCollector;
pub use contract::ServiceContract;
