//! Core domain for a paying-guest (PG) accommodation marketplace.
//!
//! Students search listings and apply to join them, owners list properties
//! and decide on applications, admins approve listings before they become
//! searchable. The [`marketplace`] module holds the entities, their state
//! machines, and the access rules; persistence and session transport stay
//! behind traits so the service binary can choose its own adapters.

pub mod config;
pub mod error;
pub mod marketplace;
pub mod telemetry;
