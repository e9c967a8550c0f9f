//! Travel-time source interfaces for gotime
//!
//! This crate defines the capability boundary between the monitoring core
//! and the external travel-time provider. It contains:
//! - Coordinate and departure types
//! - The `TravelTimeSource` and `Geocoder` traits
//! - The Google Maps web-services client
//! - A scripted `MockSource` for tests

mod error;
mod google;
mod mock;
mod traits;
mod types;

pub use error::*;
pub use google::*;
pub use mock::*;
pub use traits::*;
pub use types::*;
