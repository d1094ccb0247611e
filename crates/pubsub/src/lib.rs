//! # Pub/Sub Core
//!
//! Messaging channel abstractions shared by the vehicle simulator and the
//! transports that carry its messages.

mod error;
mod provider;

pub use crate::error::*;
pub use crate::provider::*;
