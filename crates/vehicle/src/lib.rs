//! # Vehicle Simulator
//!
//! Simulates a vehicle patrolling a route and reports its lifecycle and
//! telemetry over a publish/subscribe channel.

mod config;
mod coordinate;
mod error;
mod protocol;
mod simulator;
mod telemetry;

pub mod route;

pub use self::config::SimConfig;
pub use self::coordinate::Coordinate;
pub use self::error::Error;
pub use self::protocol::*;
pub use self::route::{Route, load_route, parse_itn};
pub use self::simulator::*;
pub use self::telemetry::Drivetrain;

/// Result type for the simulator.
pub type Result<T> = anyhow::Result<T, Error>;
