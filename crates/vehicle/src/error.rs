//! # Vehicle Errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Domain-specific error codes for the vehicle simulator.
/// Covers route loading, state transitions, and message emission.
#[derive(Error, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Error {
    #[error("code: invalid_route, description: route has no waypoints")]
    InvalidRoute,

    #[error("code: invalid_vehicle_id, description: {0}")]
    InvalidVehicleId(String),

    #[error("code: index_out_of_range, description: waypoint {index} outside route of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("code: already_running")]
    AlreadyRunning,

    #[error("code: not_running")]
    NotRunning,

    #[error("code: route_parse_error, description: {0}")]
    RouteParse(String),

    #[error("code: invalid_format, description: {0}")]
    InvalidFormat(String),

    #[error("code: publish_error, description: {0}")]
    Publish(String),

    #[error("code: server_error, description: {0}")]
    ServerError(String),
}

impl Error {
    /// Returns the error code.
    #[must_use]
    pub const fn code(&self) -> &str {
        match self {
            Self::InvalidRoute => "invalid_route",
            Self::InvalidVehicleId(_) => "invalid_vehicle_id",
            Self::IndexOutOfRange { .. } => "index_out_of_range",
            Self::AlreadyRunning => "already_running",
            Self::NotRunning => "not_running",
            Self::RouteParse(_) => "route_parse_error",
            Self::InvalidFormat(_) => "invalid_format",
            Self::Publish(_) => "publish_error",
            Self::ServerError(_) => "server_error",
        }
    }

    /// Returns the error description.
    #[must_use]
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<Self>() {
            Some(Self::InvalidVehicleId(e)) => Self::InvalidVehicleId(format!("{err}: {e}")),
            Some(Self::RouteParse(e)) => Self::RouteParse(format!("{err}: {e}")),
            Some(Self::InvalidFormat(e)) => Self::InvalidFormat(format!("{err}: {e}")),
            Some(Self::Publish(e)) => Self::Publish(format!("{err}: {e}")),
            Some(Self::ServerError(e)) => Self::ServerError(format!("{err}: {e}")),

            // variants without detail pass through unchanged
            Some(inner @ (Self::InvalidRoute
            | Self::IndexOutOfRange { .. }
            | Self::AlreadyRunning
            | Self::NotRunning)) => inner.clone(),
            None => {
                let stack = err.chain().fold(String::new(), |cause, e| format!("{cause} -> {e}"));
                let stack = stack.trim_start_matches(" -> ").to_string();
                Self::ServerError(stack)
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidFormat(err.to_string())
    }
}
