//! Messaging channel errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the crate.
pub type Result<T> = anyhow::Result<T, Error>;

/// Transport level error type returned by channel implementations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Error {
    /// The broker could not be reached or refused the connection.
    #[error("code: connection_error, description: {0}")]
    Connection(String),

    /// A message could not be handed to the broker.
    #[error("code: publish_error, description: {0}")]
    Publish(String),

    /// A subscription request was rejected.
    #[error("code: subscribe_error, description: {0}")]
    Subscribe(String),

    /// The topic is not valid for the requested operation.
    #[error("code: invalid_topic, description: {0}")]
    InvalidTopic(String),

    /// A non recoverable internal error occurred.
    #[error("code: internal_error, description: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the stable error code associated with the variant.
    #[must_use]
    pub const fn code(&self) -> &str {
        match self {
            Self::Connection(_) => "connection_error",
            Self::Publish(_) => "publish_error",
            Self::Subscribe(_) => "subscribe_error",
            Self::InvalidTopic(_) => "invalid_topic",
            Self::Internal(_) => "internal_error",
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
        let chain = err.chain().map(ToString::to_string).collect::<Vec<_>>().join(" -> ");

        // if type is Error, return it with the newly added context
        if let Some(inner) = err.downcast_ref::<Self>() {
            tracing::debug!("Error: {err}, caused by: {inner}");

            return match inner {
                Self::Connection(e) => Self::Connection(format!("{err}: {e}")),
                Self::Publish(e) => Self::Publish(format!("{err}: {e}")),
                Self::Subscribe(e) => Self::Subscribe(format!("{err}: {e}")),
                Self::InvalidTopic(e) => Self::InvalidTopic(format!("{err}: {e}")),
                Self::Internal(_) => Self::Internal(chain),
            };
        }

        // otherwise, return an Internal error
        Self::Internal(chain)
    }
}

#[macro_export]
macro_rules! publish_error {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::Publish(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::Publish(format!($err))
    };
}

#[macro_export]
macro_rules! connection_error {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::Connection(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::Connection(format!($err))
    };
}
