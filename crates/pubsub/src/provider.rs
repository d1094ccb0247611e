//! # Provider
//!
//! Provider defines the messaging interfaces a transport offers to the
//! simulator.

use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Header naming the payload encoding.
pub const CONTENT_TYPE: &str = "content-type";

/// Delivery guarantee requested for a message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QoS {
    /// Fire and forget.
    AtMostOnce,

    /// Delivered at least once, possibly duplicated.
    #[default]
    AtLeastOnce,

    /// Delivered exactly once.
    ExactlyOnce,
}

impl From<QoS> for u8 {
    fn from(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        }
    }
}

/// Message represents a message to be published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub payload: Vec<u8>,
    pub headers: HashMap<String, String>,
    pub qos: QoS,
}

impl Message {
    #[must_use]
    pub fn new(payload: &[u8]) -> Self {
        Self { payload: payload.to_vec(), headers: HashMap::new(), qos: QoS::default() }
    }

    /// Set a header on the message.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the delivery guarantee for the message.
    #[must_use]
    pub const fn qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }
}

/// A message the broker publishes on the client's behalf when the
/// connection drops without a clean disconnect.
///
/// Must be handed to the transport before it connects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LastWill {
    pub topic: String,
    pub message: Message,
    pub retain: bool,
}

/// The `Publisher` trait defines the message publishing behavior.
///
/// Implementations must tolerate concurrent calls from several emitters.
pub trait Publisher: Send + Sync {
    /// Publish a message to the topic.
    fn send(&self, topic: &str, message: &Message) -> impl Future<Output = Result<()>> + Send;
}

/// The `Subscriber` trait defines the topic subscription behavior.
pub trait Subscriber: Send + Sync {
    /// Subscribe to the topic.
    fn subscribe(&self, topic: &str, qos: QoS) -> impl Future<Output = Result<()>> + Send;
}

/// An established broker connection.
pub trait Connection: Publisher + Subscriber {
    /// Close the connection cleanly. The broker discards any registered last will.
    fn disconnect(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Returns `true` when the topic can be used as a publish target: non-empty
/// and free of the `+` and `#` wildcards.
#[must_use]
pub fn is_publish_topic(topic: &str) -> bool {
    !topic.is_empty() && !topic.contains(['+', '#'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_builder() {
        let message =
            Message::new(b"{}").header(CONTENT_TYPE, "application/json").qos(QoS::ExactlyOnce);

        assert_eq!(message.payload, b"{}".to_vec());
        assert_eq!(message.headers.get(CONTENT_TYPE).map(String::as_str), Some("application/json"));
        assert_eq!(u8::from(message.qos), 2);
    }

    #[test]
    fn publish_topics() {
        assert!(is_publish_topic("vehicles"));
        assert!(is_publish_topic("vehicles/postauto"));
        assert!(!is_publish_topic(""));
        assert!(!is_publish_topic("vehicles/+"));
        assert!(!is_publish_topic("vehicles/#"));
    }
}
