//! # MQTT Provider
//!
//! [`Connection`] backed by an MQTT 3.1.1 broker.
//!
//! The last will is registered with the broker as part of the CONNECT
//! packet, so it must be supplied to [`MqttProvider::connect`]. Once the
//! broker acknowledges the connection the event loop is driven by a
//! background task until [`Connection::disconnect`] is called.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use pubsub::{Connection, LastWill, Message, Publisher, QoS, Subscriber};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, trace, warn};

use crate::config::MqttConfig;

const REQUEST_CAPACITY: usize = 64;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

pub struct MqttProvider {
    client: AsyncClient,
    closing: Arc<AtomicBool>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl MqttProvider {
    /// Connect to the broker, registering `will` to be published should the
    /// connection drop without a clean disconnect.
    ///
    /// # Errors
    ///
    /// Returns [`pubsub::Error::Connection`] when the broker cannot be reached,
    /// refuses the connection or does not answer in time.
    pub async fn connect(config: &MqttConfig, will: LastWill) -> Result<Self> {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(config.keep_alive);
        options.set_last_will(rumqttc::LastWill::new(
            will.topic,
            will.message.payload,
            mqtt_qos(will.message.qos),
            will.retain,
        ));

        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let address = format!("{}:{}", config.host, config.port);

        time::timeout(CONNECT_TIMEOUT, connack(&mut eventloop))
            .await
            .map_err(|e| pubsub::connection_error!("connecting to {}: {}", address, e))?
            .map_err(|e| pubsub::connection_error!("connecting to {}: {}", address, e))?;

        info!(broker = %address, client_id = %config.client_id, "connected to broker");

        let closing = Arc::new(AtomicBool::new(false));
        let poller = tokio::spawn(poll(eventloop, Arc::clone(&closing)));

        Ok(Self { client, closing, poller: Mutex::new(Some(poller)) })
    }
}

impl Publisher for MqttProvider {
    async fn send(&self, topic: &str, message: &Message) -> Result<()> {
        if !pubsub::is_publish_topic(topic) {
            return Err(pubsub::Error::InvalidTopic(topic.to_string()).into());
        }
        if !message.headers.is_empty() {
            trace!(topic = %topic, "headers are not carried over MQTT 3.1.1");
        }

        self.client
            .publish(topic, mqtt_qos(message.qos), false, message.payload.clone())
            .await
            .map_err(|e| pubsub::publish_error!("publishing to {}: {}", topic, e))?;
        Ok(())
    }
}

impl Subscriber for MqttProvider {
    async fn subscribe(&self, topic: &str, qos: QoS) -> Result<()> {
        self.client
            .subscribe(topic, mqtt_qos(qos))
            .await
            .map_err(|e| pubsub::Error::Subscribe(format!("subscribing to {topic}: {e}")))?;
        debug!(topic = %topic, "subscribed");
        Ok(())
    }
}

impl Connection for MqttProvider {
    async fn disconnect(&self) -> Result<()> {
        self.closing.store(true, Ordering::SeqCst);
        self.client
            .disconnect()
            .await
            .map_err(|e| pubsub::connection_error!("disconnecting: {}", e))?;

        let Some(poller) = self.poller.lock().await.take() else {
            return Ok(());
        };
        let abort = poller.abort_handle();
        if time::timeout(DISCONNECT_TIMEOUT, poller).await.is_err() {
            warn!("event loop did not finish after disconnect");
            abort.abort();
        }

        info!("disconnected from broker");
        Ok(())
    }
}

/// Drive the event loop until the broker acknowledges the connection.
async fn connack(eventloop: &mut EventLoop) -> Result<()> {
    loop {
        match eventloop.poll().await? {
            Event::Incoming(Packet::ConnAck(ack)) if ack.code == ConnectReturnCode::Success => {
                return Ok(());
            }
            Event::Incoming(Packet::ConnAck(ack)) => {
                return Err(anyhow::anyhow!("refused: {:?}", ack.code));
            }
            event => trace!(?event, "waiting for connack"),
        }
    }
}

async fn poll(mut eventloop: EventLoop, closing: Arc<AtomicBool>) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                debug!(topic = %publish.topic, bytes = publish.payload.len(), "message received");
            }
            Ok(Event::Incoming(Packet::ConnAck(_))) => info!("reconnected to broker"),
            Ok(Event::Outgoing(Outgoing::Disconnect)) => debug!("disconnect sent"),
            Ok(event) => trace!(?event, "mqtt event"),
            Err(e) => {
                if closing.load(Ordering::SeqCst) {
                    debug!("event loop closed");
                    break;
                }
                warn!(monotonic_counter.connection_errors = 1, error = %e, "connection error");
                time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

const fn mqtt_qos(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qos_levels() {
        for level in [QoS::AtMostOnce, QoS::AtLeastOnce, QoS::ExactlyOnce] {
            assert_eq!(mqtt_qos(level) as u8, u8::from(level));
        }
    }
}
