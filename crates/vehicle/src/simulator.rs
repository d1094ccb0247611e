//! # Vehicle Simulator
//!
//! Drives a simulated vehicle around its route and reports what it does.
//!
//! ```text
//! CREATED --start--> RUNNING --stop--> STOPPED --start--> RUNNING ...
//! ```
//!
//! `start` announces `VEHICLE_READY`, publishes the vehicle's position at the
//! first waypoint, announces `VEHICLE_RUNNING` and hands the vehicle state to a
//! worker task. Once per tick the worker moves the vehicle to the next
//! waypoint (looping back to the first after the last) and publishes a
//! telemetry snapshot. `stop` cancels the worker, abandoning any telemetry
//! publish still in flight, waits for it to finish and then announces
//! `VEHICLE_STOPPED`. Lifecycle announcements give up after one tick period.
//!
//! The worker is the only writer of [`VehicleState`]; transitions are
//! serialized by a single async lock that the worker never takes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use pubsub::{Message, Publisher};
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::SimConfig;
use crate::coordinate::Coordinate;
use crate::protocol::{SensorMessage, StatusMessage, StatusType};
use crate::route::Route;
use crate::telemetry::Drivetrain;
use crate::{Error, Result};

/// Shortest tick period the worker will schedule.
const MIN_TICK: Duration = Duration::from_millis(1);

/// Mutable vehicle state, written only by the tick worker.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    pub vehicle_id: String,
    pub current_waypoint_index: usize,
    pub position: Coordinate,
    pub running: bool,
    pub rpm: f64,
    pub speed_kmh: f64,
    pub gear: i32,
}

impl VehicleState {
    /// A stationary vehicle parked at the first waypoint.
    #[must_use]
    pub fn new(vehicle_id: impl Into<String>, route: &Route) -> Self {
        let idle = Drivetrain::idle();
        Self {
            vehicle_id: vehicle_id.into(),
            current_waypoint_index: 0,
            position: route.first(),
            running: false,
            rpm: idle.rpm,
            speed_kmh: idle.speed_kmh,
            gear: idle.gear,
        }
    }

    /// Move to the next waypoint and refresh the drivetrain readings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if the state does not belong to
    /// `route`.
    pub fn step(&mut self, route: &Route, period: Duration, max_speed_kmh: f64) -> Result<()> {
        let next = route.advance(self.current_waypoint_index);
        let position = route.at(next)?;
        let reading = Drivetrain::between(self.position, position, period, max_speed_kmh);

        self.current_waypoint_index = next;
        self.position = position;
        self.rpm = reading.rpm;
        self.speed_kmh = reading.speed_kmh;
        self.gear = reading.gear;
        Ok(())
    }
}

/// Lifecycle phase of a simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Running,
    Stopped,
}

/// Tick and publish counters, accumulated over the simulator's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub ticks: u64,
    pub publish_errors: u64,
}

#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    publish_errors: AtomicU64,
}

struct Inner {
    phase: Phase,
    worker: Option<Worker>,
    state: watch::Receiver<VehicleState>,
}

struct Worker {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<VehicleState>,
}

/// A single simulated vehicle publishing through `P`.
pub struct VehicleSimulator<P: Publisher + 'static> {
    vehicle_id: String,
    route: Arc<Route>,
    config: SimConfig,
    telemetry_topic: String,
    publisher: Arc<P>,
    counters: Arc<Counters>,
    inner: Mutex<Inner>,
}

impl<P: Publisher + 'static> VehicleSimulator<P> {
    /// Create a simulator for `vehicle_id` patrolling `waypoints`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRoute`] when `waypoints` is empty and
    /// [`Error::InvalidVehicleId`] when the identifier is empty or contains a
    /// topic separator or wildcard.
    pub fn new(
        vehicle_id: impl Into<String>, waypoints: Vec<Coordinate>, publisher: Arc<P>,
        config: SimConfig,
    ) -> Result<Self> {
        let vehicle_id = vehicle_id.into();
        validate_vehicle_id(&vehicle_id)?;
        let route = Route::new(waypoints)?;

        let (_, state) = watch::channel(VehicleState::new(&vehicle_id, &route));
        let telemetry_topic = config.telemetry_topic(&vehicle_id);

        debug!(vehicle_id = %vehicle_id, waypoints = route.len(), "vehicle created");

        Ok(Self {
            vehicle_id,
            route: Arc::new(route),
            config,
            telemetry_topic,
            publisher,
            counters: Arc::new(Counters::default()),
            inner: Mutex::new(Inner { phase: Phase::Created, worker: None, state }),
        })
    }

    #[must_use]
    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    #[must_use]
    pub fn route(&self) -> &Route {
        &self.route
    }

    pub async fn phase(&self) -> Phase {
        self.inner.lock().await.phase
    }

    /// The most recent vehicle state. Retained after `stop`.
    pub async fn snapshot(&self) -> VehicleState {
        self.inner.lock().await.state.borrow().clone()
    }

    #[must_use]
    pub fn stats(&self) -> TickStats {
        TickStats {
            ticks: self.counters.ticks.load(Ordering::Relaxed),
            publish_errors: self.counters.publish_errors.load(Ordering::Relaxed),
        }
    }

    /// Announce the vehicle, publish its starting position and begin ticking.
    ///
    /// Each run starts from the first waypoint. Failed announcements are
    /// logged and do not prevent the transition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRunning`] if the simulator is running.
    pub async fn start(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.phase == Phase::Running {
            return Err(Error::AlreadyRunning);
        }

        let mut state = VehicleState::new(&self.vehicle_id, &self.route);
        state.running = true;

        self.announce(StatusType::VehicleReady, "Vehicle is ready to start.").await;
        let initial = SensorMessage::from_state(&state, StatusType::VehicleReady).to_message();
        self.publish(&self.telemetry_topic, initial).await;
        self.announce(StatusType::VehicleRunning, "Vehicle is running.").await;

        let (state_tx, state_rx) = watch::channel(state.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let ticker = Ticker {
            route: Arc::clone(&self.route),
            period: self.config.tick_interval.max(MIN_TICK),
            max_speed_kmh: self.config.max_speed_kmh,
            topic: self.telemetry_topic.clone(),
            publisher: Arc::clone(&self.publisher),
            counters: Arc::clone(&self.counters),
        };
        let handle = tokio::spawn(ticker.run(state, state_tx, shutdown_rx));

        inner.state = state_rx;
        inner.worker = Some(Worker { shutdown: shutdown_tx, handle });
        inner.phase = Phase::Running;

        info!(vehicle_id = %self.vehicle_id, topic = %self.telemetry_topic, "vehicle started");
        Ok(())
    }

    /// Halt the tick worker, then announce `VEHICLE_STOPPED`.
    ///
    /// No tick fires once this returns. A stalled telemetry publish does not
    /// hold up the stop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRunning`] if the simulator is not running.
    pub async fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.phase != Phase::Running {
            return Err(Error::NotRunning);
        }
        let Some(worker) = inner.worker.take() else {
            return Err(Error::NotRunning);
        };

        if worker.shutdown.send(()).is_err() {
            debug!(vehicle_id = %self.vehicle_id, "tick worker already finished");
        }
        let last = match worker.handle.await {
            Ok(state) => state,
            Err(e) => {
                error!(vehicle_id = %self.vehicle_id, error = %e, "tick worker failed");
                let mut state = inner.state.borrow().clone();
                state.running = false;
                state
            }
        };
        let (_, state) = watch::channel(last);
        inner.state = state;

        self.announce(StatusType::VehicleStopped, "Vehicle has stopped.").await;
        inner.phase = Phase::Stopped;

        info!(vehicle_id = %self.vehicle_id, "vehicle stopped");
        Ok(())
    }

    /// Start, wait for `shutdown` to resolve, then stop.
    ///
    /// # Errors
    ///
    /// Returns the error of the failing transition.
    pub async fn run_until<F: Future>(&self, shutdown: F) -> Result<()> {
        self.start().await?;
        shutdown.await;
        debug!(vehicle_id = %self.vehicle_id, "shutdown requested");
        self.stop().await
    }

    async fn announce(&self, status: StatusType, text: &str) {
        let message = StatusMessage::new(&self.vehicle_id, status, text).to_message();
        self.publish(self.config.status_topic(), message).await;
    }

    /// Publish a lifecycle message, giving up after one tick period.
    async fn publish(&self, topic: &str, message: Result<Message>) {
        let period = self.config.tick_interval.max(MIN_TICK);
        let sent = publish(self.publisher.as_ref(), topic, message, &self.counters);
        if time::timeout(period, sent).await.is_err() {
            self.counters.publish_errors.fetch_add(1, Ordering::Relaxed);
            warn!(monotonic_counter.publish_errors = 1, topic = %topic, "publish timed out");
        }
    }
}

/// Everything the tick worker needs, moved into its task.
struct Ticker<P: Publisher> {
    route: Arc<Route>,
    period: Duration,
    max_speed_kmh: f64,
    topic: String,
    publisher: Arc<P>,
    counters: Arc<Counters>,
}

impl<P: Publisher> Ticker<P> {
    async fn run(
        self, mut state: VehicleState, state_tx: watch::Sender<VehicleState>,
        mut shutdown: oneshot::Receiver<()>,
    ) -> VehicleState {
        let mut interval = time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = interval.tick() => {}
            }

            let Some(message) = self.tick(&mut state, &state_tx) else {
                continue;
            };
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    debug!(vehicle_id = %state.vehicle_id, "abandoned in-flight telemetry publish");
                    break;
                }
                () = publish(self.publisher.as_ref(), &self.topic, message, &self.counters) => {}
            }
        }

        state.running = false;
        state_tx.send_replace(state.clone());
        state
    }

    /// Advance the vehicle and build its telemetry message.
    fn tick(
        &self, state: &mut VehicleState, state_tx: &watch::Sender<VehicleState>,
    ) -> Option<Result<Message>> {
        if let Err(e) = state.step(&self.route, self.period, self.max_speed_kmh) {
            error!(vehicle_id = %state.vehicle_id, error = %e, "failed to advance vehicle");
            return None;
        }
        state_tx.send_replace(state.clone());
        self.counters.ticks.fetch_add(1, Ordering::Relaxed);

        debug!(
            monotonic_counter.ticks = 1,
            vehicle_id = %state.vehicle_id,
            waypoint = state.current_waypoint_index,
            position = %state.position,
            "tick"
        );

        Some(SensorMessage::from_state(state, StatusType::VehicleRunning).to_message())
    }
}

async fn publish<P: Publisher>(
    publisher: &P, topic: &str, message: Result<Message>, counters: &Counters,
) {
    let result = match message {
        Ok(message) => publisher.send(topic, &message).await.map_err(Error::from),
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        counters.publish_errors.fetch_add(1, Ordering::Relaxed);
        warn!(monotonic_counter.publish_errors = 1, topic = %topic, error = %e, "publish failed");
    }
}

fn validate_vehicle_id(vehicle_id: &str) -> Result<()> {
    if vehicle_id.trim().is_empty() {
        return Err(Error::InvalidVehicleId("vehicle id is empty".to_string()));
    }
    if vehicle_id.contains(['/', '+', '#']) {
        return Err(Error::InvalidVehicleId(format!(
            "{vehicle_id:?} contains a topic separator or wildcard"
        )));
    }
    Ok(())
}
