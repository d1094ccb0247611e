use std::env;
use std::time::Duration;

/// Simulator settings, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub topic_root: String,
    pub tick_interval: Duration,
    pub max_speed_kmh: f64,
}

impl SimConfig {
    /// Defaults overridden by `VEHICLE_TOPIC_ROOT`, `TICK_INTERVAL_MS` and
    /// `MAX_SPEED_KMH`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let topic_root = env::var("VEHICLE_TOPIC_ROOT")
            .ok()
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| {
                tracing::trace!("VEHICLE_TOPIC_ROOT not set, using default: {DEFAULT_TOPIC_ROOT}");
                defaults.topic_root
            });
        let tick_ms = env_u64("TICK_INTERVAL_MS", DEFAULT_TICK_MS).max(1);
        let max_speed_kmh = env_f64("MAX_SPEED_KMH", defaults.max_speed_kmh);

        Self { topic_root, tick_interval: Duration::from_millis(tick_ms), max_speed_kmh }
    }

    /// Lifecycle topic shared by all vehicles.
    pub fn status_topic(&self) -> &str {
        &self.topic_root
    }

    /// Per-vehicle telemetry topic.
    pub fn telemetry_topic(&self, vehicle_id: &str) -> String {
        format!("{}/{vehicle_id}", self.topic_root)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            topic_root: DEFAULT_TOPIC_ROOT.to_string(),
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
            max_speed_kmh: DEFAULT_MAX_SPEED_KMH,
        }
    }
}

const DEFAULT_TOPIC_ROOT: &str = "vehicles";
const DEFAULT_TICK_MS: u64 = 1_000;
const DEFAULT_MAX_SPEED_KMH: f64 = 130.0;

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|value| value.parse::<u64>().ok()).unwrap_or_else(|| {
        tracing::trace!("{key} not set, using default: {default}");
        default
    })
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|value| value.parse::<f64>().ok()).unwrap_or_else(|| {
        tracing::trace!("{key} not set, using default: {default}");
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics() {
        let config = SimConfig {
            topic_root: "vehicles".to_string(),
            tick_interval: Duration::from_secs(1),
            max_speed_kmh: 130.0,
        };

        assert_eq!(config.status_topic(), "vehicles");
        assert_eq!(config.telemetry_topic("postauto"), "vehicles/postauto");
    }

    #[test]
    fn literal_defaults() {
        let config = SimConfig::default();

        assert_eq!(config.topic_root, "vehicles");
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert!((config.max_speed_kmh - 130.0).abs() < f64::EPSILON);
    }

    #[test]
    fn defaults() {
        // none of the simulator variables are set under test
        let config = SimConfig::from_env();

        assert_eq!(config.topic_root, "vehicles");
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert!((config.max_speed_kmh - 130.0).abs() < f64::EPSILON);
    }
}
