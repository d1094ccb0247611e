use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_VEHICLE_ID: &str = "postauto";
const DEFAULT_ROUTE_FILE: &str = "./waypoints/karlsruhe.itn";
const DEFAULT_MQTT_HOST: &str = "localhost";

/// Driver settings, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub vehicle_id: String,
    pub route_file: PathBuf,
    pub mqtt: MqttConfig,
}

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let vehicle_id = env_string("VEHICLE_ID", DEFAULT_VEHICLE_ID);
        let route_file = PathBuf::from(env_string("ROUTE_FILE", DEFAULT_ROUTE_FILE));

        let client_id = env_string("MQTT_CLIENT_ID", &format!("vehicle-sim-{vehicle_id}"));
        let mqtt = MqttConfig {
            host: env_string("MQTT_HOST", DEFAULT_MQTT_HOST),
            port: env_u16("MQTT_PORT", 1883),
            client_id,
            keep_alive: Duration::from_secs(env_u64("MQTT_KEEP_ALIVE_SECS", 30)),
        };

        Self { vehicle_id, route_file, mqtt }
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| {
            tracing::trace!("{key} not set, using default: {default}");
            default.to_string()
        })
}

fn env_u16(key: &str, default: u16) -> u16 {
    env::var(key).ok().and_then(|value| value.parse::<u16>().ok()).unwrap_or_else(|| {
        tracing::trace!("{key} not set, using default: {default}");
        default
    })
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|value| value.parse::<u64>().ok()).unwrap_or_else(|| {
        tracing::trace!("{key} not set, using default: {default}");
        default
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults() {
        // none of the driver variables are set under test
        let config = Config::from_env();

        assert_eq!(
            config,
            Config {
                vehicle_id: "postauto".to_string(),
                route_file: PathBuf::from("./waypoints/karlsruhe.itn"),
                mqtt: MqttConfig {
                    host: "localhost".to_string(),
                    port: 1883,
                    client_id: "vehicle-sim-postauto".to_string(),
                    keep_alive: Duration::from_secs(30),
                },
            }
        );
    }
}
