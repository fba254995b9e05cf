use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tracing::{info, warn};

use crate::geometry::Dimensions;
use crate::model::ContainerSpec;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub planner: PlannerConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(&env_string)
    }

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        Self {
            api: ApiConfig::from_lookup(lookup),
            planner: PlannerConfig::from_lookup(lookup),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
    serve_ui: bool,
}

impl ApiConfig {
    const HOST_VAR: &'static str = "CONTAINER_PLANNER_API_HOST";
    const PORT_VAR: &'static str = "CONTAINER_PLANNER_API_PORT";
    const SERVE_UI_VAR: &'static str = "CONTAINER_PLANNER_SERVE_UI";

    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const DEFAULT_SERVE_UI: bool = true;

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let host_value = lookup(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match lookup(Self::PORT_VAR) {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        "{} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "Could not parse {} ('{}'): {}. Using {}.",
                        Self::PORT_VAR,
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        let serve_ui = lookup(Self::SERVE_UI_VAR)
            .and_then(|raw| parse_bool(&raw, Self::SERVE_UI_VAR))
            .unwrap_or(Self::DEFAULT_SERVE_UI);

        Self {
            bind_ip,
            display_host: effective_host,
            port,
            serve_ui,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether the embedded web form is mounted at `/`.
    pub fn serve_ui(&self) -> bool {
        self.serve_ui
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Request limits and the fallback container used when a request names none.
#[derive(Clone, Debug)]
pub struct PlannerConfig {
    default_container: ContainerSpec,
    max_items: usize,
}

impl PlannerConfig {
    const LENGTH_VAR: &'static str = "CONTAINER_PLANNER_DEFAULT_LENGTH";
    const WIDTH_VAR: &'static str = "CONTAINER_PLANNER_DEFAULT_WIDTH";
    const HEIGHT_VAR: &'static str = "CONTAINER_PLANNER_DEFAULT_HEIGHT";
    const MAX_WEIGHT_VAR: &'static str = "CONTAINER_PLANNER_DEFAULT_MAX_WEIGHT";
    const MAX_ITEMS_VAR: &'static str = "CONTAINER_PLANNER_MAX_ITEMS";

    pub const DEFAULT_LENGTH: f64 = 10.0;
    pub const DEFAULT_WIDTH: f64 = 10.0;
    pub const DEFAULT_HEIGHT: f64 = 10.0;
    pub const DEFAULT_MAX_WEIGHT: f64 = 100.0;
    pub const DEFAULT_MAX_ITEMS: usize = 10_000;

    pub fn new(default_container: ContainerSpec, max_items: usize) -> Self {
        Self {
            default_container,
            max_items,
        }
    }

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let positive = |value: f64| value > 0.0 && value.is_finite();

        let length = load_f64(lookup, Self::LENGTH_VAR, Self::DEFAULT_LENGTH, positive);
        let width = load_f64(lookup, Self::WIDTH_VAR, Self::DEFAULT_WIDTH, positive);
        let height = load_f64(lookup, Self::HEIGHT_VAR, Self::DEFAULT_HEIGHT, positive);
        let max_weight = load_f64(
            lookup,
            Self::MAX_WEIGHT_VAR,
            Self::DEFAULT_MAX_WEIGHT,
            positive,
        );

        let max_items = match lookup(Self::MAX_ITEMS_VAR) {
            Some(raw) => match raw.parse::<usize>() {
                Ok(value) if value > 0 => value,
                Ok(_) => {
                    warn!(
                        "{} must be greater than 0. Using {}.",
                        Self::MAX_ITEMS_VAR,
                        Self::DEFAULT_MAX_ITEMS
                    );
                    Self::DEFAULT_MAX_ITEMS
                }
                Err(err) => {
                    warn!(
                        "Could not parse {} ('{}'): {}. Using {}.",
                        Self::MAX_ITEMS_VAR,
                        raw,
                        err,
                        Self::DEFAULT_MAX_ITEMS
                    );
                    Self::DEFAULT_MAX_ITEMS
                }
            },
            None => Self::DEFAULT_MAX_ITEMS,
        };

        // Each value was range-checked above, so the spec needs no re-validation.
        let default_container = ContainerSpec {
            dims: Dimensions::new(length, width, height),
            max_weight,
        };

        Self {
            default_container,
            max_items,
        }
    }

    /// Container used when a pack request does not provide one.
    pub fn default_container(&self) -> ContainerSpec {
        self.default_container
    }

    /// Maximum number of items accepted in one request.
    pub fn max_items(&self) -> usize {
        self.max_items
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self::new(
            ContainerSpec {
                dims: Dimensions::new(
                    Self::DEFAULT_LENGTH,
                    Self::DEFAULT_WIDTH,
                    Self::DEFAULT_HEIGHT,
                ),
                max_weight: Self::DEFAULT_MAX_WEIGHT,
            },
            Self::DEFAULT_MAX_ITEMS,
        )
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            warn!(
                "Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn load_f64(
    lookup: &dyn Fn(&str) -> Option<String>,
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
) -> f64 {
    match lookup(var_name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) if validator(value) => {
                if value != default {
                    info!("{} overrides default {} with {}", var_name, default, value);
                }
                value
            }
            Ok(_) => {
                warn!(
                    "{} contains invalid value '{}': must be positive and finite. Using {}.",
                    var_name, raw, default
                );
                default
            }
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_parse_bool_true_values() {
        assert_eq!(parse_bool("1", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("true", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("yes", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("ON", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("  1  ", "TEST_VAR"), Some(true));
    }

    #[test]
    fn test_parse_bool_false_values() {
        assert_eq!(parse_bool("0", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("false", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("No", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool(" off ", "TEST_VAR"), Some(false));
    }

    #[test]
    fn test_parse_bool_invalid_values() {
        assert_eq!(parse_bool("invalid", "TEST_VAR"), None);
        assert_eq!(parse_bool("2", "TEST_VAR"), None);
        assert_eq!(parse_bool("", "TEST_VAR"), None);
    }

    #[test]
    fn defaults_apply_without_variables() {
        let config = AppConfig::from_lookup(&lookup_from(&[]));
        assert_eq!(config.api.port(), 8080);
        assert_eq!(config.api.display_host(), "0.0.0.0");
        assert!(config.api.binds_to_all_interfaces());
        assert!(config.api.serve_ui());

        let container = config.planner.default_container();
        assert_eq!(container.dims, Dimensions::new(10.0, 10.0, 10.0));
        assert_eq!(container.max_weight, 100.0);
        assert_eq!(config.planner.max_items(), 10_000);
    }

    #[test]
    fn variables_override_defaults() {
        let config = AppConfig::from_lookup(&lookup_from(&[
            ("CONTAINER_PLANNER_API_HOST", "127.0.0.1"),
            ("CONTAINER_PLANNER_API_PORT", "9000"),
            ("CONTAINER_PLANNER_SERVE_UI", "off"),
            ("CONTAINER_PLANNER_DEFAULT_LENGTH", "12.5"),
            ("CONTAINER_PLANNER_DEFAULT_MAX_WEIGHT", "250"),
            ("CONTAINER_PLANNER_MAX_ITEMS", "50"),
        ]));
        assert_eq!(config.api.socket_addr(), "127.0.0.1:9000".parse().unwrap());
        assert!(!config.api.binds_to_all_interfaces());
        assert!(!config.api.serve_ui());

        let container = config.planner.default_container();
        assert_eq!(container.dims, Dimensions::new(12.5, 10.0, 10.0));
        assert_eq!(container.max_weight, 250.0);
        assert_eq!(config.planner.max_items(), 50);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(&lookup_from(&[
            ("CONTAINER_PLANNER_API_HOST", "not-an-ip"),
            ("CONTAINER_PLANNER_API_PORT", "0"),
            ("CONTAINER_PLANNER_DEFAULT_WIDTH", "-3"),
            ("CONTAINER_PLANNER_DEFAULT_HEIGHT", "tall"),
            ("CONTAINER_PLANNER_DEFAULT_MAX_WEIGHT", "inf"),
            ("CONTAINER_PLANNER_MAX_ITEMS", "0"),
        ]));
        assert_eq!(config.api.display_host(), "0.0.0.0");
        assert_eq!(config.api.port(), 8080);

        let container = config.planner.default_container();
        assert_eq!(container.dims, Dimensions::new(10.0, 10.0, 10.0));
        assert_eq!(container.max_weight, 100.0);
        assert_eq!(config.planner.max_items(), 10_000);
    }
}
