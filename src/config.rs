use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use log::warn;

use crate::packer::PackingConfig;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            engine: EngineConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "FREIGHT_PACKER_API_HOST";
    const PORT_VAR: &'static str = "FREIGHT_PACKER_API_PORT";

    fn from_env() -> Self {
        let host_value =
            env_string(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "⚠️ Could not parse {} ('{}'): {}. Using {}.",
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

        let port = match env_string(Self::PORT_VAR) {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        "⚠️ {} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "⚠️ Could not parse {} ('{}'): {}. Using {}.",
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

        Self {
            bind_ip,
            display_host: effective_host,
            port,
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

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Engine defaults applied to every request unless the request overrides them.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    packing: PackingConfig,
}

impl EngineConfig {
    const PADDING_VAR: &'static str = "FREIGHT_PACKER_PADDING";
    const SPACING_VAR: &'static str = "FREIGHT_PACKER_SPACING";
    const INEFFICIENCY_VAR: &'static str = "FREIGHT_PACKER_INEFFICIENCY_FACTOR";
    const GRANULARITY_VAR: &'static str = "FREIGHT_PACKER_GRANULARITY";
    const WEIGHT_DISTRIBUTION_VAR: &'static str = "FREIGHT_PACKER_WEIGHT_DISTRIBUTION";
    const PARALLEL_THRESHOLD_VAR: &'static str = "FREIGHT_PACKER_PARALLEL_THRESHOLD";
    const TIME_BUDGET_VAR: &'static str = "FREIGHT_PACKER_TIME_BUDGET_MS";
    const SIZING_ATTEMPTS_VAR: &'static str = "FREIGHT_PACKER_MAX_SIZING_ATTEMPTS";

    fn from_env() -> Self {
        let padding = load_f64_with_warning(
            Self::PADDING_VAR,
            PackingConfig::DEFAULT_PADDING,
            |value| value >= 0.0,
            "must not be negative",
            "Adjusted wall padding changes the usable box interior",
        );

        let spacing = load_f64_with_warning(
            Self::SPACING_VAR,
            PackingConfig::DEFAULT_SPACING,
            |value| value >= 0.0,
            "must not be negative",
            "Adjusted part spacing changes how densely parts are packed",
        );

        let inefficiency_factor = load_f64_with_warning(
            Self::INEFFICIENCY_VAR,
            PackingConfig::DEFAULT_INEFFICIENCY_FACTOR,
            |value| value > 0.0,
            "must be greater than 0",
            "Adjusted inefficiency factor changes estimated box sizes",
        );

        let granularity = load_f64_with_warning(
            Self::GRANULARITY_VAR,
            PackingConfig::DEFAULT_GRANULARITY,
            |value| value > 0.0,
            "must be greater than 0",
            "Adjusted granularity changes how estimated boxes are rounded",
        );

        let weight_distribution = env_string(Self::WEIGHT_DISTRIBUTION_VAR)
            .and_then(|raw| parse_bool(&raw, Self::WEIGHT_DISTRIBUTION_VAR))
            .unwrap_or(false);

        let parallel_threshold = load_usize(
            Self::PARALLEL_THRESHOLD_VAR,
            PackingConfig::DEFAULT_PARALLEL_THRESHOLD,
        );

        let max_sizing_attempts = match load_usize(
            Self::SIZING_ATTEMPTS_VAR,
            PackingConfig::DEFAULT_MAX_SIZING_ATTEMPTS,
        ) {
            0 => {
                warn!(
                    "⚠️ {} must be at least 1. Using {}.",
                    Self::SIZING_ATTEMPTS_VAR,
                    PackingConfig::DEFAULT_MAX_SIZING_ATTEMPTS
                );
                PackingConfig::DEFAULT_MAX_SIZING_ATTEMPTS
            }
            value => value,
        };

        let mut builder = PackingConfig::builder()
            .padding(padding)
            .spacing(spacing)
            .inefficiency_factor(inefficiency_factor)
            .granularity(granularity)
            .weight_distribution(weight_distribution)
            .parallel_threshold(parallel_threshold)
            .max_sizing_attempts(max_sizing_attempts);

        if let Some(budget) = load_millis(Self::TIME_BUDGET_VAR) {
            builder = builder.time_budget(budget);
        }

        Self {
            packing: builder.build(),
        }
    }

    /// Returns the configured PackingConfig.
    pub fn packing_config(&self) -> PackingConfig {
        self.packing
    }
}

impl From<PackingConfig> for EngineConfig {
    fn from(packing: PackingConfig) -> Self {
        Self { packing }
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
            warn!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name, err
            );
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
                "⚠️ Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn load_usize(var_name: &str, default: usize) -> usize {
    match env_string(var_name) {
        Some(raw) => raw.parse::<usize>().unwrap_or_else(|err| {
            warn!(
                "⚠️ Could not parse {} ('{}') as count: {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }),
        None => default,
    }
}

fn load_millis(var_name: &str) -> Option<Duration> {
    let raw = env_string(var_name)?;
    match raw.parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(err) => {
            warn!(
                "⚠️ Could not parse {} ('{}') as milliseconds: {}. Running without a time budget.",
                var_name, raw, err
            );
            None
        }
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) => {
                if !value.is_finite() || !validator(value) {
                    warn!(
                        "⚠️ {} contains invalid value '{}': {}. Using {}.",
                        var_name, raw, invalid_hint, default
                    );
                    default
                } else {
                    let tolerance = (default.abs().max(1.0)) * 1e-9;
                    if (value - default).abs() > tolerance {
                        warn!("⚠️ {} ({} = {}).", warning, var_name, value);
                    }
                    value
                }
            }
            Err(err) => {
                warn!(
                    "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
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

    #[test]
    fn test_parse_bool_true_values() {
        assert_eq!(parse_bool("1", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("true", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("yes", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("on", "TEST_VAR"), Some(true));

        assert_eq!(parse_bool("TRUE", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool(" Yes ", "TEST_VAR"), Some(true));
    }

    #[test]
    fn test_parse_bool_false_values() {
        assert_eq!(parse_bool("0", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("false", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("no", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("off", "TEST_VAR"), Some(false));

        assert_eq!(parse_bool("OFF", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("  0  ", "TEST_VAR"), Some(false));
    }

    #[test]
    fn test_parse_bool_invalid_values() {
        assert_eq!(parse_bool("invalid", "TEST_VAR"), None);
        assert_eq!(parse_bool("2", "TEST_VAR"), None);
        assert_eq!(parse_bool("", "TEST_VAR"), None);
    }

    #[test]
    fn test_missing_variables_fall_back_to_defaults() {
        let var = "FREIGHT_PACKER_TEST_UNSET_VARIABLE";
        assert_eq!(load_usize(var, 7), 7);
        assert_eq!(load_millis(var), None);
        assert_eq!(load_f64_with_warning(var, 2.5, |v| v > 0.0, "", ""), 2.5);
    }

    #[test]
    fn test_engine_config_from_packing_config() {
        let packing = PackingConfig::builder().padding(0.5).build();
        let engine = EngineConfig::from(packing);
        assert_eq!(engine.packing_config().padding, 0.5);
        assert!(engine.packing_config().validate().is_ok());
    }
}
