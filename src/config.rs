use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::optimizer::PackingConfig;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub optimizer: OptimizerConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            optimizer: OptimizerConfig::from_env(),
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
    const HOST_VAR: &'static str = "LAYER_PACK_API_HOST";
    const PORT_VAR: &'static str = "LAYER_PACK_API_PORT";

    fn from_env() -> Self {
        let (bind_ip, display_host) = parse_host(env_string(Self::HOST_VAR));
        let port = parse_port(env_string(Self::PORT_VAR));
        Self {
            bind_ip,
            display_host,
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

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

fn default_ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn parse_host(raw: Option<String>) -> (IpAddr, String) {
    let host_value = raw.unwrap_or_else(|| ApiConfig::DEFAULT_HOST.to_string());
    match host_value.parse::<IpAddr>() {
        Ok(ip) => (ip, host_value),
        Err(err) => {
            log::warn!(
                "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                ApiConfig::HOST_VAR,
                host_value,
                err,
                ApiConfig::DEFAULT_HOST
            );
            (default_ip(), ApiConfig::DEFAULT_HOST.to_string())
        }
    }
}

fn parse_port(raw: Option<String>) -> u16 {
    match raw {
        Some(raw) => match raw.parse::<u16>() {
            Ok(value) if value != 0 => value,
            Ok(_) => {
                log::warn!(
                    "⚠️ {} must not be 0. Using {}.",
                    ApiConfig::PORT_VAR,
                    ApiConfig::DEFAULT_PORT
                );
                ApiConfig::DEFAULT_PORT
            }
            Err(err) => {
                log::warn!(
                    "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                    ApiConfig::PORT_VAR,
                    raw,
                    err,
                    ApiConfig::DEFAULT_PORT
                );
                ApiConfig::DEFAULT_PORT
            }
        },
        None => ApiConfig::DEFAULT_PORT,
    }
}

/// Configuration for the layer packing engine.
#[derive(Clone, Debug)]
pub struct OptimizerConfig {
    packing: PackingConfig,
}

impl OptimizerConfig {
    const ALLOW_ROTATION_VAR: &'static str = "LAYER_PACK_ALLOW_ROTATION";
    const PRESORT_VAR: &'static str = "LAYER_PACK_PRESORT";

    fn from_env() -> Self {
        let allow_rotation = load_bool(
            Self::ALLOW_ROTATION_VAR,
            PackingConfig::DEFAULT_ALLOW_ROTATION,
        );
        let presort = load_bool(Self::PRESORT_VAR, PackingConfig::DEFAULT_PRESORT);
        if !presort {
            log::info!(
                "ℹ️ Presorting disabled ({}): blocks are packed in submission order.",
                Self::PRESORT_VAR
            );
        }

        let packing = PackingConfig::builder()
            .allow_rotation(allow_rotation)
            .presort(presort)
            .build();

        Self { packing }
    }

    /// Returns the configured PackingConfig.
    pub fn packing_config(&self) -> PackingConfig {
        self.packing
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
            log::warn!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name,
                err
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
            log::warn!(
                "⚠️ Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name,
                other
            );
            None
        }
    }
}

fn load_bool(var_name: &str, default: bool) -> bool {
    env_string(var_name)
        .and_then(|raw| parse_bool(&raw, var_name))
        .unwrap_or(default)
}
