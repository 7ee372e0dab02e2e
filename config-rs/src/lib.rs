//! config-rs/lib.rs
//! Shared configuration utilities for the prompt service workspace
//! Provides the configuration provider abstraction plus port/address resolution

use std::env;
use std::net::SocketAddr;

pub mod provider;

pub use provider::{
    ConfigError, ConfigProvider, ConfigProviderExt, EnvConfigProvider, MemoryConfigProvider,
};

/// Fallback port variable honoured by every service (PaaS convention)
const GENERIC_PORT_VAR: &str = "PORT";

/// Load an optional `.env` file from the working directory.
///
/// Returns `true` when a file was found. Missing files are not an error: production
/// deployments inject the environment directly.
pub fn load_dotenv() -> bool {
    match dotenv::dotenv() {
        Ok(path) => {
            log::debug!("Loaded environment from {}", path.display());
            true
        }
        Err(_) => false,
    }
}

/// Get service port from environment variables with proper fallback
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "PROMPT")
/// * `default_port` - The default port to use if not specified in environment
///
/// # Returns
/// The port number to use for the service. `{SERVICE}_SERVICE_PORT` wins over `PORT`.
pub fn get_service_port(service_name: &str, default_port: u16) -> u16 {
    let var_name = format!("{}_SERVICE_PORT", service_name.to_uppercase());
    let raw = env::var(&var_name).or_else(|_| env::var(GENERIC_PORT_VAR));

    match raw {
        Ok(value) => value.trim().parse::<u16>().unwrap_or_else(|_| {
            log::warn!("Invalid port '{}' in {}, using default {}", value, var_name, default_port);
            default_port
        }),
        Err(_) => default_port,
    }
}

/// Create a SocketAddr for binding a service
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "PROMPT")
/// * `default_port` - The default port to use if not specified in environment
///
/// # Returns
/// A SocketAddr configured with the appropriate bind address and port
pub fn get_bind_address(service_name: &str, default_port: u16) -> SocketAddr {
    let var_name = format!("{}_SERVICE_ADDR", service_name.to_uppercase());

    // Check if there's a full address override
    if let Ok(addr_str) = env::var(&var_name) {
        let trimmed = addr_str
            .trim_start_matches("http://")
            .trim_start_matches("https://");
        if let Ok(addr) = trimmed.parse::<SocketAddr>() {
            return addr;
        }
        log::warn!("Invalid address format in {}, using default", var_name);
    }

    let port = get_service_port(service_name, default_port);
    SocketAddr::from(([0, 0, 0, 0], port))
}

/// Get service name for logging and monitoring
pub fn get_formatted_service_name(service_name: &str) -> String {
    match service_name.to_uppercase().as_str() {
        "PROMPT" => "prompt-service".to_string(),
        other => format!("{}-service", other.to_lowercase().replace('_', "-")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_service_port() {
        // Test with environment variable
        std::env::set_var("CFGTEST_SERVICE_PORT", "9000");
        assert_eq!(get_service_port("CFGTEST", 8000), 9000);
        std::env::remove_var("CFGTEST_SERVICE_PORT");

        std::env::set_var("CFGBAD_SERVICE_PORT", "not-a-port");
        assert_eq!(get_service_port("CFGBAD", 8000), 8000);
        std::env::remove_var("CFGBAD_SERVICE_PORT");
    }

    #[test]
    fn test_get_bind_address_override() {
        std::env::set_var("CFGADDR_SERVICE_ADDR", "http://127.0.0.1:4100");
        let addr = get_bind_address("CFGADDR", 8000);
        assert_eq!(addr, "127.0.0.1:4100".parse::<SocketAddr>().unwrap());
        std::env::remove_var("CFGADDR_SERVICE_ADDR");
    }

    #[test]
    fn test_formatted_service_name() {
        assert_eq!(get_formatted_service_name("PROMPT"), "prompt-service");
        assert_eq!(get_formatted_service_name("DATA_ROUTER"), "data-router-service");
    }
}
