use std::env;
use std::net::SocketAddr;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 3001);
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Variable lookup is injected so tests never touch the process
    /// environment, which is shared across test threads.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| "mysql://localhost/volunteerhub".to_string());

        let bind_addr = lookup("BIND_ADDR")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(DEFAULT_BIND_ADDR));

        let max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        Self {
            database_url,
            bind_addr,
            max_connections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.database_url, "mysql://localhost/volunteerhub");
        assert_eq!(config.bind_addr.port(), 3001);
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_env_values_override_defaults() {
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("mysql://db/volunteerhub".to_string()),
            "BIND_ADDR" => Some("127.0.0.1:4000".to_string()),
            "DATABASE_MAX_CONNECTIONS" => Some("12".to_string()),
            _ => None,
        });
        assert_eq!(config.database_url, "mysql://db/volunteerhub");
        assert_eq!(config.bind_addr.port(), 4000);
        assert_eq!(config.max_connections, 12);
    }

    #[test]
    fn test_unparseable_values_fall_back_to_defaults() {
        let config = Config::from_lookup(|key| match key {
            "BIND_ADDR" => Some("not-an-addr".to_string()),
            "DATABASE_MAX_CONNECTIONS" => Some("many".to_string()),
            _ => None,
        });
        assert_eq!(config.bind_addr.port(), 3001);
        assert_eq!(config.max_connections, 5);
    }
}
