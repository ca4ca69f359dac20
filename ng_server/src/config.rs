//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use number_guess::{DEFAULT_REQUIRED_PLAYERS, MAX_REQUIRED_PLAYERS, TableConfig};
use std::{fmt, net::SocketAddr, str::FromStr, time::Duration};

const DEFAULT_PUSH_BIND: &str = "127.0.0.1:8000";
const DEFAULT_POLL_BIND: &str = "127.0.0.1:8080";
const DEFAULT_POLL_HEADER_TIMEOUT_SECS: u64 = 15;

/// Which protocol adapters to serve
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServerMode {
    /// Persistent newline-delimited JSON connections only
    Push,
    /// Stateless HTTP only
    Poll,
    /// Both adapters over one shared game
    #[default]
    Both,
}

impl ServerMode {
    pub fn serves_push(&self) -> bool {
        matches!(self, Self::Push | Self::Both)
    }

    pub fn serves_poll(&self) -> bool {
        matches!(self, Self::Poll | Self::Both)
    }
}

impl FromStr for ServerMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "push" => Ok(Self::Push),
            "poll" => Ok(Self::Poll),
            "both" => Ok(Self::Both),
            other => Err(ConfigError::Invalid {
                var: "SERVER_MODE".to_string(),
                reason: format!("Unknown mode '{other}', expected push, poll or both"),
            }),
        }
    }
}

impl fmt::Display for ServerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Push => "push",
            Self::Poll => "poll",
            Self::Both => "both",
        };
        write!(f, "{repr}")
    }
}

/// Values given on the command line. They win over the environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub mode: Option<ServerMode>,
    pub push_bind: Option<SocketAddr>,
    pub poll_bind: Option<SocketAddr>,
    pub required_players: Option<usize>,
    pub metrics_bind: Option<SocketAddr>,
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Adapters to start
    pub mode: ServerMode,
    /// Push adapter bind address
    pub push_bind: SocketAddr,
    /// Poll adapter bind address
    pub poll_bind: SocketAddr,
    /// Seats that must be filled before round 1 starts
    pub required_players: usize,
    /// Departures below this count reset the game; `None` means `required_players`
    pub min_players: Option<usize>,
    /// How long a poll client may take to send its whole request, head and body
    pub poll_header_timeout: Duration,
    /// Prometheus exporter bind address, disabled when `None`
    pub metrics_bind: Option<SocketAddr>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mode: ServerMode::default(),
            push_bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            poll_bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            required_players: DEFAULT_REQUIRED_PLAYERS,
            min_players: None,
            poll_header_timeout: Duration::from_secs(DEFAULT_POLL_HEADER_TIMEOUT_SECS),
            metrics_bind: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `overrides` - Values parsed from CLI arguments
    ///
    /// # Errors
    ///
    /// Returns error if a set variable cannot be parsed where a silent
    /// fallback would change which sockets the server binds.
    pub fn from_env(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mode = match overrides.mode {
            Some(mode) => mode,
            None => match std::env::var("SERVER_MODE") {
                Ok(value) => value.parse()?,
                Err(_) => ServerMode::default(),
            },
        };

        let push_bind = match overrides.push_bind {
            Some(addr) => addr,
            None => parse_addr_env("PUSH_BIND", DEFAULT_PUSH_BIND)?,
        };
        let poll_bind = match overrides.poll_bind {
            Some(addr) => addr,
            None => parse_addr_env("POLL_BIND", DEFAULT_POLL_BIND)?,
        };
        let metrics_bind = match overrides.metrics_bind {
            Some(addr) => Some(addr),
            None => match std::env::var("METRICS_BIND") {
                Ok(value) => Some(parse_addr("METRICS_BIND", &value)?),
                Err(_) => None,
            },
        };

        let required_players = overrides
            .required_players
            .unwrap_or_else(|| parse_env_or("REQUIRED_PLAYERS", DEFAULT_REQUIRED_PLAYERS));
        let min_players = std::env::var("MIN_PLAYERS")
            .ok()
            .and_then(|v| v.parse().ok());

        Ok(ServerConfig {
            mode,
            push_bind,
            poll_bind,
            required_players,
            min_players,
            poll_header_timeout: Duration::from_secs(parse_env_or(
                "POLL_HEADER_TIMEOUT_SECS",
                DEFAULT_POLL_HEADER_TIMEOUT_SECS,
            )),
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.required_players == 0 || self.required_players > MAX_REQUIRED_PLAYERS {
            return Err(ConfigError::Invalid {
                var: "REQUIRED_PLAYERS".to_string(),
                reason: format!("Must be between 1 and {MAX_REQUIRED_PLAYERS}"),
            });
        }

        let min_players = self.min_players.unwrap_or(self.required_players);
        if min_players == 0 || min_players > self.required_players {
            return Err(ConfigError::Invalid {
                var: "MIN_PLAYERS".to_string(),
                reason: format!(
                    "Must be between 1 and required players ({})",
                    self.required_players
                ),
            });
        }

        if self.poll_header_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "POLL_HEADER_TIMEOUT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Table settings for the single shared game
    pub fn table_config(&self) -> TableConfig {
        TableConfig {
            name: "Main".to_string(),
            required_players: self.required_players,
            min_players: self.min_players,
            ..TableConfig::default()
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_addr(var: &str, value: &str) -> Result<SocketAddr, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var: var.to_string(),
        reason: format!("'{value}' is not an IP:PORT address"),
    })
}

fn parse_addr_env(var: &str, default: &str) -> Result<SocketAddr, ConfigError> {
    match std::env::var(var) {
        Ok(value) => parse_addr(var, &value),
        Err(_) => parse_addr(var, default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mode, ServerMode::Both);
        assert_eq!(config.push_bind.port(), 8000);
        assert_eq!(config.poll_bind.port(), 8080);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("push".parse::<ServerMode>().unwrap(), ServerMode::Push);
        assert_eq!(" POLL ".parse::<ServerMode>().unwrap(), ServerMode::Poll);
        assert_eq!("both".parse::<ServerMode>().unwrap(), ServerMode::Both);
        assert!("udp".parse::<ServerMode>().is_err());

        assert!(ServerMode::Both.serves_push() && ServerMode::Both.serves_poll());
        assert!(!ServerMode::Push.serves_poll());
        assert!(!ServerMode::Poll.serves_push());
    }

    #[test]
    fn test_config_validation_required_players() {
        let config = ServerConfig {
            required_players: 0,
            ..ServerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("REQUIRED_PLAYERS"));

        let config = ServerConfig {
            required_players: MAX_REQUIRED_PLAYERS + 1,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_min_players() {
        let config = ServerConfig {
            required_players: 3,
            min_players: Some(4),
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Invalid { var, .. } if var == "MIN_PLAYERS"
        ));

        let config = ServerConfig {
            required_players: 3,
            min_players: Some(2),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.table_config().game_settings().min_players, 2);
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let config = ServerConfig {
            poll_header_timeout: Duration::ZERO,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_win() {
        let overrides = CliOverrides {
            mode: Some(ServerMode::Push),
            push_bind: Some("127.0.0.1:9100".parse().unwrap()),
            poll_bind: Some("127.0.0.1:9101".parse().unwrap()),
            required_players: Some(4),
            metrics_bind: Some("127.0.0.1:9102".parse().unwrap()),
        };
        let config = ServerConfig::from_env(overrides).unwrap();
        assert_eq!(config.mode, ServerMode::Push);
        assert_eq!(config.push_bind.port(), 9100);
        assert_eq!(config.poll_bind.port(), 9101);
        assert_eq!(config.required_players, 4);
        assert_eq!(config.metrics_bind.map(|a| a.port()), Some(9102));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            var: "PUSH_BIND".to_string(),
            reason: "bad".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("PUSH_BIND"));
        assert!(msg.contains("bad"));
    }
}
