use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use tos_core::{CoreConfig, WaitPolicy};
use tos_store::StoreConfig;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Lifetime of a stored entry, in seconds.
    pub entry_ttl_secs: u64,
    /// Largest accepted POST body.
    pub max_body_bytes: usize,
    /// How often the in-process store reclaims expired entries.
    pub memory_sweep_secs: u64,
    pub store: StoreConfig,
    pub wait: WaitConfig,
    pub icon: IconConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5678)),
            entry_ttl_secs: CoreConfig::DEFAULT_ENTRY_TTL.as_secs(),
            max_body_bytes: 1024 * 1024,
            memory_sweep_secs: 600,
            store: StoreConfig::default(),
            wait: WaitConfig::default(),
            icon: IconConfig::default(),
        }
    }
}

/// Long-poll bounds, in milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    pub deadline_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            deadline_ms: WaitPolicy::DEFAULT_DEADLINE.as_millis() as u64,
            poll_interval_ms: WaitPolicy::DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl WaitConfig {
    pub fn policy(&self) -> WaitPolicy {
        WaitPolicy::new(
            Duration::from_millis(self.deadline_ms),
            Duration::from_millis(self.poll_interval_ms),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IconConfig {
    pub fetch_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 5000,
            user_agent: format!("tos/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
    }

    pub fn to_toml(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Settings of the write and read paths.
    pub fn core(&self) -> CoreConfig {
        CoreConfig {
            entry_ttl: Duration::from_secs(self.entry_ttl_secs),
            wait: self.wait.policy(),
        }
    }

    pub fn validate(&self) -> ServerResult<()> {
        self.core()
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;
        if self.max_body_bytes == 0 {
            return Err(ServerError::Config("max_body_bytes must be positive".into()));
        }
        if self.memory_sweep_secs == 0 {
            return Err(ServerError::Config("memory_sweep_secs must be positive".into()));
        }
        if self.icon.fetch_timeout_ms == 0 {
            return Err(ServerError::Config("icon.fetch_timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "0.0.0.0:5678".parse::<SocketAddr>().unwrap());
        assert_eq!(c.entry_ttl_secs, 600);
        assert_eq!(c.wait.policy(), WaitPolicy::default());
        assert_eq!(c.store, StoreConfig::Memory { notify: true });
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let c = ServerConfig::from_toml_str(
            r#"
            bind_addr = "127.0.0.1:9000"

            [store]
            kind = "redis"
            url = "redis://cache:6379"

            [wait]
            deadline_ms = 3000
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.store, StoreConfig::Redis { url: "redis://cache:6379".into() });
        assert_eq!(c.wait.deadline_ms, 3000);
        assert_eq!(c.wait.poll_interval_ms, 1000);
        assert_eq!(c.core().wait.max_iterations(), 3);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(ServerConfig::from_toml_str("entry_ttl_secs = 0").is_err());
        assert!(ServerConfig::from_toml_str("[wait]\npoll_interval_ms = 0").is_err());
        assert!(ServerConfig::from_toml_str("max_body_bytes = 0").is_err());
        assert!(ServerConfig::from_toml_str("bind_addr = 5").is_err());
    }

    #[test]
    fn huge_ttl_is_rejected() {
        let c = ServerConfig {
            entry_ttl_secs: u64::MAX / 2,
            ..ServerConfig::default()
        };
        assert!(matches!(c.validate(), Err(ServerError::Config(_))));
        assert!(ServerConfig::from_toml_str("entry_ttl_secs = 9223372036854775807").is_err());
    }

    #[test]
    fn toml_roundtrip() {
        let c = ServerConfig::default();
        let text = c.to_toml().unwrap();
        assert_eq!(ServerConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "entry_ttl_secs = 60\n[store]\nkind = \"memory\"\nnotify = false").unwrap();
        let c = ServerConfig::load(file.path()).unwrap();
        assert_eq!(c.core().entry_ttl, Duration::from_secs(60));
        assert_eq!(c.store, StoreConfig::Memory { notify: false });
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = ServerConfig::load("/nonexistent/tos.toml").unwrap_err();
        assert!(matches!(err, ServerError::Io(_)));
    }
}
