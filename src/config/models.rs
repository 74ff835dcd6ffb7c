use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::job::JobOptions;
use crate::store::{self, FjallStore, MemoryStore, Store};
use crate::transport::HttpConfig;

/// Top-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Process-wide job defaults, overridden per job
    #[serde(default)]
    pub job: JobOptions,
}

/// Store backend type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Fjall,
    Memory,
}

/// Store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Prepended to the job name to form the key namespace
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl StoreSettings {
    /// Open the configured backend
    pub fn open(&self) -> store::Result<Arc<dyn Store>> {
        Ok(match self.backend {
            StoreBackend::Fjall => Arc::new(FjallStore::open(&self.path)?),
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        })
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/crawlbox")
}

pub(crate) fn default_key_prefix() -> String {
    "crawlbox.".to_string()
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSettings {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    pub proxy: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout: default_connect_timeout(),
            max_redirects: default_max_redirects(),
            proxy: None,
        }
    }
}

impl HttpSettings {
    pub fn client_config(&self, request_timeout: Duration) -> HttpConfig {
        HttpConfig {
            connect_timeout: self.connect_timeout,
            request_timeout,
            max_redirects: self.max_redirects,
            user_agent: self.user_agent.clone(),
            proxy: self.proxy.clone(),
        }
    }
}

fn default_user_agent() -> String {
    format!("crawlbox/{}", env!("CARGO_PKG_VERSION"))
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_redirects() -> usize {
    10
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directives, `RUST_LOG` takes precedence
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert_eq!(settings.store.backend, StoreBackend::Fjall);
        assert_eq!(settings.store.path, PathBuf::from("data/crawlbox"));
        assert_eq!(settings.store.key_prefix, "crawlbox.");
        assert_eq!(settings.http.max_redirects, 10);
        assert_eq!(settings.logging.filter, "info");
        assert_eq!(settings.job.concurrency, 1);
    }

    #[test]
    fn test_client_config_takes_job_timeout() {
        let http = HttpSettings::default();
        let config = http.client_config(Duration::from_secs(3));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_memory_backend_opens() {
        let settings = StoreSettings {
            backend: StoreBackend::Memory,
            ..Default::default()
        };
        let store = settings.open().unwrap();
        store.push_back("k", "v").unwrap();
        assert_eq!(store.list_len("k").unwrap(), 1);
    }
}
