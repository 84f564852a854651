// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Proxy Configuration Types
//
// Defines the configuration schema for a spark-proxy instance:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - HTTP server binding and per-request deadline
// - Identity strategy for the application registry
// - Execution backend selection
// - Logging format and metrics exporter

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_VERSION: &str = "sparkproxy.io/v1";
pub const KIND: &str = "ProxyConfig";

/// Top-level Kubernetes-style proxy configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfigManifest {
    /// API version (must be "sparkproxy.io/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ProxyConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: ProxyConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Instance name, used in logs
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyConfigSpec {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Deadline applied to every inbound request (e.g. "30s")
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub id_strategy: IdStrategy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// `spark-app-<uuid v4>`
    #[default]
    Uuid,
    /// `spark-app-<n>`, process-local counter
    Sequential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(rename = "type", default)]
    pub backend_type: BackendType,

    /// Simulated backend only: report RUNNING and COMPLETED after acceptance
    #[serde(default)]
    pub auto_progress: bool,

    /// Simulated backend only: delay between consecutive status reports
    #[serde(default = "default_step_delay", with = "humantime_serde")]
    pub step_delay: Duration,

    /// Buffer size of the status report channel
    #[serde(default = "default_status_channel_capacity")]
    pub status_channel_capacity: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            backend_type: BackendType::default(),
            auto_progress: false,
            step_delay: default_step_delay(),
            status_channel_capacity: default_status_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    #[default]
    Simulated,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub log_format: LogFormat,

    /// Prometheus exporter listen address; disabled when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_listen: Option<SocketAddr>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl Default for ProxyConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "spark-proxy".to_string(),
                labels: None,
            },
            spec: ProxyConfigSpec::default(),
        }
    }
}

impl ProxyConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. SPARK_PROXY_CONFIG_PATH environment variable
    /// 2. ./spark-proxy.yaml (working directory)
    /// 3. ~/.spark-proxy/config.yaml (user home)
    /// 4. /etc/spark-proxy/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("SPARK_PROXY_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./spark-proxy.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".spark-proxy").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/spark-proxy/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("SPARK_PROXY_HOST") {
            tracing::info!("Environment override: SPARK_PROXY_HOST={}", host);
            self.spec.server.host = host;
        }

        if let Ok(val) = std::env::var("SPARK_PROXY_PORT") {
            match val.parse::<u16>() {
                Ok(port) => {
                    tracing::info!("Environment override: SPARK_PROXY_PORT={}", port);
                    self.spec.server.port = port;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for SPARK_PROXY_PORT: '{}'. Expected a port number. Ignoring.",
                        val
                    );
                }
            }
        }

        if let Ok(val) = std::env::var("SPARK_PROXY_AUTO_PROGRESS") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => {
                    tracing::info!("Environment override: SPARK_PROXY_AUTO_PROGRESS=true");
                    self.spec.backend.auto_progress = true;
                }
                "false" | "0" | "no" | "off" => {
                    tracing::info!("Environment override: SPARK_PROXY_AUTO_PROGRESS=false");
                    self.spec.backend.auto_progress = false;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for SPARK_PROXY_AUTO_PROGRESS: '{}'. Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.server.port == 0 {
            anyhow::bail!("spec.server.port cannot be 0");
        }

        if self.spec.server.request_timeout.is_zero() {
            anyhow::bail!("spec.server.request_timeout must be greater than zero");
        }

        if self.spec.backend.status_channel_capacity == 0 {
            anyhow::bail!("spec.backend.status_channel_capacity must be greater than zero");
        }

        Ok(())
    }

    /// `host:port` the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.spec.server.host, self.spec.server.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_step_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_status_channel_capacity() -> usize {
    1024
}
