//! Console configuration with file merge and environment overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ConsoleConfig::default()`]
//! 2. If a config file exists, deep-merge its values over the defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules: objects merge recursively, arrays and primitives are
//! replaced entirely, null values in the source are skipped. Invalid env
//! values are silently ignored and fall back to file/default.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use fuega_core::constants::{
    ACTIVITY_BUFFER_CAPACITY, CONSOLE_BUFFER_CAPACITY, INBOUND_BUFFER_CAPACITY, RECONNECT_DELAY_MS,
};

use crate::errors::{ConsoleError, Result};

/// Configuration for the console runtime.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleConfig {
    /// Push-connection endpoint.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// REST API base, no trailing slash.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Bearer token for API requests, if the deployment requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Delay between a transport close/error and the next connect attempt.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Capacity of the connection manager's inbound event buffer.
    #[serde(default = "default_inbound_capacity")]
    pub inbound_buffer_capacity: usize,
    /// Capacity of the instrumentation bus buffer.
    #[serde(default = "default_activity_capacity")]
    pub activity_buffer_capacity: usize,
    /// Capacity of the merged console view.
    #[serde(default = "default_console_capacity")]
    pub console_buffer_capacity: usize,
}

fn default_ws_url() -> String {
    "ws://127.0.0.1:8000/ws".to_owned()
}
fn default_api_base_url() -> String {
    "http://127.0.0.1:8000/api".to_owned()
}
fn default_reconnect_delay_ms() -> u64 {
    RECONNECT_DELAY_MS
}
fn default_inbound_capacity() -> usize {
    INBOUND_BUFFER_CAPACITY
}
fn default_activity_capacity() -> usize {
    ACTIVITY_BUFFER_CAPACITY
}
fn default_console_capacity() -> usize {
    CONSOLE_BUFFER_CAPACITY
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            api_base_url: default_api_base_url(),
            api_token: None,
            reconnect_delay_ms: default_reconnect_delay_ms(),
            inbound_buffer_capacity: default_inbound_capacity(),
            activity_buffer_capacity: default_activity_capacity(),
            console_buffer_capacity: default_console_capacity(),
        }
    }
}

impl ConsoleConfig {
    /// Load from a config file (if present) with env var overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let defaults = serde_json::to_value(Self::default())
            .map_err(|e| ConsoleError::Config(e.to_string()))?;

        let merged = if path.exists() {
            debug!(?path, "loading console config from file");
            let content = std::fs::read_to_string(path)
                .map_err(|e| ConsoleError::Config(e.to_string()))?;
            let user: Value = serde_json::from_str(&content)
                .map_err(|e| ConsoleError::Config(e.to_string()))?;
            deep_merge(defaults, user)
        } else {
            debug!(?path, "config file not found, using defaults");
            defaults
        };

        let mut config: Self = serde_json::from_value(merged)
            .map_err(|e| ConsoleError::Config(e.to_string()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to this config.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable source (tests inject maps
    /// here instead of mutating process environment).
    pub fn apply_overrides_from(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(v) = read_string(&get, "FUEGA_WS_URL") {
            self.ws_url = v;
        }
        if let Some(v) = read_string(&get, "FUEGA_API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = read_string(&get, "FUEGA_API_TOKEN") {
            self.api_token = Some(v);
        }
        if let Some(v) = read_u64(&get, "FUEGA_RECONNECT_DELAY_MS", 1, 600_000) {
            self.reconnect_delay_ms = v;
        }
        if let Some(v) = read_usize(&get, "FUEGA_INBOUND_BUFFER", 1, 100_000) {
            self.inbound_buffer_capacity = v;
        }
        if let Some(v) = read_usize(&get, "FUEGA_ACTIVITY_BUFFER", 1, 100_000) {
            self.activity_buffer_capacity = v;
        }
        if let Some(v) = read_usize(&get, "FUEGA_CONSOLE_BUFFER", 1, 100_000) {
            self.console_buffer_capacity = v;
        }
    }
}

/// Recursive deep merge of two JSON values.
fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

fn read_string(get: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    get(name).filter(|v| !v.is_empty())
}

fn read_u64(get: &impl Fn(&str) -> Option<String>, name: &str, min: u64, max: u64) -> Option<u64> {
    get(name)?
        .parse::<u64>()
        .ok()
        .filter(|v| (min..=max).contains(v))
}

fn read_usize(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
    min: usize,
    max: usize,
) -> Option<usize> {
    get(name)?
        .parse::<usize>()
        .ok()
        .filter(|v| (min..=max).contains(v))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
