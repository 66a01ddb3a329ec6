use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

// Simulation constants — the charging model is deliberately coarse:
// one tick per started 1000 Wh of battery capacity, 100 units of
// charging rate per tick.
pub const WH_PER_TICK: u64 = 1000;
pub const RATE_PER_TICK: u64 = 100;

pub const DEFAULT_PORT: u16 = 18620;
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// Scheduler scan cadence. A newly eligible reservation waits at most
/// this long before a worker picks it up.
pub const DEFAULT_SCAN_PERIOD_SECS: u64 = 30;
/// Wall-clock length of one simulated charging second.
pub const DEFAULT_TICK_MS: u64 = 1000;
/// How long shutdown waits for live workers to unwind their recovery
/// path before abandoning them.
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

/// Top-level config (wattline.toml + WATTLINE_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WattlineConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub charging: ChargingConfig,
}

impl Default for WattlineConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
            charging: ChargingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Tunables for the charging engine. Production values are the defaults;
/// tests shrink the tick to milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargingConfig {
    #[serde(default = "default_scan_period_secs")]
    pub scan_period_secs: u64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for ChargingConfig {
    fn default() -> Self {
        Self {
            scan_period_secs: DEFAULT_SCAN_PERIOD_SECS,
            tick_ms: DEFAULT_TICK_MS,
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.wattline/wattline.db", home)
}
fn default_scan_period_secs() -> u64 {
    DEFAULT_SCAN_PERIOD_SECS
}
fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}
fn default_shutdown_grace_secs() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_SECS
}

impl WattlineConfig {
    /// Load config from a TOML file with WATTLINE_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.wattline/wattline.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: WattlineConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("WATTLINE_").split("_"))
            .extract()
            .map_err(|e| crate::error::WattlineError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.wattline/wattline.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = WattlineConfig::default();
        assert_eq!(cfg.charging.scan_period_secs, 30);
        assert_eq!(cfg.charging.tick_ms, 1000);
        assert_eq!(cfg.gateway.port, DEFAULT_PORT);
    }
}
