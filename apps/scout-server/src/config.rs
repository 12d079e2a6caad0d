//! Environment-driven server configuration with clamped defaults.

use std::net::SocketAddr;
use std::time::Duration;

use scout_engine::EngineConfig;

const MIN_TICK_SECS: u64 = 1;
const DEFAULT_TICK_SECS: u64 = 10;
const DEFAULT_HEARTBEAT_SECS: u64 = 15;
const DEFAULT_CHANNEL_CAPACITY: usize = 128;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub tick_interval: Duration,
    pub active_cap: usize,
    pub max_concurrent_cycles: usize,
    pub heartbeat_interval: Duration,
    pub channel_capacity: usize,
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind = std::env::var("SCOUT_BIND").unwrap_or_else(|_| "127.0.0.1:8311".to_string());
        let addr: SocketAddr = bind
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid SCOUT_BIND {bind:?}: {e}"))?;
        Ok(Self {
            addr,
            tick_interval: Duration::from_secs(
                env_u64("SCOUT_TICK_SECS", DEFAULT_TICK_SECS).max(MIN_TICK_SECS),
            ),
            active_cap: env_usize("SCOUT_ACTIVE_CAP", scout_engine::DEFAULT_ACTIVE_CAP).max(1),
            max_concurrent_cycles: env_usize("SCOUT_MAX_CYCLES", 3).max(1),
            heartbeat_interval: Duration::from_secs(
                env_u64("SCOUT_HEARTBEAT_SECS", DEFAULT_HEARTBEAT_SECS).max(1),
            ),
            channel_capacity: env_usize("SCOUT_CHANNEL_CAPACITY", DEFAULT_CHANNEL_CAPACITY).max(8),
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            active_cap: self.active_cap,
            max_concurrent_cycles: self.max_concurrent_cycles,
            tick_interval: self.tick_interval,
            ..EngineConfig::default()
        }
    }
}
