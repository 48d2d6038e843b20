//! Server configuration from command-line flags and environment

use clap::Parser;
use smartmeter_shared::{electrical, timing};
use std::time::Duration;

/// REE real-time market prices endpoint
pub const DEFAULT_REE_URL: &str =
    "https://apidatos.ree.es/es/datos/mercados/precios-mercados-tiempo-real";

/// Smart meter backend: readings, relay control and electricity prices
#[derive(Debug, Clone, Parser)]
#[command(name = "server", about = "Smart meter backend API")]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "METER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "METER_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Seconds before an unconfirmed relay command expires
    #[arg(
        long,
        env = "METER_COMMAND_TIMEOUT_SECS",
        default_value_t = timing::COMMAND_TIMEOUT_MS / 1000
    )]
    pub command_timeout_secs: u64,

    /// Number of readings kept in memory
    #[arg(long, env = "METER_MAX_READINGS", default_value_t = electrical::MAX_READINGS)]
    pub max_readings: usize,

    /// Base URL of the REE price API
    #[arg(long, env = "METER_REE_URL", default_value = DEFAULT_REE_URL)]
    pub ree_url: String,

    /// Timeout for REE requests in seconds
    #[arg(long, env = "METER_REE_TIMEOUT_SECS", default_value_t = 10)]
    pub ree_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            command_timeout_secs: timing::COMMAND_TIMEOUT_MS / 1000,
            max_readings: electrical::MAX_READINGS,
            ree_url: DEFAULT_REE_URL.into(),
            ree_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    /// `host:port` to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn ree_timeout(&self) -> Duration {
        Duration::from_secs(self.ree_timeout_secs)
    }
}
