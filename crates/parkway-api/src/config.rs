//! # Server Configuration
//!
//! Every setting can come from a command-line flag or the matching
//! environment variable. Flags win.
//!
//! | Flag                          | Env                        | Default    |
//! |-------------------------------|----------------------------|------------|
//! | `--port`                      | `PORT`                     | 8080       |
//! | `--database-url`              | `DATABASE_URL`             | in-memory  |
//! | `--db-max-connections`        | `DB_MAX_CONNECTIONS`       | 20         |
//! | `--unit-timeout-ms`           | `UNIT_TIMEOUT_MS`          | 5000       |
//! | `--default-time-cap-minutes`  | `DEFAULT_TIME_CAP_MINUTES` | 60         |
//! | `--log-json`                  | `LOG_JSON`                 | off        |

use std::time::Duration;

use clap::Parser;

use parkway_engine::EngineConfig;

/// Runtime configuration for the API server.
#[derive(Parser, Clone)]
#[command(name = "parkway-api", version, about = "Parkway spot allocation API")]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Postgres connection string. Without it the server keeps all state in
    /// memory and loses it on restart.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Upper bound on pooled database connections.
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 20)]
    pub db_max_connections: u32,

    /// Deadline for one unit of work, in milliseconds.
    #[arg(long, env = "UNIT_TIMEOUT_MS", default_value_t = 5000)]
    pub unit_timeout_ms: u64,

    /// Session cap applied to new lots that do not specify one.
    #[arg(long, env = "DEFAULT_TIME_CAP_MINUTES", default_value_t = 60)]
    pub default_time_cap_minutes: u32,

    /// Emit logs as JSON lines.
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl AppConfig {
    /// Engine settings derived from this configuration.
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            unit_timeout: Duration::from_millis(self.unit_timeout_ms),
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("unit_timeout_ms", &self.unit_timeout_ms)
            .field("default_time_cap_minutes", &self.default_time_cap_minutes)
            .field("log_json", &self.log_json)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: None,
            db_max_connections: 20,
            unit_timeout_ms: 5000,
            default_time_cap_minutes: 60,
            log_json: false,
        }
    }
}
