//! # Application State
//!
//! Shared state handed to every handler: the engine facade, the server
//! configuration, the optional database pool used by readiness checks, and
//! the Prometheus handle when a recorder is installed.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;

use parkway_core::{Clock, SystemClock};
use parkway_engine::{MemoryStore, ParkingService, ParkingStore};

use crate::config::AppConfig;
use crate::db::PgStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: ParkingService,
    pub config: Arc<AppConfig>,
    /// Present when the server persists to Postgres.
    pub db_pool: Option<PgPool>,
    /// Renders `/metrics`.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// In-memory state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// Build state over Postgres when a pool is given, in memory otherwise.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        let store: Arc<dyn ParkingStore> = match &db_pool {
            Some(pool) => Arc::new(PgStore::new(pool.clone())),
            None => Arc::new(MemoryStore::new()),
        };
        Self::with_store(config, store, Arc::new(SystemClock), db_pool)
    }

    /// Build state over an explicit store and clock.
    pub fn with_store(
        config: AppConfig,
        store: Arc<dyn ParkingStore>,
        clock: Arc<dyn Clock>,
        db_pool: Option<PgPool>,
    ) -> Self {
        let service = ParkingService::new(store, clock, config.engine());
        Self {
            service,
            config: Arc::new(config),
            db_pool,
            metrics: None,
        }
    }

    /// Attach the installed Prometheus recorder.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.service)
            .field("config", &self.config)
            .field("db_pool", &self.db_pool.is_some())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
