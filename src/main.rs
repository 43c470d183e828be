use std::sync::Arc;

use profile_triage::access::{
    BaselineStore, DataAccess, HistoryStore, NullBaselineStore, NullHistoryStore, NullServiceRegistry, ServiceRegistry,
};
use profile_triage::api::PyroscopeClient;
use profile_triage::config::TriageConfig;
use profile_triage::fleet::FleetOrchestrator;
use profile_triage::health::HealthDependencies;
use profile_triage::history::HistoryHandle;
use profile_triage::http::{self, AppState};
use profile_triage::logging::{cleanup_old_logs, init_dual_logging, init_simple_logging, log_system_info};
use profile_triage::postgres::{create_pool, PostgresStores};
use tracing::{error, info, warn};

struct Stores {
    baselines: Arc<dyn BaselineStore>,
    registry: Arc<dyn ServiceRegistry>,
    history: Arc<dyn HistoryStore>,
    pool: Option<deadpool_postgres::Pool>,
}

impl Stores {
    fn null() -> Self {
        Self {
            baselines: Arc::new(NullBaselineStore),
            registry: Arc::new(NullServiceRegistry),
            history: Arc::new(NullHistoryStore),
            pool: None,
        }
    }
}

/// PostgreSQL-backed stores when enabled and reachable, empty stores otherwise
async fn connect_stores(config: &TriageConfig) -> Stores {
    if !config.postgres.enabled {
        info!("🚫 PostgreSQL disabled - baselines, registry and history are empty");
        return Stores::null();
    }

    match create_pool(&config.postgres).await {
        Ok(pool) => {
            info!(
                "🐘 PostgreSQL connected - {}:{}/{}",
                config.postgres.host, config.postgres.port, config.postgres.database
            );
            let stores = Arc::new(PostgresStores::new(pool.clone()));
            Stores {
                baselines: stores.clone(),
                registry: stores.clone(),
                history: stores,
                pool: Some(pool),
            }
        }
        Err(e) => {
            warn!("⚠️ PostgreSQL unavailable ({}). Continuing without auxiliary stores", e);
            Stores::null()
        }
    }
}

#[tokio::main]
async fn main() {
    let config_path = TriageConfig::default_path();
    let config = match TriageConfig::from_toml(&config_path) {
        Ok(config) => {
            // Simple print until logging is initialized
            println!("✅ Loaded configuration from {}", config_path);
            config
        }
        Err(e) => {
            println!("⚠️ Failed to load {}: {}. Using default configuration", config_path, e);
            TriageConfig::default()
        }
    };

    let _logging_guard = match init_dual_logging(&config.logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("❌ Failed to initialize logging system: {}", e);
            if let Err(e) = init_simple_logging(&config.logging.level_filter) {
                eprintln!("❌ Fallback logging failed too: {}", e);
            }
            None
        }
    };

    if let Err(e) = cleanup_old_logs(&config.logging.log_dir, config.logging.retention_days) {
        warn!("⚠️ Failed to clean up old log files: {}", e);
    }
    log_system_info();

    info!(
        backend = %config.backend.base_url,
        host = %config.server.host,
        port = config.server.port,
        max_concurrency = config.fleet.max_concurrency,
        per_app_limit = config.fleet.per_app_limit,
        postgres_enabled = config.postgres.enabled,
        log_dir = %config.logging.log_dir,
        "🔧 Configuration"
    );

    let client = match PyroscopeClient::new(&config.backend) {
        Ok(client) => client,
        Err(e) => {
            error!("❌ Failed to build profiling backend client: {}", e);
            return;
        }
    };

    let stores = connect_stores(&config).await;
    let access = DataAccess::new(Arc::new(client))
        .with_baselines(stores.baselines)
        .with_registry(stores.registry);
    let history = HistoryHandle::spawn(stores.history);

    let state = AppState {
        fleet: FleetOrchestrator::new(access.clone(), config.fleet.clone()),
        access,
        history: history.clone(),
    };
    let health_deps = HealthDependencies {
        history: Some(history),
        pool: stores.pool,
    };

    info!("🚀 Starting profile triage service");
    if let Err(e) = http::serve(
        &config.server.host,
        config.server.port,
        state,
        health_deps,
        config.server.request_timeout_seconds,
    )
    .await
    {
        error!("❌ HTTP server failed: {}", e);
    }
}
