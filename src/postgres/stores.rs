use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod};
use serde::Deserialize;
use tokio_postgres::{NoTls, Row};
use tracing::{debug, info};

use super::errors::PostgresError;
use crate::access::{
    BaselineStore, BaselineThreshold, HistoryStore, ServiceInfo, ServiceRegistry, StoreError, TriageRecord,
};
use crate::profile::ProfileType;

/// PostgreSQL configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_connections: usize,
    pub enabled: bool,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "pyroscope".to_string(),
            username: "pyroscope".to_string(),
            password: "pyroscope".to_string(),
            max_connections: 5,
            enabled: false,
        }
    }
}

/// Build the shared connection pool and check it can hand out a connection
pub async fn create_pool(config: &PostgresConfig) -> Result<Pool, PostgresError> {
    info!("Initializing PostgreSQL connection pool...");
    info!("  host: {}", config.host);
    info!("  port: {}", config.port);
    info!("  database: {}", config.database);
    info!("  username: {}", config.username);
    info!("  password: [HIDDEN]");

    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.dbname = Some(config.database.clone());
    cfg.user = Some(config.username.clone());
    cfg.password = Some(config.password.clone());
    cfg.ssl_mode = Some(deadpool_postgres::SslMode::Disable);
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(deadpool_postgres::PoolConfig {
        max_size: config.max_connections,
        timeouts: deadpool_postgres::Timeouts::default(),
    });

    let pool = cfg
        .create_pool(None, NoTls)
        .map_err(|e| PostgresError::Setup(format!("Failed to create connection pool: {}", e)))?;

    let client = pool.get().await?;
    let row = client.query_one("SELECT 1 as test", &[]).await?;
    let test: i32 = row.try_get("test")?;
    if test != 1 {
        return Err(PostgresError::Setup("Connection test failed".to_string()));
    }

    info!("PostgreSQL connection test successful");
    Ok(pool)
}

/// Baseline, history and registry stores over one shared pool
#[derive(Clone)]
pub struct PostgresStores {
    pool: Pool,
}

impl PostgresStores {
    const SELECT_BASELINES_SQL: &'static str = r#"
        SELECT function_name, max_self_percent::float8 AS max_self_percent, severity
        FROM performance_baseline
        WHERE app_name = $1 AND profile_type = $2
        ORDER BY function_name
    "#;

    const INSERT_HISTORY_SQL: &'static str = r#"
        INSERT INTO triage_history
            (app_name, profile_types, diagnosis, severity, top_functions, recommendation, requested_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
    "#;

    const SELECT_SERVICES_SQL: &'static str = r#"
        SELECT app_name, team_owner, tier, environment, notification_channel
        FROM service_registry
        ORDER BY app_name
    "#;

    const SELECT_SERVICE_SQL: &'static str = r#"
        SELECT app_name, team_owner, tier, environment, notification_channel
        FROM service_registry
        WHERE app_name = $1
    "#;

    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn row_to_baseline(row: &Row) -> Result<BaselineThreshold, PostgresError> {
        let severity: Option<String> = row.try_get("severity")?;
        Ok(BaselineThreshold {
            function_name: row.try_get("function_name")?,
            max_self_percent: row.try_get("max_self_percent")?,
            severity: severity.unwrap_or_else(|| "warning".to_string()),
        })
    }

    fn row_to_service(row: &Row) -> Result<ServiceInfo, PostgresError> {
        Ok(ServiceInfo {
            app_name: row.try_get("app_name")?,
            team_owner: row.try_get("team_owner")?,
            tier: row.try_get("tier")?,
            environment: row.try_get("environment")?,
            notification_channel: row.try_get("notification_channel")?,
        })
    }
}

#[async_trait]
impl BaselineStore for PostgresStores {
    async fn baselines(&self, app_name: &str, profile_type: ProfileType) -> Result<Vec<BaselineThreshold>, StoreError> {
        let client = self.pool.get().await.map_err(PostgresError::from)?;
        let rows = client
            .query(Self::SELECT_BASELINES_SQL, &[&app_name, &profile_type.as_str()])
            .await
            .map_err(PostgresError::from)?;

        let baselines = rows.iter().map(Self::row_to_baseline).collect::<Result<Vec<_>, _>>()?;
        debug!(app = app_name, profile_type = %profile_type, "Loaded {} baselines", baselines.len());
        Ok(baselines)
    }
}

#[async_trait]
impl HistoryStore for PostgresStores {
    async fn record(&self, record: &TriageRecord) -> Result<(), StoreError> {
        let client = self.pool.get().await.map_err(PostgresError::from)?;
        client
            .execute(
                Self::INSERT_HISTORY_SQL,
                &[
                    &record.app_name,
                    &record.profile_types,
                    &record.diagnosis,
                    &record.severity,
                    &record.top_functions,
                    &record.recommendation,
                    &record.requested_by,
                ],
            )
            .await
            .map_err(PostgresError::from)?;
        Ok(())
    }
}

#[async_trait]
impl ServiceRegistry for PostgresStores {
    async fn list_services(&self) -> Result<Vec<ServiceInfo>, StoreError> {
        let client = self.pool.get().await.map_err(PostgresError::from)?;
        let rows = client.query(Self::SELECT_SERVICES_SQL, &[]).await.map_err(PostgresError::from)?;
        Ok(rows.iter().map(Self::row_to_service).collect::<Result<Vec<_>, _>>()?)
    }

    async fn service(&self, app_name: &str) -> Result<Option<ServiceInfo>, StoreError> {
        let client = self.pool.get().await.map_err(PostgresError::from)?;
        let row = client
            .query_opt(Self::SELECT_SERVICE_SQL, &[&app_name])
            .await
            .map_err(PostgresError::from)?;
        Ok(row.as_ref().map(Self::row_to_service).transpose()?)
    }
}
