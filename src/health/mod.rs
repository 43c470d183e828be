//! Health check endpoints
//!
//! - GET /health - Liveness check (process is running)
//! - GET /ready - Readiness check (history writer and database are usable)

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use deadpool_postgres::Pool;
use serde_json::json;
use tokio::time::timeout;
use tracing::{debug, error, warn};
use warp::http::StatusCode;
use warp::Filter;

use crate::history::HistoryHandle;

/// Readiness check dependencies
#[derive(Clone, Default)]
pub struct HealthDependencies {
    pub history: Option<HistoryHandle>,
    pub pool: Option<Pool>,
}

/// `/health` and `/ready` filters
pub fn routes(
    dependencies: HealthDependencies,
    timeout_seconds: u64,
) -> impl Filter<Extract = (warp::reply::WithStatus<warp::reply::Json>,), Error = warp::Rejection> + Clone {
    let deps = Arc::new(dependencies);

    let health = warp::path("health").and(warp::path::end()).and(warp::get()).map(|| {
        debug!("Health check requested");
        warp::reply::with_status(
            warp::reply::json(&json!({
                "status": "healthy",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "service": "profile-triage"
            })),
            StatusCode::OK,
        )
    });

    let timeout_duration = Duration::from_secs(timeout_seconds);
    let ready = warp::path("ready")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(move || {
            let deps = Arc::clone(&deps);
            async move {
                match timeout(timeout_duration, check_readiness(deps)).await {
                    Ok(reply) => Ok::<_, Infallible>(reply),
                    Err(_) => {
                        error!("Readiness check timed out after {}s", timeout_duration.as_secs());
                        Ok(warp::reply::with_status(
                            warp::reply::json(&json!({
                                "status": "not_ready",
                                "reason": "timeout",
                                "timestamp": chrono::Utc::now().to_rfc3339()
                            })),
                            StatusCode::SERVICE_UNAVAILABLE,
                        ))
                    }
                }
            }
        });

    health.or(ready).unify()
}

/// Check if all configured dependencies are ready
async fn check_readiness(dependencies: Arc<HealthDependencies>) -> warp::reply::WithStatus<warp::reply::Json> {
    let mut checks = serde_json::Map::new();
    let mut is_ready = true;

    match &dependencies.history {
        Some(history) => match check_history_health(history).await {
            Ok(status) => {
                checks.insert("history".to_string(), status);
            }
            Err(e) => {
                warn!("History writer health check failed: {}", e);
                is_ready = false;
                checks.insert("history".to_string(), json!({ "status": "unhealthy", "error": e }));
            }
        },
        None => {
            checks.insert("history".to_string(), json!({ "status": "not_configured" }));
        }
    }

    match &dependencies.pool {
        Some(pool) => match check_postgres_health(pool).await {
            Ok(status) => {
                checks.insert("postgres".to_string(), status);
            }
            Err(e) => {
                // Auxiliary stores degrade to empty results; report but stay ready
                warn!("PostgreSQL health check failed: {}", e);
                checks.insert("postgres".to_string(), json!({ "status": "degraded", "error": e }));
            }
        },
        None => {
            checks.insert("postgres".to_string(), json!({ "status": "not_configured" }));
        }
    }

    let (label, code) = if is_ready {
        ("ready", StatusCode::OK)
    } else {
        ("not_ready", StatusCode::SERVICE_UNAVAILABLE)
    };
    warp::reply::with_status(
        warp::reply::json(&json!({
            "status": label,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "checks": checks
        })),
        code,
    )
}

/// History actor health: answers an ask and reports its counters
pub async fn check_history_health(history: &HistoryHandle) -> Result<serde_json::Value, String> {
    let stats = history.stats().await.map_err(|e| e.to_string())?;
    Ok(json!({
        "status": "healthy",
        "saved": stats.saved,
        "failed": stats.failed,
        "lastError": stats.last_error
    }))
}

/// Pool health: a connection can be checked out and answers a trivial query
pub async fn check_postgres_health(pool: &Pool) -> Result<serde_json::Value, String> {
    let client = pool.get().await.map_err(|e| e.to_string())?;
    client.query_one("SELECT 1", &[]).await.map_err(|e| e.to_string())?;

    let status = pool.status();
    Ok(json!({
        "status": "healthy",
        "connections": status.size,
        "available": status.available
    }))
}
