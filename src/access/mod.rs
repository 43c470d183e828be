//! Data-access facade
//!
//! Bundles the primary profile source with the optional auxiliary stores. Stores that are not
//! configured are null objects; stores that fail are logged and read as empty.

pub mod null;

use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::api::{fetch_profile, ApiError, ProfileSource};
use crate::postgres::errors::PostgresError;
use crate::profile::{ProfileSnapshot, ProfileType, TimeWindow};

pub use null::{NullBaselineStore, NullHistoryStore, NullServiceRegistry};

/// Auxiliary store failure
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Postgres(#[from] PostgresError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Operator-approved maximum self-percent for one function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineThreshold {
    pub function_name: String,
    pub max_self_percent: f64,
    pub severity: String,
}

/// Ownership metadata for a registered application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub app_name: String,
    pub team_owner: Option<String>,
    pub tier: Option<String>,
    pub environment: Option<String>,
    pub notification_channel: Option<String>,
}

/// Audit record of one triage or diff assessment
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageRecord {
    pub app_name: String,
    pub profile_types: String,
    pub diagnosis: String,
    pub severity: String,
    pub recommendation: String,
    pub top_functions: serde_json::Value,
    pub requested_by: Option<String>,
}

#[async_trait]
pub trait BaselineStore: Send + Sync {
    async fn baselines(&self, app_name: &str, profile_type: ProfileType) -> Result<Vec<BaselineThreshold>, StoreError>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn record(&self, record: &TriageRecord) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    async fn list_services(&self) -> Result<Vec<ServiceInfo>, StoreError>;

    async fn service(&self, app_name: &str) -> Result<Option<ServiceInfo>, StoreError>;
}

/// Uniform entry point to the profiling backend and the auxiliary stores
#[derive(Clone)]
pub struct DataAccess {
    source: Arc<dyn ProfileSource>,
    baselines: Arc<dyn BaselineStore>,
    registry: Arc<dyn ServiceRegistry>,
}

impl DataAccess {
    /// Facade over a profile source with no auxiliary stores
    pub fn new(source: Arc<dyn ProfileSource>) -> Self {
        Self {
            source,
            baselines: Arc::new(NullBaselineStore),
            registry: Arc::new(NullServiceRegistry),
        }
    }

    pub fn with_baselines(mut self, baselines: Arc<dyn BaselineStore>) -> Self {
        self.baselines = baselines;
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn ServiceRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub async fn fetch_profile(
        &self,
        app_name: &str,
        profile_type: ProfileType,
        window: TimeWindow,
        limit: usize,
    ) -> Result<ProfileSnapshot, ApiError> {
        fetch_profile(self.source.as_ref(), app_name, profile_type, window, limit).await
    }

    pub async fn discover_apps(&self, window: TimeWindow) -> Result<Vec<String>, ApiError> {
        self.source.discover_apps(window).await
    }

    /// Baselines for an app and category; empty when the store is absent or failing
    pub async fn baselines(&self, app_name: &str, profile_type: ProfileType) -> Vec<BaselineThreshold> {
        match self.baselines.baselines(app_name, profile_type).await {
            Ok(baselines) => baselines,
            Err(e) => {
                warn!(app = app_name, profile_type = %profile_type, "Baseline lookup failed, continuing without thresholds: {}", e);
                Vec::new()
            }
        }
    }

    /// Registered services keyed by app name; empty when the registry is absent or failing
    pub async fn services(&self) -> FxHashMap<String, ServiceInfo> {
        match self.registry.list_services().await {
            Ok(services) => services.into_iter().map(|s| (s.app_name.clone(), s)).collect(),
            Err(e) => {
                warn!("Service registry lookup failed, results will not be enriched: {}", e);
                FxHashMap::default()
            }
        }
    }

    /// One service's metadata; `None` when unknown, absent or failing
    pub async fn service(&self, app_name: &str) -> Option<ServiceInfo> {
        match self.registry.service(app_name).await {
            Ok(service) => service,
            Err(e) => {
                warn!(app = app_name, "Service registry lookup failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockProfileSource;

    struct FailingStore;

    #[async_trait]
    impl BaselineStore for FailingStore {
        async fn baselines(&self, _app_name: &str, _profile_type: ProfileType) -> Result<Vec<BaselineThreshold>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    #[async_trait]
    impl ServiceRegistry for FailingStore {
        async fn list_services(&self) -> Result<Vec<ServiceInfo>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn service(&self, _app_name: &str) -> Result<Option<ServiceInfo>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    struct StaticRegistry(Vec<ServiceInfo>);

    #[async_trait]
    impl ServiceRegistry for StaticRegistry {
        async fn list_services(&self) -> Result<Vec<ServiceInfo>, StoreError> {
            Ok(self.0.clone())
        }

        async fn service(&self, app_name: &str) -> Result<Option<ServiceInfo>, StoreError> {
            Ok(self.0.iter().find(|s| s.app_name == app_name).cloned())
        }
    }

    #[tokio::test]
    async fn test_null_stores_read_empty() {
        let access = DataAccess::new(Arc::new(MockProfileSource::new()));
        assert!(access.baselines("orders", ProfileType::Cpu).await.is_empty());
        assert!(access.services().await.is_empty());
        assert!(access.service("orders").await.is_none());
    }

    #[tokio::test]
    async fn test_failing_stores_degrade_to_empty() {
        let failing = Arc::new(FailingStore);
        let access = DataAccess::new(Arc::new(MockProfileSource::new()))
            .with_baselines(failing.clone())
            .with_registry(failing);

        assert!(access.baselines("orders", ProfileType::Cpu).await.is_empty());
        assert!(access.services().await.is_empty());
        assert!(access.service("orders").await.is_none());
    }

    #[tokio::test]
    async fn test_services_keyed_by_app() {
        let registry = StaticRegistry(vec![ServiceInfo {
            app_name: "orders".to_string(),
            team_owner: Some("payments".to_string()),
            tier: Some("critical".to_string()),
            ..Default::default()
        }]);
        let access = DataAccess::new(Arc::new(MockProfileSource::new())).with_registry(Arc::new(registry));

        let services = access.services().await;
        assert_eq!(services["orders"].team_owner.as_deref(), Some("payments"));
        assert_eq!(access.service("orders").await.unwrap().tier.as_deref(), Some("critical"));
        assert!(access.service("billing").await.is_none());
    }
}
