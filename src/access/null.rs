use async_trait::async_trait;

use super::{BaselineStore, BaselineThreshold, HistoryStore, ServiceInfo, ServiceRegistry, StoreError, TriageRecord};
use crate::profile::ProfileType;

/// Stand-in when no baseline store is configured
pub struct NullBaselineStore;

/// Stand-in when no history store is configured; records are discarded
pub struct NullHistoryStore;

/// Stand-in when no service registry is configured
pub struct NullServiceRegistry;

#[async_trait]
impl BaselineStore for NullBaselineStore {
    async fn baselines(&self, _app_name: &str, _profile_type: ProfileType) -> Result<Vec<BaselineThreshold>, StoreError> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl HistoryStore for NullHistoryStore {
    async fn record(&self, _record: &TriageRecord) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl ServiceRegistry for NullServiceRegistry {
    async fn list_services(&self) -> Result<Vec<ServiceInfo>, StoreError> {
        Ok(Vec::new())
    }

    async fn service(&self, _app_name: &str) -> Result<Option<ServiceInfo>, StoreError> {
        Ok(None)
    }
}
