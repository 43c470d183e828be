#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use profile_triage::access::{
    BaselineStore, BaselineThreshold, DataAccess, NullHistoryStore, ServiceInfo, ServiceRegistry, StoreError,
};
use profile_triage::api::{ApiError, ProfileSource};
use profile_triage::fleet::{FleetConfig, FleetOrchestrator};
use profile_triage::history::HistoryHandle;
use profile_triage::http::AppState;
use profile_triage::profile::{EpochSeconds, Flamebearer, ProfileType, RenderResponse, TimeWindow};

/// Window every fixture tree is served for unless registered with a specific start
pub const CURRENT_FROM: EpochSeconds = 3600;
pub const CURRENT_TO: EpochSeconds = 7200;
pub const BASELINE_FROM: EpochSeconds = 0;
pub const BASELINE_TO: EpochSeconds = 3600;

/// Flat tree under a `total` root: every function is a direct leaf with `self == total`
pub fn flamebearer(functions: &[(&str, u64)]) -> Flamebearer {
    let num_ticks: u64 = functions.iter().map(|(_, samples)| samples).sum();
    let mut names = vec!["total".to_string()];
    let mut leaves = Vec::new();
    for (index, (name, samples)) in functions.iter().enumerate() {
        names.push(name.to_string());
        leaves.extend_from_slice(&[0, *samples, *samples, index as u64 + 1]);
    }

    Flamebearer {
        names,
        levels: vec![vec![0, num_ticks, 0, 0], leaves],
        num_ticks,
    }
}

/// In-memory profiling backend
#[derive(Default)]
pub struct FakeSource {
    /// (query, window start) -> tree; a `None` start serves any window
    trees: HashMap<(String, Option<EpochSeconds>), Flamebearer>,
    failing: HashSet<String>,
    apps: Vec<String>,
}

impl FakeSource {
    pub fn with_profile(mut self, app: &str, profile_type: ProfileType, functions: &[(&str, u64)]) -> Self {
        self.register(app);
        self.trees.insert((profile_type.query_for(app), None), flamebearer(functions));
        self
    }

    /// Tree served only for windows starting at `from`
    pub fn with_profile_at(
        mut self,
        app: &str,
        profile_type: ProfileType,
        from: EpochSeconds,
        functions: &[(&str, u64)],
    ) -> Self {
        self.register(app);
        self.trees.insert((profile_type.query_for(app), Some(from)), flamebearer(functions));
        self
    }

    /// App that is discoverable but whose every render fails with a 500
    pub fn with_failing(mut self, app: &str) -> Self {
        self.register(app);
        self.failing.insert(app.to_string());
        self
    }

    fn register(&mut self, app: &str) {
        if !self.apps.iter().any(|a| a == app) {
            self.apps.push(app.to_string());
        }
    }
}

#[async_trait]
impl ProfileSource for FakeSource {
    async fn render(&self, query: &str, window: TimeWindow) -> Result<RenderResponse, ApiError> {
        let app = query.split('.').next().unwrap_or_default();
        if self.failing.contains(app) {
            return Err(ApiError::Http {
                status: 500,
                body: "ingester unavailable".to_string(),
            });
        }

        let tree = self
            .trees
            .get(&(query.to_string(), Some(window.from)))
            .or_else(|| self.trees.get(&(query.to_string(), None)))
            .cloned();
        Ok(RenderResponse { flamebearer: tree })
    }

    async fn discover_apps(&self, _window: TimeWindow) -> Result<Vec<String>, ApiError> {
        let mut apps = self.apps.clone();
        apps.sort();
        Ok(apps)
    }
}

pub struct StaticBaselines(pub Vec<(String, ProfileType, BaselineThreshold)>);

#[async_trait]
impl BaselineStore for StaticBaselines {
    async fn baselines(&self, app_name: &str, profile_type: ProfileType) -> Result<Vec<BaselineThreshold>, StoreError> {
        Ok(self
            .0
            .iter()
            .filter(|(app, t, _)| app == app_name && *t == profile_type)
            .map(|(_, _, b)| b.clone())
            .collect())
    }
}

pub struct StaticRegistry(pub Vec<ServiceInfo>);

#[async_trait]
impl ServiceRegistry for StaticRegistry {
    async fn list_services(&self) -> Result<Vec<ServiceInfo>, StoreError> {
        Ok(self.0.clone())
    }

    async fn service(&self, app_name: &str) -> Result<Option<ServiceInfo>, StoreError> {
        Ok(self.0.iter().find(|s| s.app_name == app_name).cloned())
    }
}

pub fn service(app: &str, team: &str, tier: &str) -> ServiceInfo {
    ServiceInfo {
        app_name: app.to_string(),
        team_owner: Some(team.to_string()),
        tier: Some(tier.to_string()),
        environment: Some("production".to_string()),
        notification_channel: Some(format!("#{}-alerts", team)),
    }
}

pub fn baseline(app: &str, profile_type: ProfileType, function: &str, max: f64) -> (String, ProfileType, BaselineThreshold) {
    (
        app.to_string(),
        profile_type,
        BaselineThreshold {
            function_name: function.to_string(),
            max_self_percent: max,
            severity: "critical".to_string(),
        },
    )
}

/// Three-app fleet: `orders` regressed on JSON encoding, `billing` is healthy, `broken` fails
pub fn create_fleet_source() -> FakeSource {
    FakeSource::default()
        .with_profile_at(
            "orders",
            ProfileType::Cpu,
            BASELINE_FROM,
            &[("com.acme.orders.Handler.run", 70), ("com.fasterxml.jackson.Json.encode", 30)],
        )
        .with_profile_at(
            "orders",
            ProfileType::Cpu,
            CURRENT_FROM,
            &[("com.fasterxml.jackson.Json.encode", 55), ("com.acme.orders.Handler.run", 45)],
        )
        .with_profile(
            "orders",
            ProfileType::Alloc,
            &[("java.lang.StringBuilder.append", 60), ("java.util.ArrayList.grow", 40)],
        )
        .with_profile(
            "billing",
            ProfileType::Cpu,
            &[("com.acme.billing.Ledger.post", 80), ("com.fasterxml.jackson.Json.encode", 20)],
        )
        .with_failing("broken")
}

/// App state backed by `source`, with a registry for `orders` and `billing`
pub fn create_app_state(source: FakeSource) -> AppState {
    let access = DataAccess::new(Arc::new(source))
        .with_baselines(Arc::new(StaticBaselines(vec![baseline(
            "orders",
            ProfileType::Cpu,
            "com.fasterxml.jackson.Json.encode",
            40.0,
        )])))
        .with_registry(Arc::new(StaticRegistry(vec![
            service("orders", "checkout", "critical"),
            service("billing", "payments", "standard"),
        ])));

    AppState {
        fleet: FleetOrchestrator::new(access.clone(), FleetConfig::default()),
        access,
        history: HistoryHandle::spawn(Arc::new(NullHistoryStore)),
    }
}
