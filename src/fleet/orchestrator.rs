//! Fleet fan-out
//!
//! Resolves the target applications, fetches one profile per application with bounded
//! concurrency and aggregates whatever succeeded. A failing application is dropped and
//! counted in `partial_failures`; it never fails the fleet call.

use std::time::Instant;

use futures::future::join_all;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::scorer::rank_hotspots;
use super::structs::{FleetFetch, HotspotResult, SearchMatch, SearchResult, ServiceObservation};
use crate::access::{DataAccess, ServiceInfo};
use crate::api::ApiError;
use crate::errors::TriageError;
use crate::profile::{ProfileType, TimeWindow};

/// Fan-out settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Per-app fetches in flight at once for a single fleet call
    pub max_concurrency: usize,
    /// Functions decoded per application
    pub per_app_limit: usize,
    /// Hotspots returned when the caller gives no limit
    pub hotspot_limit: usize,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            per_app_limit: 50,
            hotspot_limit: 20,
        }
    }
}

/// Split a comma-separated app list; `None` when nothing usable was given.
pub fn parse_app_list(raw: Option<&str>) -> Option<Vec<String>> {
    let mut apps: Vec<String> = Vec::new();
    for app in raw?.split(',').map(str::trim).filter(|a| !a.is_empty()) {
        if !apps.iter().any(|a| a == app) {
            apps.push(app.to_string());
        }
    }
    (!apps.is_empty()).then_some(apps)
}

#[derive(Clone)]
pub struct FleetOrchestrator {
    access: DataAccess,
    config: FleetConfig,
}

impl FleetOrchestrator {
    pub fn new(access: DataAccess, config: FleetConfig) -> Self {
        Self { access, config }
    }

    /// Explicit apps win; otherwise ask the backend who reported during the window.
    pub async fn resolve_apps(&self, apps: Option<Vec<String>>, window: TimeWindow) -> Result<Vec<String>, TriageError> {
        match apps {
            Some(apps) if !apps.is_empty() => Ok(apps),
            _ => {
                let discovered = self.access.discover_apps(window).await?;
                debug!(apps = discovered.len(), "Discovered applications");
                Ok(discovered)
            }
        }
    }

    /// Fetch every app's profile, at most `max_concurrency` at a time.
    pub async fn fetch_all(&self, apps: &[String], profile_type: ProfileType, window: TimeWindow) -> FleetFetch {
        let started = Instant::now();
        let semaphore = Semaphore::new(self.config.max_concurrency.max(1));
        let semaphore = &semaphore;

        let fetches = apps.iter().map(|app| async move {
            let _permit = semaphore
                .acquire()
                .await
                .map_err(|e| ApiError::Network(format!("Failed to acquire fetch permit: {}", e)))?;
            self.access
                .fetch_profile(app, profile_type, window, self.config.per_app_limit)
                .await
        });
        let results = join_all(fetches).await;

        let mut fetch = FleetFetch {
            apps_queried: apps.len(),
            ..Default::default()
        };
        for (app, result) in apps.iter().zip(results) {
            match result {
                Ok(snapshot) => fetch.profiles.push(snapshot),
                Err(e) => {
                    warn!(app = %app, profile_type = %profile_type, "Dropping app from fleet result: {}", e);
                    fetch.partial_failures += 1;
                }
            }
        }

        info!(
            profile_type = %profile_type,
            fan_out = fetch.apps_queried,
            partial_failures = fetch.partial_failures,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fleet fetch complete"
        );
        fetch
    }

    async fn resolve_and_fetch(
        &self,
        apps: Option<Vec<String>>,
        profile_type: ProfileType,
        window: TimeWindow,
    ) -> Result<(FleetFetch, FxHashMap<String, ServiceInfo>), TriageError> {
        let (apps, services) = tokio::join!(self.resolve_apps(apps, window), self.access.services());
        let apps = apps?;
        Ok((self.fetch_all(&apps, profile_type, window).await, services))
    }

    /// Case-insensitive function-name search across the fleet, hottest match first.
    pub async fn search(
        &self,
        query: &str,
        profile_type: ProfileType,
        window: TimeWindow,
        apps: Option<Vec<String>>,
    ) -> Result<SearchResult, TriageError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(TriageError::BadRequest("query parameter 'function' is required".to_string()));
        }

        let (fetch, services) = self.resolve_and_fetch(apps, profile_type, window).await?;
        let needle = query.to_lowercase();

        let mut matches: Vec<SearchMatch> = fetch
            .profiles
            .iter()
            .flat_map(|profile| {
                let service = services.get(&profile.app_name);
                profile
                    .functions
                    .iter()
                    .filter(|f| f.name.to_lowercase().contains(&needle))
                    .map(move |f| SearchMatch {
                        app: profile.app_name.clone(),
                        function: f.name.clone(),
                        self_percent: f.self_percent,
                        self_samples: f.self_samples,
                        team_owner: service.and_then(|s| s.team_owner.clone()),
                        tier: service.and_then(|s| s.tier.clone()),
                        notification_channel: service.and_then(|s| s.notification_channel.clone()),
                    })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.self_percent
                .total_cmp(&a.self_percent)
                .then_with(|| a.app.cmp(&b.app))
                .then_with(|| a.function.cmp(&b.function))
        });

        Ok(SearchResult {
            query: query.to_string(),
            profile_type,
            from: window.from,
            to: window.to,
            match_count: matches.len(),
            matches,
            apps_queried: fetch.apps_queried,
            partial_failures: fetch.partial_failures,
        })
    }

    /// Functions ranked by cross-service impact
    pub async fn hotspots(
        &self,
        profile_type: ProfileType,
        window: TimeWindow,
        apps: Option<Vec<String>>,
        limit: Option<usize>,
    ) -> Result<HotspotResult, TriageError> {
        let (fetch, services) = self.resolve_and_fetch(apps, profile_type, window).await?;

        let mut by_function: FxHashMap<String, Vec<ServiceObservation>> = FxHashMap::default();
        for profile in &fetch.profiles {
            let service = services.get(&profile.app_name);
            for f in &profile.functions {
                by_function.entry(f.name.clone()).or_default().push(ServiceObservation {
                    app: profile.app_name.clone(),
                    self_percent: f.self_percent,
                    team_owner: service.and_then(|s| s.team_owner.clone()),
                    tier: service.and_then(|s| s.tier.clone()),
                });
            }
        }

        let hotspots = rank_hotspots(by_function, limit.unwrap_or(self.config.hotspot_limit));
        Ok(HotspotResult {
            profile_type,
            from: window.from,
            to: window.to,
            hotspots,
            apps_queried: fetch.apps_queried,
            partial_failures: fetch.partial_failures,
        })
    }
}
