use serde::{Deserialize, Serialize};

use crate::profile::{serialize_rounded, EpochSeconds, ProfileSnapshot, ProfileType};

/// One application's self-percent for a function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceObservation {
    pub app: String,
    #[serde(serialize_with = "serialize_rounded")]
    pub self_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

impl ServiceObservation {
    pub fn new(app: impl Into<String>, self_percent: f64) -> Self {
        Self {
            app: app.into(),
            self_percent,
            team_owner: None,
            tier: None,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.tier.as_deref() == Some("critical")
    }
}

/// A function ranked by how broadly and how hard it hits the fleet
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotEntry {
    pub function: String,
    pub service_count: usize,
    pub critical_service_count: usize,
    #[serde(serialize_with = "serialize_rounded")]
    pub max_self_percent: f64,
    /// `service_count * max_self_percent`
    #[serde(serialize_with = "serialize_rounded")]
    pub impact_score: f64,
    pub services: Vec<ServiceObservation>,
}

/// A function in one application whose name matched a fleet search
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    pub app: String,
    pub function: String,
    #[serde(serialize_with = "serialize_rounded")]
    pub self_percent: f64,
    pub self_samples: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_channel: Option<String>,
}

/// Profiles that came back from a fan-out, plus the damage report
#[derive(Debug, Clone, Default)]
pub struct FleetFetch {
    pub profiles: Vec<ProfileSnapshot>,
    pub apps_queried: usize,
    pub partial_failures: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub query: String,
    pub profile_type: ProfileType,
    pub from: EpochSeconds,
    pub to: EpochSeconds,
    pub match_count: usize,
    pub matches: Vec<SearchMatch>,
    pub apps_queried: usize,
    pub partial_failures: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotResult {
    pub profile_type: ProfileType,
    pub from: EpochSeconds,
    pub to: EpochSeconds,
    pub hotspots: Vec<HotspotEntry>,
    pub apps_queried: usize,
    pub partial_failures: usize,
}
