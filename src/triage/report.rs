//! Multi-category triage
//!
//! Every requested category is fetched together with its baseline thresholds. A category
//! whose fetch fails is reported as unavailable instead of failing the whole triage.

use futures::future::join_all;
use rustc_hash::FxHashMap;
use serde::{Serialize, Serializer};
use tracing::{info, warn};

use super::rules::{diagnose, recommend, severity, Diagnosis, Severity};
use crate::access::{BaselineThreshold, DataAccess, ServiceInfo, TriageRecord};
use crate::errors::TriageError;
use crate::profile::{serialize_rounded, EpochSeconds, FunctionSample, ProfileSnapshot, ProfileType, TimeWindow};

pub const DEFAULT_TRIAGE_TYPES: &str = "cpu,alloc";
pub const DEFAULT_TRIAGE_LIMIT: usize = 10;

/// Resolved triage parameters
#[derive(Debug, Clone)]
pub struct TriageRequest {
    pub app_name: String,
    pub profile_types: Vec<ProfileType>,
    pub window: TimeWindow,
    pub limit: usize,
}

impl TriageRequest {
    /// Parse a comma-separated category list, keeping first-seen order.
    ///
    /// Any unknown category fails the whole list.
    pub fn parse_types(raw: &str) -> Result<Vec<ProfileType>, TriageError> {
        let mut types = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let profile_type: ProfileType = part.parse()?;
            if !types.contains(&profile_type) {
                types.push(profile_type);
            }
        }
        if types.is_empty() {
            return Err(TriageError::BadRequest("No profile types requested".to_string()));
        }
        Ok(types)
    }
}

/// A function hotter than its approved maximum
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineViolation {
    pub function: String,
    #[serde(serialize_with = "serialize_rounded")]
    pub current_percent: f64,
    #[serde(serialize_with = "serialize_rounded")]
    pub threshold: f64,
    #[serde(serialize_with = "serialize_rounded")]
    pub exceeded_by: f64,
    pub severity: String,
}

/// Compare decoded functions against their thresholds
pub fn check_baselines(functions: &[FunctionSample], baselines: &[BaselineThreshold]) -> Vec<BaselineViolation> {
    let by_name: FxHashMap<&str, &BaselineThreshold> =
        baselines.iter().map(|b| (b.function_name.as_str(), b)).collect();

    functions
        .iter()
        .filter_map(|f| {
            let baseline = by_name.get(f.name.as_str())?;
            (f.self_percent > baseline.max_self_percent).then(|| BaselineViolation {
                function: f.name.clone(),
                current_percent: f.self_percent,
                threshold: baseline.max_self_percent,
                exceeded_by: f.self_percent - baseline.max_self_percent,
                severity: if baseline.severity.is_empty() {
                    "warning".to_string()
                } else {
                    baseline.severity.clone()
                },
            })
        })
        .collect()
}

/// Triage result for one category that was fetched
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAnalysis {
    pub diagnosis: Diagnosis,
    pub total_samples: u64,
    pub top_functions: Vec<FunctionSample>,
    pub recommendation: String,
    pub baseline_violations: Vec<BaselineViolation>,
}

impl CategoryAnalysis {
    pub fn analyze(snapshot: ProfileSnapshot, baselines: &[BaselineThreshold]) -> Self {
        let diagnosis = diagnose(snapshot.profile_type, &snapshot.functions);
        let recommendation = recommend(diagnosis, snapshot.top_function().map(|f| f.name.as_str()));
        let baseline_violations = check_baselines(&snapshot.functions, baselines);

        Self {
            diagnosis,
            total_samples: snapshot.total_samples,
            top_functions: snapshot.functions,
            recommendation,
            baseline_violations,
        }
    }

    /// Self-percent of the hottest function, 0 when nothing was sampled
    pub fn top_self_percent(&self) -> f64 {
        self.top_functions.first().map(|f| f.self_percent).unwrap_or(0.0)
    }
}

/// Per-category outcome
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CategoryResult {
    Analyzed(CategoryAnalysis),
    Unavailable { diagnosis: Diagnosis, error: String },
}

impl CategoryResult {
    pub fn unavailable(error: impl ToString) -> Self {
        CategoryResult::Unavailable {
            diagnosis: Diagnosis::Unavailable,
            error: error.to_string(),
        }
    }

    pub fn diagnosis(&self) -> Diagnosis {
        match self {
            CategoryResult::Analyzed(analysis) => analysis.diagnosis,
            CategoryResult::Unavailable { diagnosis, .. } => *diagnosis,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageSummary {
    pub primary_issue: Diagnosis,
    pub severity: Severity,
    pub recommendation: String,
    pub baseline_violations: usize,
}

/// Triage across one or more categories for a single application
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageReport {
    pub app_name: String,
    pub from: EpochSeconds,
    pub to: EpochSeconds,
    /// Keyed by category, in request order
    #[serde(serialize_with = "serialize_profiles")]
    pub profiles: Vec<(ProfileType, CategoryResult)>,
    pub summary: TriageSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceInfo>,
}

fn serialize_profiles<S: Serializer>(
    profiles: &[(ProfileType, CategoryResult)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(profiles.iter().map(|(k, v)| (k, v)))
}

impl TriageReport {
    /// Assemble the report; the primary issue is the category with the hottest top function.
    pub fn build(
        app_name: impl Into<String>,
        window: TimeWindow,
        profiles: Vec<(ProfileType, CategoryResult)>,
        service: Option<ServiceInfo>,
    ) -> Self {
        let mut primary_issue = Diagnosis::Healthy;
        let mut primary_recommendation = "No significant issues detected".to_string();
        let mut max_percent = 0.0;
        let mut violations = 0;

        for (_, result) in &profiles {
            if let CategoryResult::Analyzed(analysis) = result {
                let top = analysis.top_self_percent();
                if top > max_percent {
                    max_percent = top;
                    primary_issue = analysis.diagnosis;
                    primary_recommendation = analysis.recommendation.clone();
                }
                violations += analysis.baseline_violations.len();
            }
        }

        Self {
            app_name: app_name.into(),
            from: window.from,
            to: window.to,
            profiles,
            summary: TriageSummary {
                primary_issue,
                severity: severity(max_percent),
                recommendation: primary_recommendation,
                baseline_violations: violations,
            },
            service,
        }
    }

    /// Fetch every category, its thresholds and the service metadata concurrently.
    pub async fn run(access: &DataAccess, request: &TriageRequest) -> Self {
        let categories = request.profile_types.iter().map(|&profile_type| async move {
            let (profile, baselines) = tokio::join!(
                access.fetch_profile(&request.app_name, profile_type, request.window, request.limit),
                access.baselines(&request.app_name, profile_type),
            );
            let result = match profile {
                Ok(snapshot) => CategoryResult::Analyzed(CategoryAnalysis::analyze(snapshot, &baselines)),
                Err(e) => {
                    warn!(app = %request.app_name, profile_type = %profile_type, "Category unavailable: {}", e);
                    CategoryResult::unavailable(e)
                }
            };
            (profile_type, result)
        });

        let (profiles, service) = tokio::join!(join_all(categories), access.service(&request.app_name));

        let report = Self::build(request.app_name.clone(), request.window, profiles, service);
        info!(
            app = %report.app_name,
            primary_issue = %report.summary.primary_issue,
            severity = %report.summary.severity,
            violations = report.summary.baseline_violations,
            "Triage complete"
        );
        report
    }

    pub fn category(&self, profile_type: ProfileType) -> Option<&CategoryResult> {
        self.profiles.iter().find(|(t, _)| *t == profile_type).map(|(_, r)| r)
    }

    /// Audit record for the history store
    pub fn history_record(&self) -> TriageRecord {
        let profile_types = self
            .profiles
            .iter()
            .map(|(t, _)| t.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let top_functions = serde_json::to_value(self)
            .ok()
            .and_then(|mut v| v.get_mut("profiles").map(serde_json::Value::take))
            .unwrap_or(serde_json::Value::Null);

        TriageRecord {
            app_name: self.app_name.clone(),
            profile_types,
            diagnosis: self.summary.primary_issue.to_string(),
            severity: self.summary.severity.to_string(),
            recommendation: self.summary.recommendation.clone(),
            top_functions,
            requested_by: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, self_percent: f64) -> FunctionSample {
        FunctionSample {
            name: name.to_string(),
            self_samples: (self_percent * 10.0) as u64,
            total_samples: (self_percent * 10.0) as u64,
            total_ticks: 1000,
            self_percent,
        }
    }

    fn snapshot(profile_type: ProfileType, functions: Vec<FunctionSample>) -> ProfileSnapshot {
        ProfileSnapshot {
            app_name: "orders".to_string(),
            profile_type,
            from: 0,
            to: 3600,
            total_samples: 1000,
            functions,
        }
    }

    fn threshold(name: &str, max: f64, severity: &str) -> BaselineThreshold {
        BaselineThreshold {
            function_name: name.to_string(),
            max_self_percent: max,
            severity: severity.to_string(),
        }
    }

    #[test]
    fn test_parse_types() {
        let types = TriageRequest::parse_types(" cpu , memory,cpu,wall ").unwrap();
        assert_eq!(types, vec![ProfileType::Cpu, ProfileType::Alloc, ProfileType::Wall]);

        assert!(matches!(
            TriageRequest::parse_types("cpu,heap"),
            Err(TriageError::InvalidProfileType(_))
        ));
        assert!(matches!(TriageRequest::parse_types(" , "), Err(TriageError::BadRequest(_))));
    }

    #[test]
    fn test_check_baselines() {
        let functions = vec![sample("hot", 35.0), sample("warm", 12.0), sample("free", 50.0)];
        let baselines = vec![threshold("hot", 20.0, "critical"), threshold("warm", 15.0, ""), threshold("gone", 1.0, "warning")];

        let violations = check_baselines(&functions, &baselines);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].function, "hot");
        assert_eq!(violations[0].exceeded_by, 15.0);
        assert_eq!(violations[0].severity, "critical");

        let defaulted = check_baselines(&[sample("warm", 16.0)], &baselines);
        assert_eq!(defaulted[0].severity, "warning");
    }

    #[test]
    fn test_primary_issue_is_hottest_category() {
        let cpu = CategoryAnalysis::analyze(snapshot(ProfileType::Cpu, vec![sample("java.lang.GC.collect", 12.0)]), &[]);
        let alloc = CategoryAnalysis::analyze(
            snapshot(ProfileType::Alloc, vec![sample("java.util.ArrayList.grow", 42.0)]),
            &[threshold("java.util.ArrayList.grow", 30.0, "critical")],
        );

        let report = TriageReport::build(
            "orders",
            TimeWindow::new(0, 3600),
            vec![
                (ProfileType::Cpu, CategoryResult::Analyzed(cpu)),
                (ProfileType::Alloc, CategoryResult::Analyzed(alloc)),
            ],
            None,
        );

        assert_eq!(report.summary.primary_issue, Diagnosis::CollectionResizing);
        assert_eq!(report.summary.severity, Severity::High);
        assert!(report.summary.recommendation.contains("java.util.ArrayList.grow"));
        assert_eq!(report.summary.baseline_violations, 1);
        assert_eq!(report.category(ProfileType::Cpu).unwrap().diagnosis(), Diagnosis::GcPressure);
    }

    #[test]
    fn test_all_empty_is_healthy() {
        let cpu = CategoryAnalysis::analyze(snapshot(ProfileType::Cpu, vec![]), &[]);
        let report = TriageReport::build(
            "orders",
            TimeWindow::new(0, 3600),
            vec![
                (ProfileType::Cpu, CategoryResult::Analyzed(cpu)),
                (ProfileType::Wall, CategoryResult::unavailable("backend down")),
            ],
            None,
        );

        assert_eq!(report.summary.primary_issue, Diagnosis::Healthy);
        assert_eq!(report.summary.severity, Severity::Low);
        assert_eq!(report.summary.recommendation, "No significant issues detected");
        assert_eq!(report.category(ProfileType::Cpu).unwrap().diagnosis(), Diagnosis::NoData);
    }

    #[test]
    fn test_json_shape() {
        let cpu = CategoryAnalysis::analyze(snapshot(ProfileType::Cpu, vec![sample("com.acme.Work.run", 22.5)]), &[]);
        let report = TriageReport::build(
            "orders",
            TimeWindow::new(0, 3600),
            vec![
                (ProfileType::Cpu, CategoryResult::Analyzed(cpu)),
                (ProfileType::Alloc, CategoryResult::unavailable("Profiling backend error (503): down")),
            ],
            None,
        );
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["appName"], "orders");
        assert_eq!(json["profiles"]["cpu"]["diagnosis"], "cpu_bound");
        assert_eq!(json["profiles"]["cpu"]["totalSamples"], 1000);
        assert_eq!(json["profiles"]["cpu"]["topFunctions"][0]["selfPercent"], 22.5);
        assert_eq!(json["profiles"]["alloc"]["diagnosis"], "unavailable");
        assert!(json["profiles"]["alloc"]["error"].as_str().unwrap().contains("503"));
        assert_eq!(json["summary"]["severity"], "medium");
        assert!(json.get("service").is_none());
    }

    #[test]
    fn test_history_record() {
        let cpu = CategoryAnalysis::analyze(snapshot(ProfileType::Cpu, vec![sample("java.lang.Thread.sleep", 40.0)]), &[]);
        let report = TriageReport::build(
            "orders",
            TimeWindow::new(0, 3600),
            vec![
                (ProfileType::Cpu, CategoryResult::Analyzed(cpu)),
                (ProfileType::Lock, CategoryResult::unavailable("timeout")),
            ],
            None,
        );
        let record = report.history_record();

        assert_eq!(record.profile_types, "cpu,lock");
        assert_eq!(record.diagnosis, "thread_waiting");
        assert_eq!(record.severity, "high");
        assert_eq!(record.top_functions["lock"]["diagnosis"], "unavailable");
    }
}
