//! Deployment diff report
//!
//! Decodes a baseline and a current window for one application, ranks the per-function
//! deltas and flags regressions that break an approved baseline threshold.

use std::fmt::Write as _;

use rustc_hash::FxHashMap;
use serde::{Serialize, Serializer};
use tracing::{debug, info};

use super::engine::{compute_deltas_with_thresholds, split_by_direction, to_percent_map, DiffEntry};
use crate::access::{BaselineThreshold, DataAccess, TriageRecord};
use crate::errors::TriageError;
use crate::profile::{round2, EpochSeconds, FunctionSample, ProfileType, TimeWindow};

/// Functions decoded per window before diffing
pub const DIFF_DECODE_LIMIT: usize = 500;

/// Default number of ranked deltas returned
pub const DEFAULT_DIFF_LIMIT: usize = 20;

/// Resolved diff parameters
#[derive(Debug, Clone)]
pub struct DiffRequest {
    pub app_name: String,
    pub profile_type: ProfileType,
    pub baseline: TimeWindow,
    pub current: TimeWindow,
    pub limit: usize,
}

impl DiffRequest {
    /// Fill unset bounds: the current window is the hour ending `to` (default `now`),
    /// the baseline is the hour ending where the current window starts.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve(
        app_name: impl Into<String>,
        profile_type: ProfileType,
        now: EpochSeconds,
        from: Option<EpochSeconds>,
        to: Option<EpochSeconds>,
        baseline_from: Option<EpochSeconds>,
        baseline_to: Option<EpochSeconds>,
        limit: Option<usize>,
    ) -> Self {
        let to = to.unwrap_or(now);
        let from = from.unwrap_or(to.saturating_sub(3600));
        let baseline_to = baseline_to.unwrap_or(from);
        let baseline_from = baseline_from.unwrap_or(baseline_to.saturating_sub(3600));

        Self {
            app_name: app_name.into(),
            profile_type,
            baseline: TimeWindow::new(baseline_from, baseline_to),
            current: TimeWindow::new(from, to),
            limit: limit.unwrap_or(DEFAULT_DIFF_LIMIT),
        }
    }
}

/// Counts and headline for a diff
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub regressions_count: usize,
    pub improvements_count: usize,
    pub threshold_breaches: usize,
    /// `"<name> (+<delta>%)"` for the largest regression
    pub top_regression: Option<String>,
}

/// Ranked regressions and improvements between two windows
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffReport {
    pub app_name: String,
    pub profile_type: ProfileType,
    pub baseline: TimeWindow,
    pub current: TimeWindow,
    #[serde(serialize_with = "serialize_rows")]
    pub regressions: Vec<DiffEntry>,
    #[serde(serialize_with = "serialize_rows")]
    pub improvements: Vec<DiffEntry>,
    pub summary: DiffSummary,
}

/// Wire shape of one diff entry
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DiffRow<'a> {
    function: &'a str,
    baseline_percent: f64,
    current_percent: f64,
    delta_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    approved_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exceeds_threshold: Option<bool>,
}

impl<'a> From<&'a DiffEntry> for DiffRow<'a> {
    fn from(entry: &'a DiffEntry) -> Self {
        Self {
            function: &entry.name,
            baseline_percent: round2(entry.baseline_percent),
            current_percent: round2(entry.current_percent),
            delta_percent: round2(entry.delta),
            approved_threshold: entry.threshold.map(round2),
            exceeds_threshold: entry.exceeds_threshold(),
        }
    }
}

fn serialize_rows<S: Serializer>(entries: &[DiffEntry], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(entries.iter().map(DiffRow::from))
}

/// Last two dot-separated segments, e.g. `com.acme.OrderService.save` -> `OrderService.save`
pub fn short_name(name: &str) -> &str {
    match name.rmatch_indices('.').nth(1) {
        Some((index, _)) => &name[index + 1..],
        None => name,
    }
}

fn format_epoch(seconds: EpochSeconds) -> String {
    chrono::DateTime::from_timestamp(seconds, 0)
        .unwrap_or_default()
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

impl DiffReport {
    /// Diff two decoded windows against the app's baseline thresholds
    pub fn build(
        request: &DiffRequest,
        baseline_functions: &[FunctionSample],
        current_functions: &[FunctionSample],
        thresholds: &[BaselineThreshold],
    ) -> Self {
        let threshold_map: FxHashMap<String, f64> = thresholds
            .iter()
            .map(|t| (t.function_name.clone(), t.max_self_percent))
            .collect();

        let entries = compute_deltas_with_thresholds(
            &to_percent_map(baseline_functions),
            &to_percent_map(current_functions),
            &threshold_map,
            request.limit,
        );
        let (regressions, improvements) = split_by_direction(entries);

        let summary = DiffSummary {
            regressions_count: regressions.len(),
            improvements_count: improvements.len(),
            threshold_breaches: regressions
                .iter()
                .filter(|r| r.exceeds_threshold() == Some(true))
                .count(),
            top_regression: regressions
                .first()
                .map(|r| format!("{} (+{}%)", r.name, round2(r.delta))),
        };

        Self {
            app_name: request.app_name.clone(),
            profile_type: request.profile_type,
            baseline: request.baseline,
            current: request.current,
            regressions,
            improvements,
            summary,
        }
    }

    /// Fetch both windows and the thresholds concurrently, then diff.
    ///
    /// A backend failure on either window fails the report; missing thresholds do not.
    pub async fn run(access: &DataAccess, request: &DiffRequest) -> Result<Self, TriageError> {
        let (baseline, current, thresholds) = tokio::join!(
            access.fetch_profile(&request.app_name, request.profile_type, request.baseline, DIFF_DECODE_LIMIT),
            access.fetch_profile(&request.app_name, request.profile_type, request.current, DIFF_DECODE_LIMIT),
            access.baselines(&request.app_name, request.profile_type),
        );
        let (baseline, current) = (baseline?, current?);

        debug!(
            app = %request.app_name,
            profile_type = %request.profile_type,
            baseline_functions = baseline.functions.len(),
            current_functions = current.functions.len(),
            thresholds = thresholds.len(),
            "Computing diff"
        );

        let report = Self::build(request, &baseline.functions, &current.functions, &thresholds);
        info!(
            app = %report.app_name,
            profile_type = %report.profile_type,
            regressions = report.summary.regressions_count,
            improvements = report.summary.improvements_count,
            breaches = report.summary.threshold_breaches,
            "Diff report ready"
        );
        Ok(report)
    }

    /// Audit record for the history store
    pub fn history_record(&self) -> TriageRecord {
        let breaches = self.summary.threshold_breaches;
        let regressions = self.summary.regressions_count;

        let (diagnosis, recommendation) = if regressions == 0 {
            ("no_regressions", "No regressions detected in deployment diff".to_string())
        } else {
            (
                "regressions_detected",
                format!("{} regressions, {} threshold breaches", regressions, breaches),
            )
        };
        let severity = if breaches > 0 {
            "high"
        } else if regressions > 0 {
            "medium"
        } else {
            "low"
        };

        TriageRecord {
            app_name: self.app_name.clone(),
            profile_types: self.profile_type.to_string(),
            diagnosis: diagnosis.to_string(),
            severity: severity.to_string(),
            recommendation,
            top_functions: serde_json::to_value(&self.summary).unwrap_or(serde_json::Value::Null),
            requested_by: None,
        }
    }

    /// Render as a markdown document for pasting into tickets or chat
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let _ = writeln!(md, "# Diff Report: {}\n", self.app_name);
        let _ = writeln!(md, "**Profile**: {}", self.profile_type);
        let _ = writeln!(
            md,
            "**Baseline**: {} - {}",
            format_epoch(self.baseline.from),
            format_epoch(self.baseline.to)
        );
        let _ = writeln!(
            md,
            "**Current**: {} - {}\n",
            format_epoch(self.current.from),
            format_epoch(self.current.to)
        );

        if !self.regressions.is_empty() {
            md.push_str("## Regressions\n\n");
            md.push_str("| Function | Baseline | Current | Change | Threshold |\n");
            md.push_str("|----------|----------|---------|--------|-----------|\n");
            for r in &self.regressions {
                let threshold = match (r.threshold, r.exceeds_threshold()) {
                    (Some(t), Some(true)) => format!("{}% BREACH", round2(t)),
                    (Some(t), _) => format!("{}%", round2(t)),
                    (None, _) => "-".to_string(),
                };
                let _ = writeln!(
                    md,
                    "| {} | {}% | {}% | +{}% | {} |",
                    short_name(&r.name),
                    round2(r.baseline_percent),
                    round2(r.current_percent),
                    round2(r.delta),
                    threshold
                );
            }
            md.push('\n');
        }

        if !self.improvements.is_empty() {
            md.push_str("## Improvements\n\n");
            md.push_str("| Function | Baseline | Current | Change |\n");
            md.push_str("|----------|----------|---------|--------|\n");
            for i in &self.improvements {
                let _ = writeln!(
                    md,
                    "| {} | {}% | {}% | {}% |",
                    short_name(&i.name),
                    round2(i.baseline_percent),
                    round2(i.current_percent),
                    round2(i.delta)
                );
            }
            md.push('\n');
        }

        md.push_str("## Summary\n\n");
        let _ = writeln!(md, "- {} regressions", self.summary.regressions_count);
        let _ = writeln!(md, "- {} improvements", self.summary.improvements_count);
        if self.summary.threshold_breaches > 0 {
            let _ = writeln!(md, "- {} threshold breaches", self.summary.threshold_breaches);
        }
        if let Some(top) = self.regressions.first() {
            let _ = writeln!(md, "- Top regression: `{}` (+{}%)", short_name(&top.name), round2(top.delta));
        }
        md
    }
}
