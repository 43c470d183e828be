use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::profile::FunctionSample;

/// Changes at or below this many percentage points are treated as sampling noise.
pub const NOISE_FLOOR_PERCENT: f64 = 0.1;

/// Function name -> self percent for one window
pub type PercentMap = FxHashMap<String, f64>;

/// Change in one function's self percent between two windows
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    pub name: String,
    pub baseline_percent: f64,
    pub current_percent: f64,
    pub delta: f64,
    /// Approved maximum from the baseline store, when one exists
    pub threshold: Option<f64>,
}

impl DiffEntry {
    pub fn is_regression(&self) -> bool {
        self.delta > 0.0
    }

    pub fn is_improvement(&self) -> bool {
        self.delta < 0.0
    }

    /// `None` when no threshold applies
    pub fn exceeds_threshold(&self) -> Option<bool> {
        self.threshold.map(|t| self.current_percent > t)
    }
}

pub fn to_percent_map(functions: &[FunctionSample]) -> PercentMap {
    functions.iter().map(|f| (f.name.clone(), f.self_percent)).collect()
}

/// Ranked deltas between two windows, largest absolute change first.
pub fn compute_deltas(baseline: &PercentMap, current: &PercentMap, limit: usize) -> Vec<DiffEntry> {
    compute_deltas_with_thresholds(baseline, current, &FxHashMap::default(), limit)
}

/// [`compute_deltas`] with each entry carrying its baseline threshold, if any.
///
/// A function present in only one window is compared against 0% in the other.
pub fn compute_deltas_with_thresholds(
    baseline: &PercentMap,
    current: &PercentMap,
    thresholds: &FxHashMap<String, f64>,
    limit: usize,
) -> Vec<DiffEntry> {
    // Sorted union so equal deltas keep name order after the stable sort
    let names: BTreeSet<&String> = baseline.keys().chain(current.keys()).collect();

    let mut entries: Vec<DiffEntry> = names
        .into_iter()
        .filter_map(|name| {
            let baseline_percent = baseline.get(name).copied().unwrap_or(0.0);
            let current_percent = current.get(name).copied().unwrap_or(0.0);
            let delta = current_percent - baseline_percent;
            if delta.abs() <= NOISE_FLOOR_PERCENT {
                return None;
            }
            Some(DiffEntry {
                name: name.clone(),
                baseline_percent,
                current_percent,
                delta,
                threshold: thresholds.get(name).copied(),
            })
        })
        .collect();

    entries.sort_by(|a, b| b.delta.abs().total_cmp(&a.delta.abs()));
    entries.truncate(limit);
    entries
}

/// Split ranked entries into (regressions, improvements), keeping rank order.
///
/// Entries with no change belong to neither side.
pub fn split_by_direction(entries: Vec<DiffEntry>) -> (Vec<DiffEntry>, Vec<DiffEntry>) {
    let (regressions, rest): (Vec<DiffEntry>, Vec<DiffEntry>) = entries.into_iter().partition(DiffEntry::is_regression);
    let improvements = rest.into_iter().filter(DiffEntry::is_improvement).collect();
    (regressions, improvements)
}
