pub mod engine;
pub mod report;

pub use engine::{
    compute_deltas, compute_deltas_with_thresholds, split_by_direction, to_percent_map, DiffEntry, PercentMap,
    NOISE_FLOOR_PERCENT,
};
pub use report::{short_name, DiffReport, DiffRequest, DiffSummary, DEFAULT_DIFF_LIMIT, DIFF_DECODE_LIMIT};
