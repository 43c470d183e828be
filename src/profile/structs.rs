use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::errors::TriageError;

/// Epoch seconds
pub type EpochSeconds = i64;

/// Round a percentage to 2 decimal places for output.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Serde helper: emit an f64 rounded to 2 decimal places.
pub fn serialize_rounded<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round2(*value))
}

/// Profile category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
    Cpu,
    Alloc,
    Lock,
    Wall,
}

impl ProfileType {
    pub const ALL: [ProfileType; 4] = [ProfileType::Cpu, ProfileType::Alloc, ProfileType::Lock, ProfileType::Wall];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileType::Cpu => "cpu",
            ProfileType::Alloc => "alloc",
            ProfileType::Lock => "lock",
            ProfileType::Wall => "wall",
        }
    }

    /// Metric suffix the profiling backend stores this category under
    pub fn metric_suffix(&self) -> &'static str {
        match self {
            ProfileType::Cpu => "cpu",
            ProfileType::Alloc => "alloc_in_new_tlab_bytes",
            ProfileType::Lock => "lock_count",
            ProfileType::Wall => "wall",
        }
    }

    /// Backend query string for an application, e.g. `orders.cpu{}`
    pub fn query_for(&self, app_name: &str) -> String {
        format!("{}.{}{{}}", app_name, self.metric_suffix())
    }
}

impl FromStr for ProfileType {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(ProfileType::Cpu),
            "alloc" | "allocation" | "memory" => Ok(ProfileType::Alloc),
            "lock" | "mutex" | "contention" => Ok(ProfileType::Lock),
            "wall" | "wallclock" | "wall-clock" => Ok(ProfileType::Wall),
            _ => Err(TriageError::InvalidProfileType(s.to_string())),
        }
    }
}

impl fmt::Display for ProfileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive `[from, to]` query window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: EpochSeconds,
    pub to: EpochSeconds,
}

impl TimeWindow {
    pub fn new(from: EpochSeconds, to: EpochSeconds) -> Self {
        Self { from, to }
    }

    /// The hour ending at `to`
    pub fn hour_ending(to: EpochSeconds) -> Self {
        Self {
            from: to.saturating_sub(3600),
            to,
        }
    }
}

/// One function's aggregated samples from a single decode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSample {
    pub name: String,
    /// Samples where this function was the leaf, summed over every tree position
    pub self_samples: u64,
    /// Samples where this function was anywhere on the stack
    pub total_samples: u64,
    /// Root sample count of the decode this sample came from
    #[serde(skip)]
    pub total_ticks: u64,
    pub self_percent: f64,
}

/// Decoded profile for one application, category and window
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSnapshot {
    pub app_name: String,
    pub profile_type: ProfileType,
    pub from: EpochSeconds,
    pub to: EpochSeconds,
    pub total_samples: u64,
    pub functions: Vec<FunctionSample>,
}

impl ProfileSnapshot {
    pub fn top_function(&self) -> Option<&FunctionSample> {
        self.functions.first()
    }
}

/// Body of a backend render call
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenderResponse {
    #[serde(default)]
    pub flamebearer: Option<Flamebearer>,
}

/// Compacted call tree: each level is a flat run of `(offset, total, self, nameIndex)` groups
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flamebearer {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub levels: Vec<Vec<u64>>,
    #[serde(default)]
    pub num_ticks: u64,
}
