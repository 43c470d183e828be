//! Triage rule table
//!
//! Each profile category has an ordered list of substring rules checked against the hottest
//! few functions; the first rule with a matching pattern names the diagnosis, otherwise the
//! category default applies.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::profile::{FunctionSample, ProfileType};

/// Only this many of the hottest functions are inspected
pub const TOP_FUNCTIONS_CHECKED: usize = 5;

/// Top self-percent above which severity is high
pub const HIGH_SEVERITY_PERCENT: f64 = 30.0;

/// Top self-percent above which severity is medium
pub const MEDIUM_SEVERITY_PERCENT: f64 = 10.0;

/// Dominant performance issue for one profile category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagnosis {
    GcPressure,
    ThreadWaiting,
    LockContention,
    JitOverhead,
    CpuBound,
    StringAllocation,
    CollectionResizing,
    DeserializationOverhead,
    AllocationPressure,
    IdleTime,
    NetworkIo,
    MixedWorkload,
    NoData,
    Healthy,
    Unavailable,
    Unknown,
}

impl Diagnosis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Diagnosis::GcPressure => "gc_pressure",
            Diagnosis::ThreadWaiting => "thread_waiting",
            Diagnosis::LockContention => "lock_contention",
            Diagnosis::JitOverhead => "jit_overhead",
            Diagnosis::CpuBound => "cpu_bound",
            Diagnosis::StringAllocation => "string_allocation",
            Diagnosis::CollectionResizing => "collection_resizing",
            Diagnosis::DeserializationOverhead => "deserialization_overhead",
            Diagnosis::AllocationPressure => "allocation_pressure",
            Diagnosis::IdleTime => "idle_time",
            Diagnosis::NetworkIo => "network_io",
            Diagnosis::MixedWorkload => "mixed_workload",
            Diagnosis::NoData => "no_data",
            Diagnosis::Healthy => "healthy",
            Diagnosis::Unavailable => "unavailable",
            Diagnosis::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tags from other producers may not be known here; they read as `Unknown`.
impl FromStr for Diagnosis {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "gc_pressure" => Diagnosis::GcPressure,
            "thread_waiting" => Diagnosis::ThreadWaiting,
            "lock_contention" => Diagnosis::LockContention,
            "jit_overhead" => Diagnosis::JitOverhead,
            "cpu_bound" => Diagnosis::CpuBound,
            "string_allocation" => Diagnosis::StringAllocation,
            "collection_resizing" => Diagnosis::CollectionResizing,
            "deserialization_overhead" => Diagnosis::DeserializationOverhead,
            "allocation_pressure" => Diagnosis::AllocationPressure,
            "idle_time" => Diagnosis::IdleTime,
            "network_io" => Diagnosis::NetworkIo,
            "mixed_workload" => Diagnosis::MixedWorkload,
            "no_data" => Diagnosis::NoData,
            "healthy" => Diagnosis::Healthy,
            "unavailable" => Diagnosis::Unavailable,
            _ => Diagnosis::Unknown,
        })
    }
}

/// Three-tier severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any pattern matching any inspected function name selects `diagnosis`
#[derive(Debug)]
pub struct Rule {
    pub patterns: &'static [&'static str],
    pub diagnosis: Diagnosis,
}

/// Ordered rules for one category plus its fallback
#[derive(Debug)]
pub struct CategoryRules {
    pub rules: &'static [Rule],
    pub default: Diagnosis,
}

const CPU_RULES: CategoryRules = CategoryRules {
    rules: &[
        Rule {
            patterns: &["GC", "gc_", "G1", "ParallelGC", "ZGC"],
            diagnosis: Diagnosis::GcPressure,
        },
        Rule {
            patterns: &["park", "sleep", "Object.wait", "Unsafe.park"],
            diagnosis: Diagnosis::ThreadWaiting,
        },
        Rule {
            patterns: &["synchronized", "ReentrantLock", "monitor"],
            diagnosis: Diagnosis::LockContention,
        },
        Rule {
            patterns: &["Compiler", "C1", "C2", "compile"],
            diagnosis: Diagnosis::JitOverhead,
        },
    ],
    default: Diagnosis::CpuBound,
};

const ALLOC_RULES: CategoryRules = CategoryRules {
    rules: &[
        Rule {
            patterns: &["StringBuilder", "concat", "toString", "String.format"],
            diagnosis: Diagnosis::StringAllocation,
        },
        Rule {
            patterns: &["ArrayList", "HashMap", "resize", "grow", "Arrays.copyOf"],
            diagnosis: Diagnosis::CollectionResizing,
        },
        Rule {
            patterns: &["read", "decode", "parse", "deserialize", "Jackson", "Gson", "ObjectMapper"],
            diagnosis: Diagnosis::DeserializationOverhead,
        },
    ],
    default: Diagnosis::AllocationPressure,
};

// Lock profiles have no sub-classification
const LOCK_RULES: CategoryRules = CategoryRules {
    rules: &[],
    default: Diagnosis::LockContention,
};

const WALL_RULES: CategoryRules = CategoryRules {
    rules: &[
        Rule {
            patterns: &["sleep", "wait", "park", "idle"],
            diagnosis: Diagnosis::IdleTime,
        },
        Rule {
            patterns: &["socket", "connect", "dns", "InputStream.read", "OutputStream.write", "SocketChannel"],
            diagnosis: Diagnosis::NetworkIo,
        },
    ],
    default: Diagnosis::MixedWorkload,
};

pub fn rules_for(profile_type: ProfileType) -> &'static CategoryRules {
    match profile_type {
        ProfileType::Cpu => &CPU_RULES,
        ProfileType::Alloc => &ALLOC_RULES,
        ProfileType::Lock => &LOCK_RULES,
        ProfileType::Wall => &WALL_RULES,
    }
}

impl Rule {
    /// Case-sensitive substring match against the inspected names
    fn matches(&self, names: &[&str]) -> bool {
        names
            .iter()
            .any(|name| self.patterns.iter().any(|pattern| name.contains(pattern)))
    }
}

/// Classify a ranked function list (hottest first).
pub fn diagnose(profile_type: ProfileType, functions: &[FunctionSample]) -> Diagnosis {
    if functions.is_empty() {
        return Diagnosis::NoData;
    }

    let names: Vec<&str> = functions
        .iter()
        .take(TOP_FUNCTIONS_CHECKED)
        .map(|f| f.name.as_str())
        .collect();

    let table = rules_for(profile_type);
    table
        .rules
        .iter()
        .find(|rule| rule.matches(&names))
        .map(|rule| rule.diagnosis)
        .unwrap_or(table.default)
}

/// Human-readable advice for a diagnosis, naming the top function.
pub fn recommend(diagnosis: Diagnosis, top_function: Option<&str>) -> String {
    let Some(top) = top_function else {
        return "No profile data available for this type".to_string();
    };

    let advice = match diagnosis {
        Diagnosis::GcPressure => "GC activity in CPU profile: check heap sizing (-Xmx) and reduce allocation rate",
        Diagnosis::ThreadWaiting => "Threads spending CPU in wait/park: possible thread pool exhaustion",
        Diagnosis::LockContention => "Lock contention: review synchronized blocks, consider ConcurrentHashMap",
        Diagnosis::JitOverhead => "JIT compilation overhead: service may need warmup time",
        Diagnosis::CpuBound => "CPU-bound processing: review algorithmic complexity or add caching",
        Diagnosis::StringAllocation => "High string allocation: use StringBuilder and avoid concatenation in loops",
        Diagnosis::CollectionResizing => "Collection resizing: pre-size collections with expected capacity",
        Diagnosis::DeserializationOverhead => "Deserialization allocation: consider streaming parsers or object pooling",
        Diagnosis::AllocationPressure => "High allocation rate: review object creation patterns",
        Diagnosis::NetworkIo => "Network I/O dominates wall-clock time: check upstream latency and timeouts",
        Diagnosis::IdleTime => "Significant idle time: thread pool may be oversized",
        Diagnosis::MixedWorkload => "Mixed workload: no single dominant bottleneck",
        Diagnosis::NoData | Diagnosis::Healthy | Diagnosis::Unavailable | Diagnosis::Unknown => {
            "Review top functions for optimization"
        }
    };
    format!("{}. Top: {}", advice, top)
}

/// `>30` high, `>10` medium, otherwise low
pub fn severity(max_self_percent: f64) -> Severity {
    if max_self_percent > HIGH_SEVERITY_PERCENT {
        Severity::High
    } else if max_self_percent > MEDIUM_SEVERITY_PERCENT {
        Severity::Medium
    } else {
        Severity::Low
    }
}
