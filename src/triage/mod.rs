pub mod report;
pub mod rules;

pub use report::{
    check_baselines, BaselineViolation, CategoryAnalysis, CategoryResult, TriageReport, TriageRequest, TriageSummary,
    DEFAULT_TRIAGE_LIMIT, DEFAULT_TRIAGE_TYPES,
};
pub use rules::{diagnose, recommend, rules_for, severity, Diagnosis, Severity};
