//! Query-string shapes and their defaults

use serde::Deserialize;

use crate::errors::TriageError;
use crate::profile::{EpochSeconds, ProfileType, TimeWindow};

/// Functions returned by `/profiles/{app}` when no limit is given
pub const DEFAULT_PROFILE_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub from: Option<EpochSeconds>,
    pub to: Option<EpochSeconds>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    #[serde(rename = "type")]
    pub profile_type: Option<String>,
    pub from: Option<EpochSeconds>,
    pub to: Option<EpochSeconds>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffQuery {
    #[serde(rename = "type")]
    pub profile_type: Option<String>,
    pub from: Option<EpochSeconds>,
    pub to: Option<EpochSeconds>,
    pub baseline_from: Option<EpochSeconds>,
    pub baseline_to: Option<EpochSeconds>,
    pub limit: Option<usize>,
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TriageQuery {
    pub types: Option<String>,
    pub from: Option<EpochSeconds>,
    pub to: Option<EpochSeconds>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub function: Option<String>,
    #[serde(rename = "type")]
    pub profile_type: Option<String>,
    pub from: Option<EpochSeconds>,
    pub to: Option<EpochSeconds>,
    pub apps: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HotspotQuery {
    #[serde(rename = "type")]
    pub profile_type: Option<String>,
    pub from: Option<EpochSeconds>,
    pub to: Option<EpochSeconds>,
    pub limit: Option<usize>,
    pub apps: Option<String>,
}

/// Output format of `/diff/{app}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffFormat {
    Json,
    Markdown,
}

impl DiffQuery {
    /// Anything other than `markdown` (or `md`) renders JSON
    pub fn format(&self) -> DiffFormat {
        match self.format.as_deref().map(str::trim) {
            Some(f) if f.eq_ignore_ascii_case("markdown") || f.eq_ignore_ascii_case("md") => DiffFormat::Markdown,
            _ => DiffFormat::Json,
        }
    }
}

/// Blank or absent means cpu; anything else must name a known category.
pub fn profile_type_or_cpu(raw: Option<&str>) -> Result<ProfileType, TriageError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(ProfileType::Cpu),
        Some(value) => value.parse(),
    }
}

/// The hour ending `to` (default `now`) unless `from` is given.
pub fn window_or_last_hour(
    from: Option<EpochSeconds>,
    to: Option<EpochSeconds>,
    now: EpochSeconds,
) -> Result<TimeWindow, TriageError> {
    let to = to.unwrap_or(now);
    let from = from.unwrap_or(to.saturating_sub(3600));
    if from > to {
        return Err(TriageError::BadRequest(format!(
            "'from' ({}) must not be after 'to' ({})",
            from, to
        )));
    }
    Ok(TimeWindow::new(from, to))
}

/// A limit of 0 is treated as a malformed request
pub fn positive_limit(limit: Option<usize>) -> Result<Option<usize>, TriageError> {
    match limit {
        Some(0) => Err(TriageError::BadRequest("'limit' must be at least 1".to_string())),
        other => Ok(other),
    }
}
