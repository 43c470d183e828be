pub mod pyroscope;
pub mod types;

use async_trait::async_trait;

use crate::profile::{decode_render, ProfileSnapshot, ProfileType, RenderResponse, TimeWindow};

pub use pyroscope::PyroscopeClient;
pub use types::{ApiError, BackendConfig};

/// Primary profile data source
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Render a metric query over a window into a decode-ready call tree
    async fn render(&self, query: &str, window: TimeWindow) -> Result<RenderResponse, ApiError>;

    /// List application names that reported profiles during the window
    async fn discover_apps(&self, window: TimeWindow) -> Result<Vec<String>, ApiError>;
}

/// Render and decode one application's profile.
pub async fn fetch_profile(
    source: &dyn ProfileSource,
    app_name: &str,
    profile_type: ProfileType,
    window: TimeWindow,
    limit: usize,
) -> Result<ProfileSnapshot, ApiError> {
    let raw = source.render(&profile_type.query_for(app_name), window).await?;
    let functions = decode_render(&raw, limit);
    let total_samples = functions.first().map(|f| f.total_ticks).unwrap_or(0);

    Ok(ProfileSnapshot {
        app_name: app_name.to_string(),
        profile_type,
        from: window.from,
        to: window.to,
        total_samples,
        functions,
    })
}
