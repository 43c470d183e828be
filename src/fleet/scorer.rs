//! Cross-service hotspot scoring

use super::structs::{HotspotEntry, ServiceObservation};

/// Rank functions by `observation count * worst self-percent`, highest first.
///
/// Observations are counted as given; duplicate apps are the caller's problem.
/// Equal scores fall back to function name so output order is stable.
pub fn rank_hotspots<I>(function_to_services: I, limit: usize) -> Vec<HotspotEntry>
where
    I: IntoIterator<Item = (String, Vec<ServiceObservation>)>,
{
    let mut hotspots: Vec<HotspotEntry> = function_to_services
        .into_iter()
        .map(|(function, services)| {
            let max_self_percent = services.iter().map(|s| s.self_percent).fold(0.0, f64::max);
            let service_count = services.len();
            HotspotEntry {
                function,
                service_count,
                critical_service_count: services.iter().filter(|s| s.is_critical()).count(),
                max_self_percent,
                impact_score: service_count as f64 * max_self_percent,
                services,
            }
        })
        .collect();

    hotspots.sort_by(|a, b| {
        b.impact_score
            .total_cmp(&a.impact_score)
            .then_with(|| a.function.cmp(&b.function))
    });
    hotspots.truncate(limit);
    hotspots
}
