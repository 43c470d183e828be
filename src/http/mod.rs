//! HTTP surface
//!
//! Every route is a GET with its parameters in the query string. Handlers never
//! reject: failures are rendered as `{"error": ...}` with the mapped status.

pub mod handlers;
pub mod params;

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use tracing::info;
use warp::Filter;

use crate::access::DataAccess;
use crate::fleet::FleetOrchestrator;
use crate::health::{self, HealthDependencies};
use crate::history::HistoryHandle;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub access: DataAccess,
    pub fleet: FleetOrchestrator,
    pub history: HistoryHandle,
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// All API routes plus `/health` and `/ready`
pub fn routes(
    state: AppState,
    health_deps: HealthDependencies,
    timeout_seconds: u64,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    // Must be matched before `/profiles/{app}`
    let list_apps = warp::path!("profiles" / "apps")
        .and(warp::get())
        .and(warp::query::<params::WindowQuery>())
        .and(with_state(state.clone()))
        .and_then(handlers::list_apps);

    let profile = warp::path!("profiles" / String)
        .and(warp::get())
        .and(warp::query::<params::ProfileQuery>())
        .and(with_state(state.clone()))
        .and_then(handlers::get_profile);

    let diff = warp::path!("diff" / String)
        .and(warp::get())
        .and(warp::query::<params::DiffQuery>())
        .and(with_state(state.clone()))
        .and_then(handlers::get_diff);

    let triage = warp::path!("triage" / String)
        .and(warp::get())
        .and(warp::query::<params::TriageQuery>())
        .and(with_state(state.clone()))
        .and_then(handlers::get_triage);

    let search = warp::path!("search")
        .and(warp::get())
        .and(warp::query::<params::SearchQuery>())
        .and(with_state(state.clone()))
        .and_then(handlers::search);

    let hotspots = warp::path!("fleet" / "hotspots")
        .and(warp::get())
        .and(warp::query::<params::HotspotQuery>())
        .and(with_state(state))
        .and_then(handlers::hotspots);

    list_apps
        .or(profile)
        .or(diff)
        .or(triage)
        .or(search)
        .or(hotspots)
        .or(health::routes(health_deps, timeout_seconds))
        .with(warp::trace::request())
        .recover(handlers::handle_rejection)
}

/// Bind and serve until Ctrl+C
pub async fn serve(
    host: &str,
    port: u16,
    state: AppState,
    health_deps: HealthDependencies,
    timeout_seconds: u64,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ip: IpAddr = host.parse()?;
    let addr = SocketAddr::new(ip, port);

    let (bound, server) = warp::serve(routes(state, health_deps, timeout_seconds))
        .try_bind_with_graceful_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("🛑 Shutdown signal received");
        })?;

    info!("🌐 Listening on http://{}", bound);
    server.await;
    info!("🏁 Graceful shutdown completed");
    Ok(())
}
