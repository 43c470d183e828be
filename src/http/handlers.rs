use std::convert::Infallible;

use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};
use warp::http::StatusCode;
use warp::reply::{Reply, Response};

use super::params::{
    positive_limit, profile_type_or_cpu, window_or_last_hour, DiffFormat, DiffQuery, HotspotQuery, ProfileQuery,
    SearchQuery, TriageQuery, WindowQuery, DEFAULT_PROFILE_LIMIT,
};
use super::AppState;
use crate::diff::{DiffReport, DiffRequest};
use crate::errors::TriageError;
use crate::fleet::parse_app_list;
use crate::triage::{TriageReport, TriageRequest, DEFAULT_TRIAGE_LIMIT, DEFAULT_TRIAGE_TYPES};

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn json_reply<T: Serialize>(body: &T) -> Response {
    warp::reply::json(body).into_response()
}

/// `{"error": message}` with the status the error maps to
pub fn error_reply(err: &TriageError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        warn!("Rejected request: {}", err);
    }
    warp::reply::with_status(warp::reply::json(&json!({ "error": err.to_string() })), status).into_response()
}

fn respond(result: Result<Response, TriageError>) -> Result<Response, Infallible> {
    Ok(result.unwrap_or_else(|e| error_reply(&e)))
}

/// GET /profiles/apps
pub async fn list_apps(query: WindowQuery, state: AppState) -> Result<Response, Infallible> {
    respond(apps(query, &state).await)
}

/// GET /profiles/{app}
pub async fn get_profile(app: String, query: ProfileQuery, state: AppState) -> Result<Response, Infallible> {
    respond(profile(app, query, &state).await)
}

/// GET /diff/{app}
pub async fn get_diff(app: String, query: DiffQuery, state: AppState) -> Result<Response, Infallible> {
    respond(diff(app, query, &state).await)
}

/// GET /triage/{app}
pub async fn get_triage(app: String, query: TriageQuery, state: AppState) -> Result<Response, Infallible> {
    respond(triage(app, query, &state).await)
}

/// GET /search
pub async fn search(query: SearchQuery, state: AppState) -> Result<Response, Infallible> {
    respond(fleet_search(query, &state).await)
}

/// GET /fleet/hotspots
pub async fn hotspots(query: HotspotQuery, state: AppState) -> Result<Response, Infallible> {
    respond(fleet_hotspots(query, &state).await)
}

async fn apps(query: WindowQuery, state: &AppState) -> Result<Response, TriageError> {
    let window = window_or_last_hour(query.from, query.to, now())?;
    let apps = state.access.discover_apps(window).await?;
    Ok(json_reply(&json!({
        "from": window.from,
        "to": window.to,
        "count": apps.len(),
        "apps": apps
    })))
}

async fn profile(app: String, query: ProfileQuery, state: &AppState) -> Result<Response, TriageError> {
    let profile_type = profile_type_or_cpu(query.profile_type.as_deref())?;
    let window = window_or_last_hour(query.from, query.to, now())?;
    let limit = positive_limit(query.limit)?.unwrap_or(DEFAULT_PROFILE_LIMIT);

    let snapshot = state.access.fetch_profile(&app, profile_type, window, limit).await?;
    Ok(json_reply(&snapshot))
}

async fn diff(app: String, query: DiffQuery, state: &AppState) -> Result<Response, TriageError> {
    let profile_type = profile_type_or_cpu(query.profile_type.as_deref())?;
    let request = DiffRequest::resolve(
        app,
        profile_type,
        now(),
        query.from,
        query.to,
        query.baseline_from,
        query.baseline_to,
        positive_limit(query.limit)?,
    );
    for window in [request.baseline, request.current] {
        if window.from > window.to {
            return Err(TriageError::BadRequest(format!(
                "window start ({}) must not be after its end ({})",
                window.from, window.to
            )));
        }
    }

    let report = DiffReport::run(&state.access, &request).await?;
    state.history.record(report.history_record()).await;

    Ok(match query.format() {
        DiffFormat::Markdown => {
            warp::reply::with_header(report.to_markdown(), "content-type", "text/markdown; charset=utf-8")
                .into_response()
        }
        DiffFormat::Json => json_reply(&report),
    })
}

async fn triage(app: String, query: TriageQuery, state: &AppState) -> Result<Response, TriageError> {
    let profile_types = TriageRequest::parse_types(query.types.as_deref().unwrap_or(DEFAULT_TRIAGE_TYPES))?;
    let request = TriageRequest {
        app_name: app,
        profile_types,
        window: window_or_last_hour(query.from, query.to, now())?,
        limit: positive_limit(query.limit)?.unwrap_or(DEFAULT_TRIAGE_LIMIT),
    };

    let report = TriageReport::run(&state.access, &request).await;
    state.history.record(report.history_record()).await;
    Ok(json_reply(&report))
}

async fn fleet_search(query: SearchQuery, state: &AppState) -> Result<Response, TriageError> {
    let function = query.function.as_deref().unwrap_or_default();
    let profile_type = profile_type_or_cpu(query.profile_type.as_deref())?;
    let window = window_or_last_hour(query.from, query.to, now())?;

    let result = state
        .fleet
        .search(function, profile_type, window, parse_app_list(query.apps.as_deref()))
        .await?;
    info!(
        query = %result.query,
        matches = result.match_count,
        apps = result.apps_queried,
        partial_failures = result.partial_failures,
        "Fleet search served"
    );
    Ok(json_reply(&result))
}

async fn fleet_hotspots(query: HotspotQuery, state: &AppState) -> Result<Response, TriageError> {
    let profile_type = profile_type_or_cpu(query.profile_type.as_deref())?;
    let window = window_or_last_hour(query.from, query.to, now())?;
    let limit = positive_limit(query.limit)?;

    let result = state
        .fleet
        .hotspots(profile_type, window, parse_app_list(query.apps.as_deref()), limit)
        .await?;
    Ok(json_reply(&result))
}

/// Map warp rejections (unknown route, bad query string) to JSON errors
pub async fn handle_rejection(err: warp::Rejection) -> Result<Response, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, format!("Invalid query string: {}", e))
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };

    Ok(warp::reply::with_status(warp::reply::json(&json!({ "error": message })), status).into_response())
}
