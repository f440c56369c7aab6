use actix_web::{HttpRequest, HttpResponse, Result, http, web};
use log::{debug, error, warn};
use mongodb::bson::oid::ObjectId;
use validator::Validate;

use crate::models::visitor::{DEFAULT_DEVICE, UNKNOWN, UNKNOWN_COUNTRY_CODE, VisitorProfile};
use crate::services::error::AnalyticsError;
use crate::services::identity_resolver::{Observation, resolve_visitor};
use crate::services::page_view_recorder::{patch_time_on_page, record_page_view};
use crate::services::window_queries;
use crate::state::app_state::AppState;
use crate::structs::analytics::{
    LimitParams, TimeRangeParams, TopPagesParams, TrackVisitorRequest, TrackVisitorResponse,
    UpdatePageTimeRequest, clamp_limit,
};

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn log_failure(operation: &str, err: &AnalyticsError) {
    match err {
        AnalyticsError::Store(e) => error!("{operation} failed: {e:#}"),
        AnalyticsError::InvalidInput(msg) => warn!("{operation} rejected: {msg}"),
    }
}

/// Record one navigation: resolve the visitor, then append the page view.
pub async fn track_visitor(
    app_state: web::Data<AppState>,
    req: HttpRequest,
    web::Json(mut body): web::Json<TrackVisitorRequest>,
) -> Result<HttpResponse, AnalyticsError> {
    // Whitespace-only addresses count as missing
    body.ip_address = body.ip_address.trim().to_string();
    body.validate()?;

    // Fall back to the browser's own header when the snippet omits it
    let header_agent = req
        .headers()
        .get(http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let observation = Observation {
        ip_address: body.ip_address,
        device_id: body.device_id.filter(|d| !d.trim().is_empty()),
        profile: VisitorProfile {
            country: or_default(body.country, UNKNOWN),
            city: or_default(body.city, UNKNOWN),
            country_code: or_default(body.country_code, UNKNOWN_COUNTRY_CODE),
            device: or_default(body.device, DEFAULT_DEVICE),
            browser: or_default(body.browser, UNKNOWN),
            user_agent: or_default(body.user_agent.or(header_agent), UNKNOWN),
        },
    };

    let visitor = resolve_visitor(&app_state, observation)
        .await
        .inspect_err(|e| log_failure("track-visitor", e))?;
    let page_view_id = record_page_view(&app_state, &visitor, body.path, body.referrer)
        .await
        .inspect_err(|e| log_failure("track-visitor", e))?;
    debug!(
        "Tracked {} (new: {}, migrated: {})",
        visitor.unique_visitor_id, visitor.is_new, visitor.migrated
    );

    Ok(HttpResponse::Ok().json(TrackVisitorResponse {
        success: true,
        visitor_id: visitor.id.to_hex(),
        unique_visitor_id: visitor.unique_visitor_id,
        is_new_device: visitor.is_new,
        page_view_id: page_view_id.to_hex(),
    }))
}

/// Exit beacon: patch dwell time onto the matching page view.
pub async fn update_page_time(
    app_state: web::Data<AppState>,
    web::Json(body): web::Json<UpdatePageTimeRequest>,
) -> Result<HttpResponse, AnalyticsError> {
    body.validate()?;
    let visitor_id = ObjectId::parse_str(&body.visitor_id)
        .map_err(|_| AnalyticsError::InvalidInput("Invalid visitorId format".to_string()))?;

    patch_time_on_page(&app_state, visitor_id, &body.path, body.time_on_page)
        .await
        .inspect_err(|e| log_failure("update-page-time", e))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

pub async fn get_overview(
    app_state: web::Data<AppState>,
    query: web::Query<TimeRangeParams>,
) -> Result<HttpResponse, AnalyticsError> {
    let overview = window_queries::overview(&app_state, query.time_range)
        .await
        .inspect_err(|e| log_failure("overview", e))?;
    Ok(HttpResponse::Ok().json(overview))
}

pub async fn get_visitor_distribution(
    app_state: web::Data<AppState>,
    query: web::Query<TimeRangeParams>,
) -> Result<HttpResponse, AnalyticsError> {
    let distribution = window_queries::visitor_distribution(&app_state, query.time_range)
        .await
        .inspect_err(|e| log_failure("visitor-distribution", e))?;
    Ok(HttpResponse::Ok().json(distribution))
}

pub async fn get_recent_visitors(
    app_state: web::Data<AppState>,
    query: web::Query<LimitParams>,
) -> Result<HttpResponse, AnalyticsError> {
    let visitors = window_queries::recent_visitors(&app_state, clamp_limit(query.limit))
        .await
        .inspect_err(|e| log_failure("recent-visitors", e))?;
    Ok(HttpResponse::Ok().json(visitors))
}

pub async fn get_top_pages(
    app_state: web::Data<AppState>,
    query: web::Query<TopPagesParams>,
) -> Result<HttpResponse, AnalyticsError> {
    let pages =
        window_queries::top_pages(&app_state, query.time_range, clamp_limit(query.limit))
            .await
            .inspect_err(|e| log_failure("top-pages", e))?;
    Ok(HttpResponse::Ok().json(pages))
}
