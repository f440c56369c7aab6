use actix_web::{HttpResponse, error, web};

use crate::handlers::analytics_handlers::{
    get_overview, get_recent_visitors, get_top_pages, get_visitor_distribution, track_visitor,
    update_page_time,
};
use crate::handlers::health_handlers::health_check;

fn bad_request(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "success": false,
        "error": message,
    }))
}

/// Configure the routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // Malformed bodies and query strings get the same error shape as handlers
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        let response = bad_request(format!("Invalid JSON body: {}", err));
        error::InternalError::from_response(err, response).into()
    }));
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        let response = bad_request(format!("Invalid query string: {}", err));
        error::InternalError::from_response(err, response).into()
    }));

    cfg.service(
        web::scope("/analytics")
            .route("/health", web::get().to(health_check))
            // Ingestion, called by the tracking snippet
            .route("/track-visitor", web::post().to(track_visitor))
            .route("/update-page-time", web::put().to(update_page_time))
            // Dashboard queries
            .route("/overview", web::get().to(get_overview))
            .route("/visitor-distribution", web::get().to(get_visitor_distribution))
            .route("/recent-visitors", web::get().to(get_recent_visitors))
            .route("/top-pages", web::get().to(get_top_pages)),
    );
}
