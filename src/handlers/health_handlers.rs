use actix_web::{HttpResponse, web};
use log::error;

use crate::state::app_state::AppState;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    // Ping the store so the check reflects the dependency, not just the process
    match state.store.ping().await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => {
            error!("Health check failed: {e:#}");
            HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "error": "Analytics store unavailable" }))
        }
    }
}
