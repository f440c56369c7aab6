use actix_web::{HttpResponse, ResponseError, http::StatusCode};

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Analytics store error")]
    Store(#[from] anyhow::Error),
}

impl ResponseError for AnalyticsError {
    fn status_code(&self) -> StatusCode {
        match self {
            AnalyticsError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AnalyticsError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Store details stay in the logs
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }))
    }
}

impl From<validator::ValidationErrors> for AnalyticsError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AnalyticsError::InvalidInput(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn store_errors_hide_details() {
        let err = AnalyticsError::from(anyhow::anyhow!("connection refused on 10.0.0.5"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Analytics store error");
    }

    #[test]
    fn invalid_input_is_client_error() {
        let err = AnalyticsError::InvalidInput("ipAddress is required".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid input: ipAddress is required");
    }
}
