pub mod analytics_handlers;
pub mod health_handlers;
