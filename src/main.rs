mod config;
mod db;
mod handlers;
mod models;
mod routes;
mod services;
mod state;
mod structs;
mod utils;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, http, middleware::Logger, web};
use dotenv::dotenv;
use env_logger::Env;
use log::{error, info, warn};

use crate::config::app_config::{AppConfig, StoreKind};
use crate::db::memory::MemoryStore;
use crate::db::mongodb::{MongoStore, get_database};
use crate::db::store::AnalyticsStore;
use crate::state::app_state::AppState;
use crate::utils::clock::SystemClock;
use routes::init_routes;

async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn AnalyticsStore>> {
    match config.store {
        StoreKind::MongoDb => {
            let db = get_database(config).await?;
            let store = MongoStore::new(db);
            store.ensure_indexes().await?;
            Ok(Arc::new(store))
        }
        StoreKind::Memory => {
            warn!("Using the in-memory analytics store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {e:#}");
            std::process::exit(1);
        }
    };

    // Initialize the event store
    let store = match build_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            error!("Error connecting to the analytics store: {e:#}");
            std::process::exit(1);
        }
    };

    // Create shared state
    let app_state = web::Data::new(AppState::new(store, Arc::new(SystemClock)));
    let origins = config.allowed_origins.clone();

    info!("Listening on {}:{}", config.bind_address, config.port);
    HttpServer::new(move || {
        let logger = Logger::new("%a \"%r\" %s %b \"%{Referer}i\" \"%{User-Agent}i\" %D ms");
        let cors = origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT"])
            .allowed_headers(vec![http::header::ACCEPT])
            .allowed_header(http::header::CONTENT_TYPE)
            .max_age(3600);
        App::new()
            .wrap(logger)
            .wrap(cors)
            .app_data(app_state.clone())
            .configure(init_routes)
    })
    .bind((config.bind_address.as_str(), config.port))?
    .run()
    .await
}
