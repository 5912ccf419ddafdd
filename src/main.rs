use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;

use pixel_gallery::api::{self, AppState};
use pixel_gallery::config::Config;
use pixel_gallery::store::Store;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    // Opened once and shared by every worker
    let store = Arc::new(Store::new(&config.database_path).map_err(|e| {
        log::error!("Failed to initialize database {}: {}", config.database_path, e);
        std::io::Error::new(std::io::ErrorKind::Other, e)
    })?);

    log::info!("Database: {}", config.database_path);
    log::info!("Public base URL: {}", config.api_base_url);
    if config.debug_routes {
        log::warn!("Debug routes are enabled");
    }

    let base_url = config.api_base_url.clone();
    let debug_routes = config.debug_routes;

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(AppState::new(store.clone(), &base_url)))
            .configure(|cfg| api::configure_app(cfg, debug_routes))
    });

    log::info!("Starting pixel-gallery server on port {}", config.port);

    server.bind(("0.0.0.0", config.port))?.run().await
}
