use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use cabo_concierge_api::config::AppConfig;
use cabo_concierge_api::db::{mongo::create_mongo_client, MongoStore};
use cabo_concierge_api::middleware::auth::JwtConfig;
use cabo_concierge_api::routes;
use cabo_concierge_api::services::stripe::{StripeConfig, StripeProvider};
use cabo_concierge_api::state::AppState;

fn startup_error(err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

fn cors(origin: Option<&str>) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(3600);
    match origin {
        Some(origin) => cors.allowed_origin(origin),
        None => cors.allow_any_origin(),
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    }

    env_logger::init_from_env(Env::default().default_filter_or("info"));
    log::info!("Application starting...");

    let config = AppConfig::from_env().map_err(startup_error)?;

    let client = create_mongo_client(&config.mongodb_uri)
        .await
        .map_err(startup_error)?;
    let store = Arc::new(MongoStore::new(client, config.mongodb_database.clone()));
    if let Err(e) = store.ensure_indexes().await {
        log::error!("Failed to create booking indexes: {}", e);
        return Err(startup_error(e));
    }
    log::info!("MongoDB connection established");

    let payments = Arc::new(StripeProvider::new(config.stripe_secret_key.clone()));

    let state = AppState::new(store.clone(), store, payments);
    let jwt = JwtConfig {
        secret: config.jwt_secret.clone(),
    };
    let stripe_config = StripeConfig {
        webhook_secret: config.stripe_webhook_secret.clone(),
    };
    let cors_origin = config.cors_origin.clone();

    log::info!("Starting HTTP server on {}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(cors(cors_origin.as_deref()))
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(jwt.clone()))
            .app_data(web::Data::new(stripe_config.clone()))
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
