use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info, warn};

use tour_booking_api::config::AppConfig;
use tour_booking_api::db::mongo::{create_mongo_client, ensure_indexes};
use tour_booking_api::routes;
use tour_booking_api::services::gemini_service::GeminiService;

fn io_error(err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    }

    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|err| {
        error!("Invalid configuration: {}", err);
        io_error(err)
    })?;

    let client = create_mongo_client(&config.mongo_uri).await.map_err(|err| {
        error!("Failed to create MongoDB client: {}", err);
        io_error(err)
    })?;
    if let Err(err) = ensure_indexes(&client, &config).await {
        warn!("Failed to create indexes: {}", err);
    }

    let gemini = GeminiService::new(&config).map_err(io_error)?;

    let bind = (config.host.clone(), config.port);
    info!("Starting HTTP server on {}:{}", bind.0, bind.1);

    let client = web::Data::new(client);
    let config = web::Data::new(config);
    let gemini = web::Data::new(gemini);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .app_data(client.clone())
            .app_data(config.clone())
            .app_data(gemini.clone())
            .configure(routes::configure)
    })
    .bind(bind)?
    .run()
    .await
}
