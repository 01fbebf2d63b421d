//! Recommendation service
//!
//! Serves top-N queries and ingests interaction events against one model
//! instance owned by this process (local mode) or the shared Redis snapshot
//! (shared mode). The model handle is constructed here, at the composition
//! point, and passed to handlers through `AppState`.

use actix_web::{web, App, HttpServer};
use reco_core::{load_dotenv, ConfigLoader, ModelConfig, RedisConfig, ServiceConfig};
use reco_server::{routes, ApiKeyAuth, AppState};
use tracing::info;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .json()
        .init();

    let model_config = ModelConfig::from_env()?;
    model_config.validate()?;
    let redis_config = RedisConfig::from_env()?;
    redis_config.validate()?;
    let service_config = ServiceConfig::from_env()?;
    service_config.validate()?;

    let state = web::Data::new(AppState::build(
        &model_config,
        &redis_config,
        &service_config,
    )?);

    let auth = if service_config.require_api_key {
        ApiKeyAuth::new(&redis_config.url, service_config.api_key_prefix.clone())?
    } else {
        ApiKeyAuth::disabled()
    };

    info!(
        host = %service_config.host,
        port = service_config.port,
        mode = state.mode_name(),
        "starting recommendation service"
    );

    let app_state = state.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .route("/health", web::get().to(routes::health))
            .service(
                web::scope("/v1")
                    .wrap(auth.clone())
                    .configure(routes::configure),
            )
    })
    .bind((service_config.host.as_str(), service_config.port))?
    .run()
    .await?;

    state.save_if_local()?;
    info!("shutdown complete");
    Ok(())
}
