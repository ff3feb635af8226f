use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::db::establish_connection;
use erc20::Erc20Client;

mod auth;
mod award;
mod config;
mod eligibility;
mod error;
mod identity;
mod metrics;
mod quota;
mod reservation;
mod routes;
mod store;

use auth::middleware::FidAuthentication;
use config::Config;
use identity::IdentityClient;
use quota::RedisQuota;
use routes::AppState;
use store::PgStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting the play/reward service");
    let config = Config::from_env().expect("Missing required environment configuration");

    let pool = establish_connection().await;
    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Invalid REDIS_URL");

    let app_state = web::Data::new(AppState {
        store: PgStore::new(pool),
        quota: RedisQuota::new(redis_client),
        identity: IdentityClient::new(&config.neynar_api_url, &config.neynar_api_key),
        erc20: Erc20Client::new(&config.rpc_url),
        config: config.clone(),
    });

    let bind_addr = config.server_address();
    info!("Starting HTTP server on {}", bind_addr);
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                error::ApiError::InvalidInput(err.to_string()).into()
            }))
            .wrap(FidAuthentication::new())
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .service(routes::health_check)
            .service(routes::metrics_endpoint)
            .service(routes::check_play_status)
            .service(routes::reserve_play)
            .service(routes::release_play)
            .service(routes::award)
            .service(routes::fetch_or_create_player)
            .service(routes::leaderboard)
    })
    .bind(bind_addr)?
    .run()
    .await
}
