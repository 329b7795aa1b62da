use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::PgPool;
use std::sync::Arc;

use taskhive::auth::{SessionGate, TokenCodec};
use taskhive::config::Config;
use taskhive::routes;
use taskhive::store::{CredentialStore, PgCredentialStore, PgTaskStore, TaskStore};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let pool = PgPool::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    let codec = TokenCodec::new(&config.jwt_secret, config.token_ttl_hours);
    let credential_store: Arc<dyn CredentialStore> =
        Arc::new(PgCredentialStore::new(pool.clone()));
    let task_store: Arc<dyn TaskStore> = Arc::new(PgTaskStore::new(pool));

    let credential_data = web::Data::from(credential_store);
    let task_data = web::Data::from(task_store);
    let codec_data = web::Data::new(codec.clone());

    log::info!("Starting taskhive server at {}", config.server_url());

    HttpServer::new(move || {
        App::new()
            .app_data(credential_data.clone())
            .app_data(task_data.clone())
            .app_data(codec_data.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .supports_credentials()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(routes::health::health)
            .service(
                web::scope("/api")
                    .wrap(SessionGate::new(codec.clone()))
                    .configure(routes::config),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
