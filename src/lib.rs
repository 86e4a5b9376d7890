pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::order_service::OrderService;
use handlers::orders;
use infrastructure::order_repo::DieselOrderRepository;
use infrastructure::outbox_relay::OutboxRelay;
use infrastructure::subscribers::{CartSubscriber, NotificationSubscriber, WalletSubscriber};

pub use config::Config;
pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

/// The relay with every side-effect subscriber registered.
pub fn build_outbox_relay(pool: DbPool, batch_size: i64) -> OutboxRelay {
    OutboxRelay::new(pool.clone(), batch_size)
        .with_handler(NotificationSubscriber::new(pool.clone()))
        .with_handler(WalletSubscriber::new(pool.clone()))
        .with_handler(CartSubscriber::new(pool))
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let service = web::Data::new(OrderService::new(DieselOrderRepository::new(pool)));
    let openapi = handlers::ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .app_data(web::JsonConfig::default().error_handler(handlers::json_error))
            .app_data(web::PathConfig::default().error_handler(handlers::path_error))
            .app_data(web::QueryConfig::default().error_handler(handlers::query_error))
            .wrap(Logger::default())
            .route("/health", web::get().to(handlers::health))
            .service(
                web::scope("/orders")
                    .route("", web::post().to(orders::create_order))
                    .route("", web::get().to(orders::list_orders))
                    .route("/{id}", web::get().to(orders::get_order))
                    .route("/{id}", web::put().to(orders::update_order))
                    .route("/{id}", web::delete().to(orders::delete_order))
                    .route("/{id}/status", web::put().to(orders::update_order_status))
                    .route("/{id}/cancel", web::put().to(orders::cancel_order)),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
