use dotenvy::dotenv;
use shop_orders::{build_outbox_relay, build_server, create_pool, run_migrations, Config};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().unwrap_or_else(|e| panic!("Invalid configuration: {}", e));

    let pool = create_pool(&config.database_url, config.pool_size);
    run_migrations(&pool);

    let relay = build_outbox_relay(pool.clone(), config.outbox_batch_size);
    actix_web::rt::spawn(relay.run(config.outbox_poll_interval));
    log::info!(
        "Outbox relay polling every {:?} (batch {})",
        config.outbox_poll_interval,
        config.outbox_batch_size
    );

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    build_server(pool, &config.host, config.port)?.await
}
