use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use lizenzmanager::{
    AppState,
    config::Config,
    middleware::{RateLimiter, log_errors, rate_limit},
    router::create_router,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        "Starting in {:?} environment, public base URL {}",
        config.environment,
        config.public_base_url
    );
    if config.vidis.client_secret.is_none() {
        tracing::warn!("VIDIS_CLIENT_SECRET is not set, code exchange runs as a public client");
    }

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'lizenzmanager';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let redis = Arc::new(
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client"),
    );

    let http = reqwest::Client::builder()
        .user_agent(concat!("lizenzmanager/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to build HTTP client");

    let state = AppState {
        pool,
        config: config.clone(),
        redis: redis.clone(),
        http,
    };

    let rate_limiter = Arc::new(RateLimiter::new(redis, config.clone()));

    let router = create_router(state)
        .layer(axum::middleware::from_fn(log_errors))
        .layer(axum::middleware::from_fn_with_state(rate_limiter, rate_limit));

    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
