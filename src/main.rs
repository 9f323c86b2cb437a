mod access;
mod config;
mod db;
mod format;
mod order_status;
mod routes;
mod services;
mod state;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::AppConfig::from_env().expect("invalid configuration");
    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");

    if config.seed_demo_data {
        match services::seed::seed_if_empty(&pool, config.stock_warning_multiple).await {
            Ok(true) => tracing::info!("demo data inserted"),
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %e, "demo seed failed; continuing with existing data"),
        }
    }

    let port = config.port;
    let state = state::AppState::new(pool, config);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "astrobrew listening");
    axum::serve(listener, app).await.expect("server failed");
}
