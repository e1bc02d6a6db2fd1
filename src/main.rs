// src/main.rs

use std::time::Duration;

use academy::{
    config::Config,
    routes,
    state::AppState,
    store::{MemoryStore, PgStore},
    utils::jwt::{ROLE_USER, issue_token},
};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (.env included)
    let config = Config::from_env()?;

    // `academy token <user_id> [role]` prints a bearer token for operators.
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("token") {
        let user_id: i64 = args
            .get(1)
            .ok_or("usage: academy token <user_id> [user|admin]")?
            .parse()?;
        let role = args.get(2).map(String::as_str).unwrap_or(ROLE_USER);
        println!("{}", issue_token(&config, user_id, role)?);
        return Ok(());
    }

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let state = match &config.database_url {
        Some(database_url) => {
            let pool = connect_with_retry(database_url, config.db_max_connections).await?;
            tracing::info!("Database connected...");

            tracing::info!("Running migrations...");
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Migrations applied successfully.");

            AppState::from_store(PgStore::new(pool), config.clone())
        }
        None => {
            tracing::warn!("DATABASE_URL not set, keeping all data in memory");
            AppState::from_store(MemoryStore::new(), config.clone())
        }
    };

    // Reconcile the badge catalog with the milestone list
    if let Err(e) = state.badges.ensure_catalog().await {
        tracing::error!("Failed to reconcile badge catalog: {}", e);
    }

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn connect_with_retry(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let mut retry_count = 0;
    loop {
        match PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    tracing::error!("Failed to connect to database after 5 retries");
                    return Err(e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}
