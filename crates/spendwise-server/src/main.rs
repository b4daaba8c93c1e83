use anyhow::{Context, Result};
use spendwise_db::{create_pool, run_migrations, UserRepo};
use spendwise_common::models::auth::AuthProvider;
use spendwise_server::auth::{hash_password, normalize_email};
use spendwise_server::config::{load_config, InitialUserConfig};
use spendwise_server::social::init_verifiers;
use spendwise_server::state::AppState;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Spendwise server");

    // Load configuration
    let config_path =
        std::env::var("SPENDWISE_CONFIG").unwrap_or_else(|_| "server-config.yaml".to_string());
    tracing::info!("Loading config from: {}", config_path);
    let config = load_config(&config_path)?;
    tracing::info!("Config loaded successfully");

    // Create database pool
    tracing::info!("Connecting to database...");
    let pool = create_pool(&config.db.url)
        .await
        .context("Failed to create database pool")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    if let Some(initial_user) = &config.auth.initial_user {
        seed_initial_user(&pool, initial_user).await?;
    }

    let verifiers = init_verifiers(&config.auth.providers)?;

    // Build application state
    let state = AppState::new(pool, config.clone(), verifiers);

    // Start background tasks
    let cancel_token = CancellationToken::new();
    let sweeper = spendwise_server::token_sweeper::start(state.clone(), cancel_token.clone());

    // Build router
    let app = spendwise_server::web::build_router(state);

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen))?;

    tracing::info!("Server listening on {}", config.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await
        .context("Server error")?;

    if let Err(e) = sweeper.await {
        tracing::warn!("Token sweeper ended abnormally: {}", e);
    }

    Ok(())
}

/// Create the configured demo account unless it already exists.
async fn seed_initial_user(pool: &PgPool, initial_user: &InitialUserConfig) -> Result<()> {
    let email = normalize_email(&initial_user.email);
    match UserRepo::get_by_email(pool, &email).await {
        Ok(Some(_)) => {
            tracing::info!("Initial user '{}' already exists, skipping seed", email);
        }
        Ok(None) => {
            let password_hash = hash_password(&initial_user.password)
                .context("Failed to hash initial user password")?;
            let user_id = uuid::Uuid::new_v4();
            UserRepo::create(
                pool,
                user_id,
                &email,
                Some(&password_hash),
                initial_user.name.as_deref(),
                AuthProvider::Local,
            )
            .await
            .context("Failed to create initial user")?;
            if let Some(budget) = initial_user.monthly_budget {
                UserRepo::set_monthly_budget(pool, user_id, budget)
                    .await
                    .context("Failed to set initial user budget")?;
            }
            tracing::info!("Created initial user: {}", email);
        }
        Err(e) => {
            tracing::warn!("Failed to check for initial user: {:#}", e);
        }
    }
    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping...");
    cancel_token.cancel();
}
