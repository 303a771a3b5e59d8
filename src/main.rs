use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use library_lending::domain::SystemClock;
use library_lending::infrastructure::{AppState, scheduler};
use library_lending::{config, db, seed, server};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_lending=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();
    tracing::info!("Starting with profile '{}'", config.profile);

    // Initialize database
    let db = match db::init_db_with_pool(&config.database_url, config.database_max_connections)
        .await
    {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to initialize database {}: {}", config.database_url, e);
            std::process::exit(1);
        }
    };

    // Check for seed flag
    if config.seed_demo {
        tracing::info!("Seeding demo data...");
        if let Err(e) = seed::seed_demo_data(&db, &SystemClock).await {
            tracing::error!("Failed to seed data: {}", e);
        } else {
            tracing::info!("Demo data seeded successfully.");
        }
    }

    let state = AppState::new(db).with_default_loan_days(config.default_loan_days);

    // Periodic overdue detection
    scheduler::spawn_overdue_sweeper(state.lending.clone(), config.overdue_sweep_interval);

    let app = server::build_router(state, &config.cors_allowed_origins);

    if let Err(e) = server::serve(app, config.port).await {
        tracing::error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}
