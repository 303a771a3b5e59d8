use std::env;
use std::time::Duration;

/// Longest loan a default due date may span, about ten years
pub const MAX_LOAN_DAYS: i64 = 3650;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub profile: String,
    /// Interval of the background overdue sweep; `None` leaves overdue
    /// detection to explicit `POST /api/transactions/sweep` calls.
    pub overdue_sweep_interval: Option<Duration>,
    /// Loan length applied when an issue request carries no due date
    pub default_loan_days: i64,
    pub seed_demo: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup (environment, test fixtures)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let profile = lookup("PROFILE").unwrap_or_else(|| "default".to_string());

        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| {
            if profile == "default" {
                "sqlite://library.db?mode=rwc".to_string()
            } else {
                format!("sqlite://library_{}.db?mode=rwc", profile)
            }
        });

        let sweep_secs = lookup("OVERDUE_SWEEP_INTERVAL_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(3600);

        Self {
            database_url,
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .filter(|n: &u32| *n > 0)
                .unwrap_or(4),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            profile,
            overdue_sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
            default_loan_days: lookup("DEFAULT_LOAN_DAYS")
                .and_then(|d| d.parse().ok())
                .filter(|d: &i64| (1..=MAX_LOAN_DAYS).contains(d))
                .unwrap_or(14),
            seed_demo: lookup("SEED_DEMO").is_some_and(|v| v != "false" && v != "0"),
        }
    }
}
