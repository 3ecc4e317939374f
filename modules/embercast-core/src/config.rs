use anyhow::Result;

/// Application configuration loaded from environment variables.
/// Secrets and tunables only; everything structural lives in code.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Database
    pub database_url: String,

    // Credential sealing (pgcrypto key for platform tokens at rest)
    pub credential_sealing_key: Option<String>,

    // LinkedIn OAuth app
    pub linkedin_client_id: Option<String>,
    pub linkedin_client_secret: Option<String>,

    // Workers and timers
    pub worker_concurrency: usize,
    pub queue_max_attempts: i32,
    pub autopilot_interval_secs: u64,
    pub momentum_interval_secs: u64,
    pub requeue_interval_secs: u64,

    // Momentum tuning
    pub momentum_window_hours: f64,
    pub hot_score_threshold: f64,

    // Platform HTTP
    pub platform_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")?,
            credential_sealing_key: std::env::var("CREDENTIAL_SEALING_KEY").ok(),
            linkedin_client_id: std::env::var("LINKEDIN_CLIENT_ID").ok(),
            linkedin_client_secret: std::env::var("LINKEDIN_CLIENT_SECRET").ok(),
            worker_concurrency: env_or("WORKER_CONCURRENCY", 4),
            queue_max_attempts: env_or("QUEUE_MAX_ATTEMPTS", 5),
            autopilot_interval_secs: env_or("AUTOPILOT_INTERVAL_SECS", 60),
            momentum_interval_secs: env_or("MOMENTUM_INTERVAL_SECS", 900),
            requeue_interval_secs: env_or("REQUEUE_INTERVAL_SECS", 300),
            momentum_window_hours: env_or("MOMENTUM_WINDOW_HOURS", 24.0),
            hot_score_threshold: env_or("HOT_SCORE_THRESHOLD", 0.25),
            platform_timeout_secs: env_or("PLATFORM_TIMEOUT_SECS", 30),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let n = val.len().min(5);
            format!("{}...({} chars)", &val[..n], val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!(
            "  CREDENTIAL_SEALING_KEY: {}",
            preview_opt(&self.credential_sealing_key)
        );
        tracing::info!(
            "  LINKEDIN_CLIENT_ID: {}",
            preview_opt(&self.linkedin_client_id)
        );
        tracing::info!(
            "  LINKEDIN_CLIENT_SECRET: {}",
            preview_opt(&self.linkedin_client_secret)
        );
        tracing::info!(
            "  workers={} max_attempts={} window_hours={} hot_threshold={}",
            self.worker_concurrency,
            self.queue_max_attempts,
            self.momentum_window_hours,
            self.hot_score_threshold
        );
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
