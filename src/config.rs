use clap::Parser;
use std::time::Duration;
use crate::rate_limit::RateLimitConfig;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "petclinic-analytics")]
#[command(about = "Pet clinic analytics service with a rate limited owner search")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // Max requests per caller per window on the protected route
    #[arg(long, env = "RATE_LIMIT_MAX_REQUESTS", default_value_t = 5)]
    pub max_requests: u32,

    // Rate limit window in minutes
    #[arg(long, env = "RATE_LIMIT_WINDOW_SIZE_MINUTES", default_value_t = 1)]
    pub window_size_minutes: u32,

    // Turn rate limiting on/off
    #[arg(long, env = "RATE_LIMIT_ENABLED", default_value_t = true, action = clap::ArgAction::Set)]
    pub rate_limit_enabled: bool,

    // The one route the limiter applies to
    #[arg(long, env = "RATE_LIMIT_PROTECTED_ROUTE", default_value = "/owners/find")]
    pub protected_route: String,

    // How often expired rate limit keys are swept, 0 disables the sweeper
    #[arg(long, env = "RATE_LIMIT_SWEEP_SECS", default_value_t = 300)]
    pub rate_limit_sweep_secs: u64,

    // Size of the analysis worker pool
    #[arg(long, env = "ANALYSIS_WORKERS", default_value_t = 4)]
    pub analysis_workers: usize,

    // Per-pet analysis timeout in seconds
    #[arg(long, env = "ANALYSIS_TIMEOUT_SECS", default_value_t = 30)]
    pub analysis_timeout_secs: u64,

    // Log filter, e.g. "info" or "petclinic_analytics=debug"
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.max_requests,
            window_size_minutes: self.window_size_minutes,
            enabled: self.rate_limit_enabled,
            protected_route: self.protected_route.clone(),
        }
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.rate_limit_sweep_secs > 0).then(|| Duration::from_secs(self.rate_limit_sweep_secs))
    }
}
