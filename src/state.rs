use std::sync::Arc;
use std::time::Duration;
use crate::analytics::PetAnalyticsService;
use crate::clock::Clock;
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::repository::OwnerRepository;
use crate::worker::AnalysisPool;
// app's shared state

pub struct AppState {
    pub repository: Arc<dyn OwnerRepository>,
    pub analytics: PetAnalyticsService,
    pub rate_limiter: Arc<RateLimiter>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    // Spawns the analysis pool, so call from inside a tokio runtime
    pub fn new(
        repository: Arc<dyn OwnerRepository>,
        rate_limit: RateLimitConfig,
        analysis_workers: usize,
        analysis_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        // a few jobs per worker keeps submitters from stalling
        let pool = AnalysisPool::new(analysis_workers, analysis_workers.saturating_mul(4));
        let analytics = PetAnalyticsService::new(
            Arc::clone(&repository),
            pool,
            Arc::clone(&clock),
            analysis_timeout,
        );

        Self {
            repository,
            analytics,
            rate_limiter: Arc::new(RateLimiter::new(rate_limit)),
            clock,
        }
    }
}
