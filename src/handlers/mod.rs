mod analytics;
mod health;
mod metrics;
mod owners;

pub use analytics::{analytics_handler, pet_report_handler};
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use owners::{find_owners_handler, pets_handler};
