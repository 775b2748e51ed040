pub mod availability; // Bookable-day rules
pub mod clock; // Institutional time source
pub mod config;
pub mod db;
pub mod lifecycle; // Psychologist roster + history
pub mod models;
pub mod scheduling; // Booking, state machine, rescheduling
pub mod slots; // 30-minute grid allocator

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Call once at process start;
/// `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
