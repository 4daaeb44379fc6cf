use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,matchday_ledger=info";

pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_target(false)
        .try_init();
}
