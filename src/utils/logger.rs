use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static LOGGER: OnceCell<()> = OnceCell::new();

/// Installs the global fmt subscriber once; the filter comes from
/// `RUST_LOG`, defaulting to warnings only. Safe to call from every entry
/// point, including tests running in parallel.
pub fn init_logging() {
    LOGGER.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}
