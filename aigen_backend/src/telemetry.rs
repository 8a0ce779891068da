use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "aigen_backend=info,aigen_frontend=info,aigen_desktop=info";

/// Initializes a global tracing subscriber respecting the `RUST_LOG`
/// environment variable. Records emitted through the `log` facade (the egui
/// frontend) are forwarded as well. Subsequent calls become no-ops.
pub fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}
