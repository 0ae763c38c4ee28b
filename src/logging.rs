use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Installs the stderr subscriber. `LEDGER_PILOT_LOG` wins over `RUST_LOG`;
/// HTTP client internals stay at `warn` unless asked for.
pub fn init_tracing(component: &str) {
    let default_filter =
        format!("info,hyper_util=warn,reqwest=warn,ledger_pilot=debug,{component}=debug");

    let filter = std::env::var("LEDGER_PILOT_LOG")
        .ok()
        .and_then(|value| EnvFilter::try_new(value).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
