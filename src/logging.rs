use tracing_subscriber::EnvFilter;

/// All workspace crate targets that should receive log output.
const CRATE_TARGETS: &[&str] = &[
    "hoopla",
    "hoopla_assimilation",
    "hoopla_calendar",
    "hoopla_calibration",
    "hoopla_data",
    "hoopla_models",
    "hoopla_simulation",
    "hoopla_stats",
];

/// Filter directive for a `-v` count: warn, info, debug, then trace.
fn default_filter(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    CRATE_TARGETS
        .iter()
        .map(|t| format!("{t}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize tracing based on CLI verbosity level.
///
/// `RUST_LOG` env var overrides the CLI flag if set.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
