use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Env var naming the log file. Unset means no file logging.
pub const LOG_ENV_VAR: &str = "LOTTO_STORE_LOG";

/// Initialize tracing.
///
/// File logging is enabled by setting `LOTTO_STORE_LOG` to a file path.
/// Log files get unique names, `{path}.{timestamp}.{pid}`, so concurrent
/// runs never share a file. `verbose` additionally logs to stderr.
///
/// `RUST_LOG` takes precedence over `default_level`.
pub fn init_tracing(default_level: &str, verbose: bool) {
    let file_path = std::env::var(LOG_ENV_VAR).ok();
    if file_path.is_none() && !verbose {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = file_path.and_then(|path| {
        let unique_path = unique_log_path(&path);
        match std::fs::File::create(&unique_path) {
            Ok(file) => Some(
                fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_level(true),
            ),
            Err(_) => {
                eprintln!("Warning: Failed to create log file: {}", unique_path);
                None
            }
        }
    });

    let stderr_layer = verbose.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
}

fn unique_log_path(base: &str) -> String {
    let pid = std::process::id();
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{}.{}.{}", base, timestamp, pid)
}
