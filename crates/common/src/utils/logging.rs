use std::io;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact human-readable lines
    #[default]
    Compact,
    /// JSON lines for machine parsing
    Json,
}

impl LogFormat {
    /// Parse a configured format name; `None` for unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Some(LogFormat::Compact),
            "json" | "jsonl" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

fn env_filter(fallback: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback.unwrap_or(DEFAULT_FILTER)))
}

/// Initialize the tracing subscriber.
/// - Respects `RUST_LOG` if set, otherwise uses `filter` or `info`
/// - Writes to stderr; stdout carries command output
/// - Safe to call more than once, later calls are no-ops
pub fn init_logging(format: LogFormat, filter: Option<&str>) {
    let builder = fmt()
        .with_env_filter(env_filter(filter))
        .with_target(false)
        .with_writer(io::stderr);
    let _ = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
