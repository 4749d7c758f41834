use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Levels accepted by `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Parses a level name, case-insensitively. `warn` is accepted for `warning`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warning" | "warn" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// `EnvFilter` directive for this level.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Installs the global subscriber. Unknown level names fall back to
/// `warning`.
pub fn init(name: &str) {
    let parsed = LogLevel::parse(name);
    let level = parsed.unwrap_or(LogLevel::Warning);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level.directive()))
        .with_target(false)
        .compact()
        .init();

    if parsed.is_none() {
        warn!("unknown log level {name:?}, using warning");
    }
    if level == LogLevel::Debug {
        warn!("debug logging is on; secrets such as the bind password may be printed");
    }
}
