//! Logging setup for applications built on the SDK
//!
//! The library itself only emits `tracing` events. Applications that do not
//! install their own subscriber can call [`init_logging`] or
//! [`init_logging_from_env`] once at startup.

use tracing_subscriber::{fmt, EnvFilter, Registry};

const MODE_VAR: &str = "PURECOOL_LOG_MODE";
const LEVEL_VAR: &str = "PURECOOL_LOG_LEVEL";

/// Crates whose events follow the mode's level; everything else, the MQTT
/// and mDNS stacks included, stays at `warn`
const SDK_TARGETS: [&str; 3] = ["purecool_api", "purecool_discovery", "purecool_sdk"];

/// How much the SDK should print
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No subscriber is installed
    Silent,
    /// Compact stderr output of the SDK's `info` events
    Development,
    /// Pretty output of the SDK's `debug` events, with thread names so the
    /// delivery worker and poller can be told apart
    Debug,
}

impl LoggingMode {
    /// Parse a mode name as accepted by `PURECOOL_LOG_MODE`
    pub fn from_name(name: &str) -> Result<Self, LoggingError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "silent" | "off" => Ok(Self::Silent),
            "development" | "dev" => Ok(Self::Development),
            "debug" => Ok(Self::Debug),
            other => Err(LoggingError::InvalidEnv(format!("{}={}", MODE_VAR, other))),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid environment variable: {0}")]
    InvalidEnv(String),
}

/// Install a global subscriber for `mode`
///
/// `PURECOOL_LOG_LEVEL` overrides the mode's default filter, falling back to
/// `RUST_LOG`. Either takes full `EnvFilter` directives.
///
/// # Examples
///
/// ```rust,no_run
/// use purecool_sdk::logging::{init_logging, LoggingMode};
///
/// init_logging(LoggingMode::Development)?;
/// # Ok::<(), purecool_sdk::logging::LoggingError>(())
/// ```
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let subscriber = Registry::default()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .compact(),
                )
                .with(create_env_filter("info"));

            subscriber
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Debug => {
            let subscriber = Registry::default()
                .with(
                    fmt::layer()
                        .pretty()
                        .with_thread_ids(true)
                        .with_thread_names(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with(create_env_filter("debug"));

            subscriber
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
    }
}

/// Initialize logging from `PURECOOL_LOG_MODE`
///
/// Unset means silent. An unknown mode is an error rather than a silent
/// fallback.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = match std::env::var(MODE_VAR) {
        Ok(name) => LoggingMode::from_name(&name)?,
        Err(_) => LoggingMode::Silent,
    };

    init_logging(mode)
}

fn create_env_filter(default_level: &str) -> EnvFilter {
    let configured = std::env::var(LEVEL_VAR)
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok();
    EnvFilter::new(filter_directives(default_level, configured))
}

fn filter_directives(default_level: &str, configured: Option<String>) -> String {
    match configured {
        Some(directives) if !directives.trim().is_empty() => directives,
        _ => std::iter::once("warn".to_string())
            .chain(
                SDK_TARGETS
                    .iter()
                    .map(|target| format!("{}={}", target, default_level)),
            )
            .collect::<Vec<_>>()
            .join(","),
    }
}

/// Whether a global subscriber has already been installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}
