use log::{debug, error, info, log_enabled, warn, Level};

/// Initializes `env_logger` with a default filter used when `RUST_LOG` is unset.
///
/// # Examples
/// ```rust,no_run
/// use lora_hat_gateway::logging::init_logger_with_default;
///
/// init_logger_with_default("info");
/// log::info!("Gateway starting");
/// ```
pub fn init_logger_with_default(default_filter: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

/// Logs an error message.
pub fn log_error(message: &str) {
    if log_enabled!(Level::Error) {
        error!("{message}");
    }
}

/// Logs a warning message.
pub fn log_warn(message: &str) {
    if log_enabled!(Level::Warn) {
        warn!("{message}");
    }
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    if log_enabled!(Level::Info) {
        info!("{message}");
    }
}

/// Logs a debug message.
pub fn log_debug(message: &str) {
    if log_enabled!(Level::Debug) {
        debug!("{message}");
    }
}
