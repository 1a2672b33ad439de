use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

const ENABLED_ENV: &str = "A2A_STREAM_OBSERVABILITY_ENABLED";
const LOG_LEVEL_ENV: &str = "A2A_STREAM_LOG_LEVEL";
const JSON_LOG_PATH_ENV: &str = "A2A_STREAM_JSON_LOG_PATH";
const DEFAULT_JSON_LOG_FILE: &str = "a2a-stream.logs.jsonl";

static INIT: OnceCell<()> = OnceCell::new();

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

fn enabled_from(value: Option<&str>) -> bool {
    value.and_then(parse_flag).unwrap_or(true)
}

fn filter_from(level: Option<&str>) -> EnvFilter {
    if let Some(level) = level
        && let Ok(filter) = EnvFilter::try_new(level)
    {
        return filter;
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Splits a log path into the directory and file name the appender expects.
fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_JSON_LOG_FILE)
        .to_string();
    (dir, file_name)
}

/// Initialize logging once per process.
///
/// Environment variables:
/// - `A2A_STREAM_OBSERVABILITY_ENABLED`: optional enable/disable flag (default enabled).
/// - `A2A_STREAM_LOG_LEVEL`: optional level/filter override (`info`, `debug`, etc.).
/// - `A2A_STREAM_JSON_LOG_PATH`: optional log file path. If set, logs are JSONL in that file.
///   If unset, logs go to stderr in a compact console format so stdout stays free for output.
/// - `RUST_LOG`: used when no level override is set.
pub fn init_observability() {
    INIT.get_or_init(|| {
        if !enabled_from(std::env::var(ENABLED_ENV).ok().as_deref()) {
            return;
        }

        let env_filter = filter_from(std::env::var(LOG_LEVEL_ENV).ok().as_deref());
        if let Ok(path_raw) = std::env::var(JSON_LOG_PATH_ENV) {
            let (dir, file_name) = split_log_path(Path::new(&path_raw));
            let _ = std::fs::create_dir_all(&dir);
            let writer = tracing_appender::rolling::never(dir, file_name);
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(false)
                .with_writer(writer);
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(json_layer)
                .try_init();
        } else {
            let console_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr);
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .try_init();
        }
    });
}
