//! Process-wide logging init for binaries embedding the Engine, plus the per-task span that
//! [`crate::flow::Flow`] attaches to every supervised task body.
//!
//! The Engine never calls [`init_observability`] itself — a library doesn't install a global
//! subscriber on a caller's behalf — but it does emit spans and events through `tracing`
//! regardless of whether a caller ever initializes a subscriber for them.

use std::fs::OpenOptions;
use std::path::Path;

use once_cell::sync::OnceCell;
use tracing::Span;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::EnvFilter;

use crate::task::TaskContext;

/// Holds the background-writer guard for the lifetime of the process when logging to a file;
/// dropping it would stop flushing, so it has to outlive every call site, not just this function.
static GUARD: OnceCell<Option<WorkerGuard>> = OnceCell::new();

/// The span a supervised task body runs inside, carrying the same `flow_id` the coordinator's own
/// `#[instrument]`ed `Flow::execute` span carries, plus the task's name.
pub fn task_span(ctx: &TaskContext) -> Span {
    tracing::info_span!("task", flow_id = %ctx.flow_id, task = %ctx.task_name)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "0" | "false" | "no" | "off" => Some(false),
        "1" | "true" | "yes" | "on" => Some(true),
        _ => None,
    }
}

fn env_flag(keys: &[&str], default: bool) -> bool {
    for key in keys {
        if let Ok(raw) = std::env::var(key) {
            return parse_flag(&raw).unwrap_or(default);
        }
    }
    default
}

fn env_filter() -> EnvFilter {
    std::env::var("FLOWENGINE_LOG_LEVEL")
        .ok()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn open_json_sink(path: &str) -> Option<WorkerGuard> {
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        let _ = std::fs::create_dir_all(parent);
    }
    let file = OpenOptions::new().create(true).append(true).open(path).ok()?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().json().with_target(false).with_writer(writer))
        .try_init();
    Some(guard)
}

fn open_console_sink() {
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().compact().with_target(false))
        .try_init();
}

/// Initialize the process-wide subscriber. Idempotent: only the first call has any effect.
///
/// - `FLOWENGINE_OBSERVABILITY` / `FLOWENGINE_OBSERVABILITY_ENABLED`: set to `0`/`false`/`off` to
///   skip initialization entirely (default: enabled).
/// - `FLOWENGINE_LOG_LEVEL` / `RUST_LOG`: filter directive (`info`, `flow_engine=debug`, ...).
/// - `FLOWENGINE_JSON_LOG_PATH`: if set, append JSONL records to this file instead of the console.
pub fn init_observability() {
    GUARD.get_or_init(|| {
        if !env_flag(&["FLOWENGINE_OBSERVABILITY", "FLOWENGINE_OBSERVABILITY_ENABLED"], true) {
            return None;
        }
        match std::env::var("FLOWENGINE_JSON_LOG_PATH") {
            Ok(path) => open_json_sink(&path),
            Err(_) => {
                open_console_sink();
                None
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flag_recognizes_common_spellings() {
        assert_eq!(parse_flag("true"), Some(true));
        assert_eq!(parse_flag("OFF"), Some(false));
        assert_eq!(parse_flag("  1 "), Some(true));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn env_flag_falls_back_to_default_when_unset() {
        assert!(env_flag(&["FLOWENGINE_OBSERVABILITY_DOES_NOT_EXIST"], true));
        assert!(!env_flag(&["FLOWENGINE_OBSERVABILITY_DOES_NOT_EXIST"], false));
    }
}
