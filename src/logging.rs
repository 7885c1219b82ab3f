use once_cell::sync::OnceCell;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Initialise logging. With `debug` disabled the level is pinned to `info`;
/// with it enabled `RUST_LOG` may override the default `debug` level.
/// When `log_file` is given, output is written to that file instead of stderr.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    // Pin `info` when debug is off so a stray `RUST_LOG` in the user's
    // environment cannot turn on verbose output.
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let name = path
                .file_name()
                .map(|n| n.to_owned())
                .unwrap_or_else(|| "caret_overlay.log".into());
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let installed = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(writer)
                .try_init()
                .is_ok();
            if installed {
                let _ = FILE_GUARD.set(guard);
            }
        }
        None => {
            let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
        }
    }
}
