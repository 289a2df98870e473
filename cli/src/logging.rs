use std::{
    fs::{self, OpenOptions},
    io,
    path::Path,
    sync::Mutex,
};

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the default `info` level. Logs go to `log_file` when
/// one is given and can be opened, otherwise to stderr so stdout stays free
/// for the run summary.
pub fn init_tracing(log_file: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let mut warning = None;
    if let Some(path) = log_file {
        match open_log_file(path) {
            Ok(file) => {
                tracing_subscriber::registry()
                    .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                    .with(env_filter)
                    .init();
                tracing::info!(path = %path.display(), "Logging initialized");
                return;
            }
            Err(e) => warning = Some(format!("Failed to open log file {}: {e}", path.display())),
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
    if let Some(warning) = warning {
        tracing::warn!("{warning}");
    }
}

fn open_log_file(path: &Path) -> io::Result<fs::File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
