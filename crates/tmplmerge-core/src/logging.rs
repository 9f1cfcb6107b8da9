use std::path::Path;
use tracing_appender::rolling;
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Initialize logging: everything passing the filter goes to
/// `<log_dir>/tmplmerge.log`, and warnings also reach stderr so they do not
/// interleave with the per-file summary on stdout.
///
/// `default_filter` applies when `RUST_LOG` is unset. Returns a guard that
/// must be held for the lifetime of the application to ensure log messages
/// are flushed.
pub fn init_logging(
    log_dir: &Path,
    default_filter: &str,
) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = rolling::never(log_dir, "tmplmerge.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(LevelFilter::WARN),
        )
        .try_init()?;

    Ok(guard)
}
