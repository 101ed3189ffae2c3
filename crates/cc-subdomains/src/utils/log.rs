use crate::Result;
use std::io;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr, stdout only carries the hosts found.
pub fn init_tracing_subscriber(save_logs_file: bool, output_dir: &Path, filename: &str) -> Result<()> {
    // base for the subscriber
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_span_events(FmtSpan::CLOSE);

    if save_logs_file {
        let filename = format!("{}.log", filename);
        let file_appender = RollingFileAppender::new(Rotation::NEVER, output_dir, filename);
        let subscriber = subscriber
            .with_ansi(false)
            .with_file(false)
            .with_target(false)
            .with_writer(file_appender)
            .finish();

        // add log in terminal as an additional layer
        let stderr_layer = layer()
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(true)
            .with_file(false)
            .with_target(false)
            .with_writer(io::stderr);

        tracing::subscriber::set_global_default(subscriber.with(stderr_layer))?;
    } else {
        let subscriber = subscriber
            .with_ansi(true)
            .with_file(false)
            .with_target(false)
            .with_writer(io::stderr)
            .finish();

        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
