use anyhow::Result;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// Logs go to stderr; stdout carries device messages.
pub fn init(debug: bool) -> Result<()> {
    let level = if debug { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(EnvFilter::builder().with_default_directive(level.into()).from_env()?)
        .with_writer(std::io::stderr)
        .with_ansi(debug)
        .with_file(debug)
        .with_line_number(debug)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
