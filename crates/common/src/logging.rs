//! Logging and tracing initialization.
//!
//! Logs always go to stderr so stdout stays free for command output such as
//! `render --json`.

use tracing::Dispatch;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Initialize the global tracing subscriber with the given configuration.
pub fn init_logging(config: &LoggingConfig) {
    let dispatch = build_dispatch(config, std::io::stderr);
    tracing::dispatcher::set_global_default(dispatch).ok();
}

/// Build a subscriber for `config` that writes through `writer`.
pub fn build_dispatch<W>(config: &LoggingConfig, writer: W) -> Dispatch
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(writer)
            .json()
            .finish();
        Dispatch::new(subscriber)
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_writer(writer)
            .finish();
        Dispatch::new(subscriber)
    }
}
