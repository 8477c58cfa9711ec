use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Console logging on stderr so stdout stays clean for `summary`/`clean` output.
/// `RUST_LOG` overrides the default `survey_dash=info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("survey_dash=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
