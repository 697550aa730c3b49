use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `crates` are logged at `debug`
/// when verbose and `info` when not, everything else at `warn`.
pub fn init_tracing(crates: &[&str], verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let default_filter = crates
        .iter()
        .map(|name| format!("{name}={level}"))
        .chain(std::iter::once("warn".to_string()))
        .collect::<Vec<_>>()
        .join(",");

    let result = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
