use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter. `RUST_LOG` is used when unset.
pub const LOG_ENV: &str = "GRINDSTONE_LOG";

/// Initialize stderr logging. stdout is reserved for command output.
///
/// `verbose` raises the default level from `warn` to `debug`; an explicit
/// filter in the environment always wins.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    // a second init (tests) is harmless
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init();
}
