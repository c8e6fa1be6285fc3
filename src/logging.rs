//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

/// Filter directive for a base level raised by `-v` flags.
///
/// One `-v` raises the level to `debug`, two or more to `trace`.
pub fn filter_directive(base: &str, verbose: u8) -> String {
    match verbose {
        0 => base.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `base` unless `-v` was given. With `json` set every
/// event is written as one JSON object per line.
pub fn init_tracing(
    base: &str,
    verbose: u8,
    json: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = match (verbose, EnvFilter::try_from_default_env()) {
        (0, Ok(from_env)) => from_env,
        _ => EnvFilter::try_new(filter_directive(base, verbose))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}
