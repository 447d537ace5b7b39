//! Tracing setup for controllers embedding the core.
//!
//! Mirror drift is logged under the `campus::mirror` target, so operators can
//! filter it with e.g. `RUST_LOG=warn,campus::mirror=debug`.

use tracing_subscriber::EnvFilter;

/// Target used for mirror drift telemetry.
pub const MIRROR_TARGET: &str = "campus::mirror";

/// Install a stderr subscriber.
///
/// Honors `RUST_LOG` if set, otherwise maps `verbose`:
/// 0 = warn, 1 = info, 2 = debug (with HTTP internals at info), 3+ = trace.
/// Calling it twice is harmless; the second install is ignored.
pub fn init_tracing(verbose: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,hyper=info,reqwest=info,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}
