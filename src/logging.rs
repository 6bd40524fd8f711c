//! Tracing subscriber setup.

use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Install a compact stderr subscriber.
///
/// `RUST_LOG` wins when set; otherwise `debug` selects the level.
pub fn init_tracing(debug: bool) {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(debug)
        .compact();

    tracing_subscriber::registry()
        .with(build_env_filter(debug))
        .with(fmt_layer)
        .init();
}

fn build_env_filter(debug: bool) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directives(debug)))
}

/// Debug output is limited to this crate; slack-morphism and hyper stay at info.
fn default_directives(debug: bool) -> &'static str {
    if debug {
        "today_alerts=debug,info"
    } else {
        "info"
    }
}
