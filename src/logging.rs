//! Unified logging for debug output.
//!
//! Compact timestamped logging on top of `tracing`, with the verbosity
//! flag mapped to a default filter level.
//!
//! # Environment Variable
//!
//! `RUST_LOG` takes precedence over the flag:
//! ```bash
//! RUST_LOG=debug envmirror /etc/mirror /a
//! RUST_LOG=envmirror::watcher=trace envmirror /etc/mirror /a
//! ```

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: Once = Once::new();

/// Compact time format: HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Initialize logging from the CLI verbosity flag.
///
/// Call once at startup. Safe to call multiple times (only the first call
/// takes effect). Levels: flag absent is `warn`, `-v` is `info`, `-v 2`
/// is `debug`, `-v 3` and above is `trace`. `RUST_LOG` overrides the flag.
pub fn init(verbose: Option<u8>) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            let level = match verbose {
                None | Some(0) => "warn",
                Some(1) => "info",
                Some(2) => "debug",
                Some(_) => "trace",
            };
            EnvFilter::new(level)
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_timer(CompactTime)
            .with_level(true)
            .with_writer(std::io::stderr)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}

/// Log an event with component context.
///
/// # Examples
/// ```ignore
/// log_event!("mirror", "created", "{}", path.display());
/// log_event!("watcher", "started");
/// ```
#[macro_export]
macro_rules! log_event {
    ($component:expr, $event:expr) => {
        tracing::info!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::info!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// Debug-only event logging.
///
/// # Examples
/// ```ignore
/// debug_event!("channel", "released", "{}", path.display());
/// ```
#[macro_export]
macro_rules! debug_event {
    ($component:expr, $event:expr) => {
        tracing::debug!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::debug!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}
