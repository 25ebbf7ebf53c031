//! Stderr logging for the ranging tools.
//!
//! Lines look like `  0.412s  INFO aruco_range::pipeline: message`. The
//! level can be raised or lowered after installation by calling
//! [`init_with_level`] again. With the `tracing` feature, [`init_tracing`]
//! installs a `tracing-subscriber` formatter instead.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::LazyLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, fmt::format::FmtSpan, util::SubscriberInitExt, EnvFilter};

static START: LazyLock<Instant> = LazyLock::new(Instant::now);
static INSTALLED: AtomicBool = AtomicBool::new(false);
static LOGGER: RangeLogger = RangeLogger {
    max: AtomicUsize::new(LevelFilter::Info as usize),
};

struct RangeLogger {
    max: AtomicUsize,
}

impl RangeLogger {
    fn max_level(&self) -> usize {
        self.max.load(Ordering::Relaxed)
    }
}

impl Log for RangeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        (metadata.level() as usize) <= self.max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut err = std::io::stderr().lock();
        let _ = writeln!(
            err,
            "{:>8.3}s {:>5} {}: {}",
            START.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Install the stderr logger, or update its level if already installed.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    LazyLock::force(&START);
    LOGGER.max.store(level as usize, Ordering::Relaxed);
    if !INSTALLED.swap(true, Ordering::AcqRel) {
        if let Err(e) = log::set_logger(&LOGGER) {
            INSTALLED.store(false, Ordering::Release);
            return Err(e);
        }
    }
    log::set_max_level(level);
    Ok(())
}

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `info`).
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}
