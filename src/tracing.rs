//! Tracing output with simulation time.
//!
//! Every runtime publishes its clock to a log clock on each dispatch, so
//! that log lines can be stamped with the simulated time rather than the
//! wall clock. The log clock is only read by [`SimFormat`].

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::time::{Duration, SimTime};
use nu_ansi_term::{Color, Style};
use tracing::{Level, Subscriber};
use tracing_subscriber::{
    filter::Directive,
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields, FormattedFields},
    registry::LookupSpan,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

static LOG_CLOCK: (AtomicU64, AtomicU32) = (AtomicU64::new(0), AtomicU32::new(0));

/// Publishes `time` as the time stamp of subsequent log lines.
pub(crate) fn publish_time(time: SimTime) {
    let duration = time - SimTime::ZERO;
    LOG_CLOCK.0.store(duration.as_secs(), Ordering::SeqCst);
    LOG_CLOCK.1.store(duration.subsec_nanos(), Ordering::SeqCst);
}

/// The simulation time last published by any runtime.
#[must_use]
pub fn log_time() -> SimTime {
    SimTime::from_duration(Duration::new(
        LOG_CLOCK.0.load(Ordering::SeqCst),
        LOG_CLOCK.1.load(Ordering::SeqCst),
    ))
}

/// The log level that will be used if `RUST_LOG` is not defined.
pub const FALLBACK_LOG_LEVEL: Level = Level::INFO;

/// Create a new tracing subscriber with a sim formatter.
///
/// # Errors
///
/// Fails if another global subscriber was already installed.
pub fn try_init(fallback: Level) -> Result<(), TryInitError> {
    tracing_subscriber::fmt()
        .event_format(SimFormat)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Directive::from(fallback))
                .from_env_lossy(),
        )
        .finish()
        .try_init()
}

/// Create a new tracing subscriber with a sim formatter, using
/// [`FALLBACK_LOG_LEVEL`] if `RUST_LOG` is not defined.
///
/// A subscriber that was installed before is kept.
pub fn init() {
    let _ = try_init(FALLBACK_LOG_LEVEL);
}

/// A formatter that includes simulation specific information into the tracing messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimFormat;

macro_rules! maybe_ansi {
    ($style:ident, $ansi:ident, $writer:ident: $($t:tt)*) => {
        MaybeAnsi(format!($($t)*), $style, $ansi).write(&mut $writer)
    };
}

impl<S, N> FormatEvent<S, N> for SimFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let ansi = writer.has_ansi_escapes();

        let dimmed = Style::new().dimmed();
        let bold = Style::new().bold();

        maybe_ansi!(dimmed, ansi, writer: "[ {:>10} ] ", log_time().to_string())?;

        let style = match *meta.level() {
            Level::TRACE => Style::new().fg(Color::Cyan),
            Level::DEBUG => Style::new().fg(Color::Purple),
            Level::INFO => Style::new().fg(Color::Green),
            Level::WARN => Style::new().fg(Color::Yellow),
            _ => Style::new().fg(Color::Red),
        };
        maybe_ansi!(style, ansi, writer: "{:>5} ", meta.level().as_str())?;

        if let Some(scope) = ctx.event_scope() {
            let mut seen = false;
            for span in scope.from_root() {
                maybe_ansi!(bold, ansi, writer: "{}", span.metadata().name())?;
                seen = true;
                let ext = span.extensions();
                if let Some(fields) = &ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        maybe_ansi!(bold, ansi, writer: "{{")?;
                        write!(writer, "{fields}")?;
                        maybe_ansi!(bold, ansi, writer: "}}")?;
                    }
                }
                maybe_ansi!(dimmed, ansi, writer: ":")?;
            }

            if seen {
                writer.write_char(' ')?;
            }
        }

        maybe_ansi!(dimmed, ansi, writer: "{}: ", meta.target())?;

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

struct MaybeAnsi(String, Style, bool);

impl MaybeAnsi {
    fn write(self, writer: &mut Writer<'_>) -> std::fmt::Result {
        if self.2 {
            write!(writer, "{}", self.1.prefix())?;
            write!(writer, "{}", self.0)?;
            write!(writer, "{}", self.1.suffix())
        } else {
            write!(writer, "{}", self.0)
        }
    }
}
