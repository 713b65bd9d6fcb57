use chrono::Local;
use nu_ansi_term::{Color, Style};
use std::fmt;
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::{EnvFilter, Targets},
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields, FormattedFields},
    prelude::*,
    registry::LookupSpan,
    Layer,
};

/// Target used for per-transfer result lines.
pub const RESULT_TARGET: &str = "transfer_result";

/// Targets logged at INFO by both layers; everything else is WARN.
const INFO_TARGETS: [&str; 3] = [RESULT_TARGET, "taiko_transfer", "core_logic"];

/// Install the console + rolling file subscriber.
///
/// The returned guard flushes the file writer on drop and must outlive the run.
/// `RUST_LOG` replaces the console filter when set.
pub fn setup_logger() -> Option<WorkerGuard> {
    std::fs::create_dir_all("logs").ok();

    let file_appender = tracing_appender::rolling::hourly("logs", "transfer");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // File layer: INFO for results and protocol progress, WARN for dependencies
    let file_filter = Targets::new()
        .with_targets(INFO_TARGETS.map(|target| (target, tracing::Level::INFO)))
        .with_default(tracing::Level::WARN);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(file_filter);

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_directives()));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(TerminalFormatter)
        .with_filter(console_filter);

    let installed = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init();

    match installed {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}

fn console_directives() -> String {
    let mut directives: Vec<String> = INFO_TARGETS
        .iter()
        .map(|target| format!("{}=info", target))
        .collect();
    directives.push("warn".to_string());
    directives.join(",")
}

// --- Formatters ---

struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

fn event_message(event: &Event<'_>) -> String {
    let mut visitor = MessageVisitor {
        message: String::new(),
    };
    event.record(&mut visitor);
    visitor.message
}

fn colorize(msg: String) -> String {
    let green = Style::new().fg(Color::LightGreen).bold();
    let red = Style::new().fg(Color::LightRed).bold();

    if msg.contains("CONFIRMED") || msg.contains("Success") {
        msg.replace("CONFIRMED", &green.paint("CONFIRMED").to_string())
            .replace("Success", &green.paint("Success").to_string())
    } else if msg.contains("FAILED") || msg.contains("Failed") {
        msg.replace("FAILED", &red.paint("FAILED").to_string())
            .replace("Failed", &red.paint("Failed").to_string())
    } else {
        msg
    }
}

pub struct TerminalFormatter;

impl<S, N> FormatEvent<S, N> for TerminalFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let time = Style::new().dimmed().paint(Local::now().format("%H:%M:%S").to_string());
        write!(writer, "[{}] ", time)?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                let ext = span.extensions();
                match ext.get::<FormattedFields<N>>() {
                    Some(fields) if !fields.is_empty() => {
                        write!(writer, "[{} {}] ", span.name(), fields)?
                    }
                    _ => write!(writer, "[{}] ", span.name())?,
                }
            }
        }

        write!(writer, "{}", colorize(event_message(event)))?;
        writeln!(writer)
    }
}

pub struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let level = event.metadata().level();

        write!(writer, "{} [{}] ", timestamp, level)?;
        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                let ext = span.extensions();
                match ext.get::<FormattedFields<N>>() {
                    Some(fields) if !fields.is_empty() => {
                        write!(writer, "[{} {}] ", span.name(), fields)?
                    }
                    _ => write!(writer, "[{}] ", span.name())?,
                }
            }
        }
        writeln!(writer, "{}", event_message(event))
    }
}
