//! Forwarding of log records and fatal exits to the host.
//!
//! The host sink is process-wide because the tracing subscriber is: one
//! [`HostLogLayer`] is installed with the global subscriber and reads the
//! sink installed by [`install`] on every event.

use std::fmt::{self, Write as _};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwapOption;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use super::callbacks::{EventCallback, LogCallback};

struct LogSink(Arc<dyn LogCallback>);
struct ExitSink(Arc<dyn EventCallback>);

static LOG_SINK: ArcSwapOption<LogSink> = ArcSwapOption::const_empty();
static EXIT_SINK: ArcSwapOption<ExitSink> = ArcSwapOption::const_empty();

/// Route log records to `log` and fatal exits to `events`.
///
/// Calling this again replaces both sinks.
pub fn install(log: Arc<dyn LogCallback>, events: Arc<dyn EventCallback>) {
    LOG_SINK.store(Some(Arc::new(LogSink(log))));
    EXIT_SINK.store(Some(Arc::new(ExitSink(events))));
}

/// Exit with `code`, or hand the exit to the host when one is installed.
pub fn exit(code: i32) {
    match EXIT_SINK.load_full() {
        Some(sink) => sink.0.on_process_exit(code),
        None => std::process::exit(code),
    }
}

/// Host severity numbering for a tracing level.
pub fn host_level(level: &Level) -> i16 {
    match *level {
        Level::ERROR => 2,
        Level::WARN => 3,
        Level::INFO => 4,
        Level::DEBUG => 5,
        Level::TRACE => 6,
    }
}

/// Layer that forwards every event to a [`LogCallback`].
#[derive(Default)]
pub struct HostLogLayer {
    fixed: Option<Arc<dyn LogCallback>>,
}

impl HostLogLayer {
    /// Forward to whatever sink [`install`] set, dropping records until then.
    pub fn global() -> Self {
        Self { fixed: None }
    }

    /// Forward to `callback` regardless of the global sink.
    pub fn with_callback(callback: Arc<dyn LogCallback>) -> Self {
        Self { fixed: Some(callback) }
    }
}

impl<S: Subscriber> Layer<S> for HostLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let global;
        let callback: &dyn LogCallback = match &self.fixed {
            Some(callback) => callback.as_ref(),
            None => {
                global = LOG_SINK.load_full();
                match &global {
                    Some(sink) => sink.0.as_ref(),
                    None => return,
                }
            }
        };

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        callback.on_log(host_level(event.metadata().level()), time, &visitor.finish());
    }
}

/// Renders the `message` field followed by `key=value` pairs.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields
        } else {
            format!("{} {}", self.message, self.fields)
        }
    }

    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{name}={value}");
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.push_field(field.name(), format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            self.push_field(field.name(), format_args!("{value:?}"));
        }
    }
}
