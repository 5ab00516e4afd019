#![forbid(unsafe_code)]

//! A tracing [`Layer`](tracing_subscriber::Layer) that records spans and
//! events for assertions.
//!
//! ```rust,ignore
//! let logs = with_captured_logs(|| dispatcher.publish(cmd).unwrap());
//! assert!(logs.has_span("cmdx.publish"));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

/// A captured span.
#[derive(Debug, Clone)]
pub struct CapturedSpan {
    pub name: String,
    pub level: Level,
    pub fields: HashMap<String, String>,
    pub parent: Option<String>,
}

/// A captured event with the span it was emitted in.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: HashMap<String, String>,
    pub span: Option<String>,
}

#[derive(Default)]
struct Captured {
    spans: Vec<CapturedSpan>,
    events: Vec<CapturedEvent>,
}

/// Layer recording every span and event it sees.
pub struct LogCapture {
    captured: Arc<Mutex<Captured>>,
}

/// Read side of a [`LogCapture`].
#[derive(Clone)]
pub struct CaptureHandle {
    captured: Arc<Mutex<Captured>>,
}

impl LogCapture {
    #[must_use]
    pub fn new() -> (Self, CaptureHandle) {
        let captured = Arc::new(Mutex::new(Captured::default()));
        (
            Self {
                captured: Arc::clone(&captured),
            },
            CaptureHandle { captured },
        )
    }

    fn lock(&self) -> MutexGuard<'_, Captured> {
        self.captured.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CaptureHandle {
    fn lock(&self) -> MutexGuard<'_, Captured> {
        self.captured.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn spans(&self) -> Vec<CapturedSpan> {
        self.lock().spans.clone()
    }

    #[must_use]
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.lock().events.clone()
    }

    /// Events at exactly `level`.
    #[must_use]
    pub fn events_at(&self, level: Level) -> Vec<CapturedEvent> {
        self.lock()
            .events
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn has_span(&self, name: &str) -> bool {
        self.lock().spans.iter().any(|s| s.name == name)
    }

    /// True if some event message contains `needle`.
    #[must_use]
    pub fn has_message(&self, needle: &str) -> bool {
        self.lock().events.iter().any(|e| e.message.contains(needle))
    }
}

struct FieldVisitor(Vec<(String, String)>);

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for LogCapture
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        let parent = ctx
            .current_span()
            .id()
            .and_then(|id| ctx.span(id))
            .map(|span| span.name().to_string());

        self.lock().spans.push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            level: *attrs.metadata().level(),
            fields: visitor.0.into_iter().collect(),
            parent,
        });
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let mut fields: HashMap<String, String> = visitor.0.into_iter().collect();
        // `message` is formatted through Debug, which is the plain text here.
        let message = fields.remove("message").unwrap_or_default();
        let span = ctx
            .current_span()
            .id()
            .and_then(|id| ctx.span(id))
            .map(|span| span.name().to_string());

        self.lock().events.push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message,
            fields,
            span,
        });
    }
}

/// Run `f` with a capturing subscriber installed on this thread.
pub fn with_captured_logs<F, R>(f: F) -> (R, CaptureHandle)
where
    F: FnOnce() -> R,
{
    let (layer, handle) = LogCapture::new();
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(layer);
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, handle)
}
