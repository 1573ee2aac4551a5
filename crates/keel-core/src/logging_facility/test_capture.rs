//! In-memory log capture for mutation-protocol assertions
//!
//! Tests install a capturing subscriber and assert on the lifecycle
//! events the snapshot manager emits: op/event pairs, the URN a mutation
//! targeted, checkpoint counters, and stable error codes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// One captured log event
///
/// The fields the mutation protocol asserts on most (`op`, `event`,
/// `urn`, `err_code`) are lifted out of the raw field map.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub op: Option<String>,
    pub event: Option<String>,
    pub urn: Option<String>,
    pub err_code: Option<String>,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    /// Look up any captured field by name
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.as_str())
    }

    fn matches(&self, op: &str, event: &str) -> bool {
        self.op.as_deref() == Some(op) && self.event.as_deref() == Some(event)
    }
}

#[derive(Default)]
struct EventVisitor {
    fields: HashMap<String, String>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.fields
            .insert(field.name().to_string(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }

    // The protocol logs `saved` and `success` outcomes as plain bools
    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }
}

/// Layer that feeds every event into a shared buffer
pub struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CaptureLayer {
    pub fn new() -> (Self, TestCapture) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let layer = Self {
            events: events.clone(),
        };
        (layer, TestCapture { events })
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        let fields = visitor.fields;

        let captured = CapturedEvent {
            level: *event.metadata().level(),
            op: fields.get("op").cloned(),
            event: fields.get("event").cloned(),
            urn: fields.get("urn").cloned(),
            err_code: fields.get("err_code").cloned(),
            fields,
        };

        if let Ok(mut events) = self.events.lock() {
            events.push(captured);
        }
    }
}

/// Handle for asserting on captured events in tests
#[derive(Clone)]
pub struct TestCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCapture {
    /// All captured events, in emission order
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events for one protocol operation, in emission order
    pub fn events_for_op(&self, op: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.op.as_deref() == Some(op))
            .collect()
    }

    /// URNs that produced the given lifecycle event
    pub fn urns_with_event(&self, event: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.event.as_deref() == Some(event))
            .filter_map(|e| e.urn)
            .collect()
    }

    /// Assert that an operation emitted the given lifecycle event
    ///
    /// # Panics
    ///
    /// Panics if no matching event was captured
    pub fn assert_event_exists(&self, op: &str, event: &str) {
        let events = self.events();
        assert!(
            events.iter().any(|e| e.matches(op, event)),
            "expected event op={} event={} not found in {} captured events",
            op,
            event,
            events.len()
        );
    }

    /// Assert that an operation failed with the given stable error code
    ///
    /// # Panics
    ///
    /// Panics if no matching error event was captured
    pub fn assert_error_code(&self, op: &str, code: &str) {
        let events = self.events();
        let found = events.iter().any(|e| {
            e.matches(op, keel_core_types::schema::EVENT_END_ERROR)
                && e.err_code.as_deref() == Some(code)
        });
        assert!(
            found,
            "expected {} error event with code {} not found in {} captured events",
            op,
            code,
            events.len()
        );
    }

    /// Drop all captured events
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the process-wide capture subscriber
///
/// Call at the start of each test that asserts on logs; every call
/// returns a handle to the same shared buffer.
///
/// # Example
///
/// ```
/// use keel_core::logging_facility::test_capture::init_test_capture;
/// use keel_core::log_op_start;
///
/// let capture = init_test_capture();
/// log_op_start!("begin_mutation", urn = "urn-a");
/// capture.assert_event_exists("begin_mutation", "start");
/// ```
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let (layer, capture) = CaptureLayer::new();
            tracing_subscriber::registry().with(layer).init();
            capture
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Scoped subscribers keep these tests off the process-wide capture.
    fn with_capture(f: impl FnOnce()) -> Vec<CapturedEvent> {
        let (layer, capture) = CaptureLayer::new();
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, f);
        capture.events()
    }

    #[test]
    fn test_capture_records_protocol_fields() {
        let events = with_capture(|| {
            tracing::debug!(
                op = "begin_mutation",
                event = "start",
                urn = "urn-a",
                saved = false,
            );
        });

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, Level::DEBUG);
        assert_eq!(events[0].op.as_deref(), Some("begin_mutation"));
        assert_eq!(events[0].event.as_deref(), Some("start"));
        assert_eq!(events[0].urn.as_deref(), Some("urn-a"));
        assert_eq!(events[0].field("saved"), Some("false"));
    }

    #[test]
    fn test_capture_records_error_codes() {
        let events = with_capture(|| {
            tracing::error!(
                op = "close",
                event = "end_error",
                err_code = "ERR_VERIFICATION_FAILED",
            );
        });

        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].err_code.as_deref(),
            Some("ERR_VERIFICATION_FAILED")
        );
    }

    #[test]
    fn test_urns_with_event_filters_by_event() {
        let events_arc;
        {
            let (layer, capture) = CaptureLayer::new();
            let subscriber = tracing_subscriber::registry().with(layer);
            tracing::subscriber::with_default(subscriber, || {
                tracing::debug!(op = "begin_mutation", event = "start", urn = "urn-a");
                tracing::debug!(op = "end_mutation", event = "end", urn = "urn-b");
            });
            events_arc = capture;
        }

        assert_eq!(events_arc.urns_with_event("start"), vec!["urn-a"]);
        assert_eq!(events_arc.urns_with_event("end"), vec!["urn-b"]);
        assert_eq!(events_arc.events_for_op("end_mutation").len(), 1);
    }
}
