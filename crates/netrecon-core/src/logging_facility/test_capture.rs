//! In-memory event capture for asserting on op boundaries and action lines
//!
//! One process-wide layer is installed on first use; every test shares it,
//! so assertions should key on values unique to the test (op names,
//! external ids).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// One recorded event. The canonical fields are lifted out of `fields`
/// for convenience; `fields` still holds every field by name.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub component: Option<String>,
    pub op: Option<String>,
    pub event: Option<String>,
    pub action: Option<String>,
    pub kind: Option<String>,
    pub external_id: Option<String>,
    pub message: Option<String>,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    fn new(level: Level, fields: BTreeMap<String, String>) -> Self {
        let get = |name: &str| fields.get(name).cloned();
        Self {
            level,
            component: get("component"),
            op: get("op"),
            event: get("event"),
            action: get("action"),
            kind: get("kind"),
            external_id: get("external_id"),
            message: get("message"),
            fields,
        }
    }

    fn is_action(&self, action: &str, kind: &str, external_id: &str) -> bool {
        self.action.as_deref() == Some(action)
            && self.kind.as_deref() == Some(kind)
            && self.external_id.as_deref() == Some(external_id)
    }
}

#[derive(Default)]
struct Fields(BTreeMap<String, String>);

impl Visit for Fields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    // Integers, bools and format_args! all render as expected through Debug.
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }
}

type Sink = Arc<Mutex<Vec<CapturedEvent>>>;

/// Layer appending every event to a shared sink
pub struct TestCaptureLayer {
    sink: Sink,
}

impl TestCaptureLayer {
    pub fn new() -> (Self, TestCapture) {
        let sink = Sink::default();
        (Self { sink: sink.clone() }, TestCapture { sink })
    }
}

impl<S> Layer<S> for TestCaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        event.record(&mut fields);
        let captured = CapturedEvent::new(*event.metadata().level(), fields.0);
        if let Ok(mut sink) = self.sink.lock() {
            sink.push(captured);
        }
    }
}

/// Read side of the capture layer
#[derive(Clone)]
pub struct TestCapture {
    sink: Sink,
}

impl TestCapture {
    /// Snapshot of everything captured so far
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.sink.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Count events matching a predicate
    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CapturedEvent) -> bool,
    {
        self.sink
            .lock()
            .map(|e| e.iter().filter(|ev| predicate(ev)).count())
            .unwrap_or(0)
    }

    /// # Panics
    ///
    /// Panics unless an event with this `op` and `event` was captured.
    pub fn assert_event_exists(&self, op: &str, event: &str) {
        let found = self.count_events(|e| {
            e.op.as_deref() == Some(op) && e.event.as_deref() == Some(event)
        });
        assert!(found > 0, "no event op={} event={} captured", op, event);
    }

    /// # Panics
    ///
    /// Panics unless an action line for this kind and external id was
    /// captured.
    pub fn assert_action_exists(&self, action: &str, kind: &str, external_id: &str) {
        let found = self.count_events(|e| e.is_action(action, kind, external_id));
        assert!(
            found > 0,
            "no action={} kind={} external_id={} captured",
            action,
            kind,
            external_id
        );
    }

    pub fn clear(&self) {
        if let Ok(mut sink) = self.sink.lock() {
            sink.clear();
        }
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the capture layer as the global subscriber (once) and return a
/// handle to it
///
/// ```
/// use netrecon_core::logging_facility::test_capture::init_test_capture;
/// use netrecon_core::log_op_start;
///
/// let capture = init_test_capture();
/// log_op_start!("reconcile");
/// capture.assert_event_exists("reconcile", "start");
/// ```
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let (layer, capture) = TestCaptureLayer::new();
            tracing_subscriber::registry().with(layer).init();
            capture
        })
        .clone()
}
