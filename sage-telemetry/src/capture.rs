use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::{Event, Subscriber};
use tracing_subscriber::{Layer, layer::Context};

/// A log event recorded by [`CaptureLayer`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapturedEvent {
    pub level: String,
    pub target: String,
    pub message: String,
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl CapturedEvent {
    /// A field rendered as text, if present.
    pub fn field(&self, name: &str) -> Option<String> {
        self.fields.get(name).map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Shared, cloneable store of captured events.
#[derive(Debug, Clone, Default)]
pub struct EventCapture {
    events: Arc<RwLock<Vec<CapturedEvent>>>,
}

impl EventCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A layer that records into this store.
    pub fn layer(&self) -> CaptureLayer {
        CaptureLayer { storage: self.clone() }
    }

    /// Snapshot of everything captured so far.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.read().map(|events| events.clone()).unwrap_or_default()
    }

    /// The first event whose message contains `needle`.
    pub fn find(&self, needle: &str) -> Option<CapturedEvent> {
        self.events().into_iter().find(|event| event.message.contains(needle))
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.write() {
            events.clear();
        }
    }

    fn push(&self, event: CapturedEvent) {
        if let Ok(mut events) = self.events.write() {
            events.push(event);
        }
    }
}

/// A tracing layer that keeps events in memory.
pub struct CaptureLayer {
    storage: EventCapture,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        let mut fields = visitor.0;

        let message = match fields.remove("message") {
            Some(serde_json::Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let metadata = event.metadata();
        self.storage.push(CapturedEvent {
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message,
            fields,
        });
    }
}

#[derive(Default)]
struct JsonVisitor(BTreeMap<String, serde_json::Value>);

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn records_message_level_and_fields() {
        let capture = EventCapture::new();
        let subscriber = tracing_subscriber::registry().with(capture.layer());

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(collection = "oracle_knowledge_base", chunk_count = 3u64, "ingested");
            tracing::error!(error = %"HTTP 429", retry = false, "embedding failed");
        });

        let events = capture.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, "WARN");
        assert_eq!(events[0].message, "ingested");
        assert_eq!(events[0].field("collection").as_deref(), Some("oracle_knowledge_base"));
        assert_eq!(events[0].fields["chunk_count"], serde_json::json!(3));

        let failure = capture.find("embedding").unwrap();
        assert_eq!(failure.level, "ERROR");
        assert_eq!(failure.field("error").as_deref(), Some("HTTP 429"));
        assert_eq!(failure.field("retry").as_deref(), Some("false"));

        capture.clear();
        assert!(capture.events().is_empty());
    }

    #[test]
    fn serializes_for_log_dumps() {
        let event = CapturedEvent {
            level: "INFO".to_string(),
            target: "sage_rag::pipeline".to_string(),
            message: "query completed".to_string(),
            fields: BTreeMap::from([("result_count".to_string(), serde_json::json!(2))]),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"target\":\"sage_rag::pipeline\""));
        assert!(json.contains("\"result_count\":2"));
    }
}
