//! Tests for injected collaborators.

use super::*;
use chrono::{TimeZone, Utc};

fn noon() -> Timestamp {
    Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
}

struct ShoutingBuilder;

impl MessageBuilder for ShoutingBuilder {
    fn format_message(&self, mut record: MessageRecord) -> MessageRecord {
        record.body = record.body.to_uppercase();
        record
    }
}

#[test]
fn test_default_builder_keeps_body_and_context() {
    let deps = QueueDependencies::new()
        .with_clock(Arc::new(FixedClock::new(noon())))
        .with_identity(Arc::new(StaticIdentity::new("alice")));

    let record = deps.build_record("hello", Some("mail"));

    assert_eq!(record.body, "hello");
    assert_eq!(record.created_on, noon());
    assert_eq!(record.sender_id.as_deref(), Some("alice"));
    assert_eq!(record.category.as_deref(), Some("mail"));
    assert!(deps.builder.before_send(&record));
}

#[test]
fn test_anonymous_identity_leaves_sender_empty() {
    let deps = QueueDependencies::default();
    let record = deps.build_record("hello", None);
    assert_eq!(record.sender_id, None);
    assert_eq!(record.category, None);
}

#[test]
fn test_format_stage_runs_after_creation() {
    let deps = QueueDependencies::new().with_builder(Arc::new(ShoutingBuilder));
    let record = deps.build_record("quiet please", None);
    assert_eq!(record.body, "QUIET PLEASE");
}

#[test]
fn test_event_levels() {
    let queue = "notifications".to_string();
    assert_eq!(
        QueueEvent::Sent {
            queue: queue.clone(),
            body: "x".to_string()
        }
        .level(),
        QueueEventLevel::Info
    );
    assert_eq!(
        QueueEvent::SendCancelled {
            queue: queue.clone(),
            body: "x".to_string()
        }
        .level(),
        QueueEventLevel::Info
    );
    assert_eq!(
        QueueEvent::QueueFull {
            queue: queue.clone()
        }
        .level(),
        QueueEventLevel::Error
    );
    let failed = QueueEvent::ReceiveFailed {
        queue,
        reason: "EIDRM".to_string(),
    };
    assert_eq!(failed.level(), QueueEventLevel::Error);
    assert_eq!(failed.queue(), "notifications");
}

#[test]
fn test_tracing_sink_accepts_every_event_without_subscriber() {
    let sink = TracingLogSink;
    sink.record(&QueueEvent::MalformedEntry {
        queue: "q".to_string(),
        reason: "bad json".to_string(),
    });
    sink.record(&QueueEvent::SendFailed {
        queue: "q".to_string(),
        body: "b".to_string(),
        reason: "full".to_string(),
    });
}
