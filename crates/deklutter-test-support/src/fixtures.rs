//! Canned mailbox-service payloads.

use deklutter_api_models::{SampleMessage, ScanResult};
use serde_json::{Value, json};

/// Deterministic message identifiers `msg-001`, `msg-002`, ...
#[must_use]
pub fn message_ids(count: usize) -> Vec<String> {
    (1..=count).map(|index| format!("msg-{index:03}")).collect()
}

/// A sample descriptor whose fields are derived from `index`.
#[must_use]
pub fn sample_message(index: usize) -> SampleMessage {
    SampleMessage {
        subject: format!("Newsletter #{index}"),
        from: format!("promo{index}@shop.example"),
        date: "Mon, 1 Jan 2024 09:00:00 +0000".to_string(),
        size_kb: 42.5,
    }
}

/// JSON body of a successful scan with the given per-category counts.
///
/// `safe_to_delete` carries exactly `delete` identifiers and the delete
/// samples list is deliberately longer than the display limit.
#[must_use]
pub fn scan_payload(delete: usize, review: usize, keep: usize) -> Value {
    let samples: Vec<Value> = (1..=delete.min(7))
        .map(|index| serde_json::to_value(sample_message(index)).unwrap_or(Value::Null))
        .collect();
    json!({
        "summary": {
            "counts": {"delete": delete, "review": review, "keep": keep},
            "approx_size_mb": 4.2
        },
        "samples": {"delete": samples},
        "safe_to_delete": message_ids(delete)
    })
}

/// Parsed form of [`scan_payload`].
#[must_use]
pub fn scan_result(delete: usize, review: usize, keep: usize) -> ScanResult {
    serde_json::from_value(scan_payload(delete, review, keep)).unwrap_or_default()
}

/// JSON error document as produced by the service's error handlers.
#[must_use]
pub fn error_payload(message: &str) -> Value {
    json!({
        "error": "internal_error",
        "message": message,
        "action": "Please try again"
    })
}
