#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
//! Shared HTTP DTOs for the Deklutter mailbox service.
//!
//! These types mirror the JSON contract of the `/oauth` and `/gmail` endpoints
//! so the session core and the CLI encode requests and decode responses from
//! a single definition. Constructors enforce the request invariants: a scan
//! window is one of a fixed set of lookbacks, and an apply request can only be
//! built from the `safe_to_delete` list of a scan result.
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize, de};

/// Number of sample messages rendered per triage category.
pub const SAMPLE_DISPLAY_LIMIT: usize = 5;

/// Default number of messages requested per scan.
pub const DEFAULT_SCAN_LIMIT: u32 = 100;

/// Days trashed messages stay recoverable on the provider side.
pub const TRASH_RETENTION_DAYS: u32 = 30;

/// Lookback windows accepted by the scan endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum LookbackWindow {
    /// Last 7 days.
    Week,
    /// Last 30 days.
    #[default]
    Month,
    /// Last 90 days.
    Quarter,
    /// Last 180 days.
    HalfYear,
    /// Last 365 days.
    Year,
}

impl LookbackWindow {
    /// Every supported window, shortest first.
    pub const ALL: [Self; 5] = [
        Self::Week,
        Self::Month,
        Self::Quarter,
        Self::HalfYear,
        Self::Year,
    ];

    /// Window length in days.
    #[must_use]
    pub const fn days(self) -> u16 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
            Self::HalfYear => 180,
            Self::Year => 365,
        }
    }

    /// Human-readable label used by renderers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Week => "7 days",
            Self::Month => "30 days",
            Self::Quarter => "90 days",
            Self::HalfYear => "6 months",
            Self::Year => "1 year",
        }
    }
}

impl From<LookbackWindow> for u16 {
    fn from(value: LookbackWindow) -> Self {
        value.days()
    }
}

impl TryFrom<u16> for LookbackWindow {
    type Error = UnsupportedWindow;

    fn try_from(days: u16) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|window| window.days() == days)
            .ok_or(UnsupportedWindow { days })
    }
}

impl Display for LookbackWindow {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Returned when a day count is not one of the supported lookback windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedWindow {
    /// Offending day count.
    pub days: u16,
}

impl Display for UnsupportedWindow {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "unsupported lookback of {} days (expected 7, 30, 90, 180 or 365)",
            self.days
        )
    }
}

impl std::error::Error for UnsupportedWindow {}

/// Body of `POST /gmail/scan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// How far back the service should look.
    pub days_back: LookbackWindow,
    /// Upper bound on scanned messages.
    pub limit: u32,
}

impl ScanRequest {
    /// Build a scan request; a zero limit is rejected.
    #[must_use]
    pub const fn new(days_back: LookbackWindow, limit: u32) -> Option<Self> {
        if limit == 0 {
            None
        } else {
            Some(Self { days_back, limit })
        }
    }
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self {
            days_back: LookbackWindow::default(),
            limit: DEFAULT_SCAN_LIMIT,
        }
    }
}

/// Triage category assigned by the service to each scanned message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageCategory {
    /// Safe to move to trash.
    Delete,
    /// Needs a human look.
    Review,
    /// Important; leave alone.
    Keep,
}

impl TriageCategory {
    /// Stable lower-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Review => "review",
            Self::Keep => "keep",
        }
    }
}

/// Per-category message counts. Missing categories count as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageCounts {
    /// Messages proposed for deletion.
    #[serde(default)]
    pub delete: u64,
    /// Messages needing review.
    #[serde(default)]
    pub review: u64,
    /// Messages to keep.
    #[serde(default)]
    pub keep: u64,
}

impl TriageCounts {
    /// Count for a single category.
    #[must_use]
    pub const fn get(&self, category: TriageCategory) -> u64 {
        match category {
            TriageCategory::Delete => self.delete,
            TriageCategory::Review => self.review,
            TriageCategory::Keep => self.keep,
        }
    }
}

/// Aggregate view of one scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Counts keyed by triage category.
    #[serde(default)]
    pub counts: TriageCounts,
    /// Estimated reclaimable storage in megabytes. Never negative.
    #[serde(
        default,
        deserialize_with = "non_negative_size",
        skip_serializing_if = "Option::is_none"
    )]
    pub approx_size_mb: Option<f64>,
}

fn non_negative_size<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        Some(size) if !(size.is_finite() && size >= 0.0) => Err(de::Error::custom(format!(
            "approx_size_mb must be a non-negative number, got {size}"
        ))),
        size => Ok(size),
    }
}

/// Descriptor of one sample message shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleMessage {
    /// Subject header.
    #[serde(default)]
    pub subject: String,
    /// Sender header.
    #[serde(default)]
    pub from: String,
    /// Date header as sent by the service.
    #[serde(default)]
    pub date: String,
    /// Message size in kilobytes.
    #[serde(default)]
    pub size_kb: f64,
}

/// Sample messages for the categories the service chose to include.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Samples {
    /// Samples from the delete set.
    #[serde(default)]
    pub delete: Vec<SampleMessage>,
    /// Samples from the review set.
    #[serde(default)]
    pub review: Vec<SampleMessage>,
    /// Samples from the keep set.
    #[serde(default)]
    pub keep: Vec<SampleMessage>,
}

impl Samples {
    /// All samples the service returned for a category.
    #[must_use]
    pub fn for_category(&self, category: TriageCategory) -> &[SampleMessage] {
        match category {
            TriageCategory::Delete => &self.delete,
            TriageCategory::Review => &self.review,
            TriageCategory::Keep => &self.keep,
        }
    }
}

/// Response of `POST /gmail/scan`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Counts and size estimate.
    pub summary: ScanSummary,
    /// Sample messages per category.
    #[serde(default)]
    pub samples: Samples,
    /// Identifiers eligible for bulk deletion, in service order.
    #[serde(default)]
    pub safe_to_delete: Vec<String>,
    /// Identifiers the service wants reviewed. Informational only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub review: Vec<String>,
    /// Identifiers the service wants kept. Informational only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keep: Vec<String>,
}

impl ScanResult {
    /// Samples for display, truncated to [`SAMPLE_DISPLAY_LIMIT`].
    #[must_use]
    pub fn display_samples(&self, category: TriageCategory) -> &[SampleMessage] {
        let all = self.samples.for_category(category);
        &all[..all.len().min(SAMPLE_DISPLAY_LIMIT)]
    }

    /// Whether the result offers anything to clean up.
    #[must_use]
    pub fn has_deletions(&self) -> bool {
        !self.safe_to_delete.is_empty()
    }
}

/// Deletion mode understood by the apply endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupMode {
    /// Move to trash; recoverable for [`TRASH_RETENTION_DAYS`].
    #[default]
    Trash,
}

/// Body of `POST /gmail/apply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyRequest {
    message_ids: Vec<String>,
    mode: CleanupMode,
}

impl ApplyRequest {
    /// Build the request from a scan result's `safe_to_delete` set.
    ///
    /// Returns `None` when there is nothing to delete, so an empty request is
    /// never constructed.
    #[must_use]
    pub fn from_scan(result: &ScanResult) -> Option<Self> {
        if result.safe_to_delete.is_empty() {
            return None;
        }
        Some(Self {
            message_ids: result.safe_to_delete.clone(),
            mode: CleanupMode::Trash,
        })
    }

    /// Identifiers that will be trashed.
    #[must_use]
    pub fn message_ids(&self) -> &[String] {
        &self.message_ids
    }

    /// Deletion mode.
    #[must_use]
    pub const fn mode(&self) -> CleanupMode {
        self.mode
    }
}

/// Response of `POST /gmail/apply`. The body is otherwise opaque, so every
/// field is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    /// Messages moved to trash, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<u64>,
    /// Messages labelled instead of trashed, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labeled: Option<u64>,
}

/// Response of `POST /oauth/google/init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationStart {
    /// Provider consent URL the user must visit.
    pub auth_url: String,
    /// Provider echoed by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Source echoed by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Error document returned by the service on non-success statuses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceErrorBody {
    /// User-facing message.
    #[serde(default)]
    pub message: Option<String>,
    /// Machine-readable error code.
    #[serde(default)]
    pub error: Option<String>,
    /// Suggested remediation.
    #[serde(default)]
    pub action: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookback_window_accepts_only_supported_days() {
        for window in LookbackWindow::ALL {
            assert_eq!(LookbackWindow::try_from(window.days()), Ok(window));
        }
        assert_eq!(
            LookbackWindow::try_from(14),
            Err(UnsupportedWindow { days: 14 })
        );
        assert!(serde_json::from_value::<LookbackWindow>(json!(60)).is_err());
    }

    #[test]
    fn scan_request_serialises_day_count() {
        let request = ScanRequest::new(LookbackWindow::Month, 100).expect("non-zero limit");
        assert_eq!(
            serde_json::to_value(request).expect("serialise"),
            json!({"days_back": 30, "limit": 100})
        );
        assert!(ScanRequest::new(LookbackWindow::Week, 0).is_none());
        assert_eq!(ScanRequest::default(), request);
    }

    #[test]
    fn scan_result_tolerates_partial_payloads() {
        let result: ScanResult = serde_json::from_value(json!({
            "summary": {"counts": {"delete": 2}},
            "safe_to_delete": ["a", "b"]
        }))
        .expect("partial payload parses");
        assert_eq!(result.summary.counts.delete, 2);
        assert_eq!(result.summary.counts.review, 0);
        assert!(result.summary.approx_size_mb.is_none());
        assert!(result.samples.delete.is_empty());
        assert!(result.has_deletions());
    }

    #[test]
    fn negative_counts_are_rejected() {
        let parsed = serde_json::from_value::<ScanResult>(json!({
            "summary": {"counts": {"delete": -1, "review": 0, "keep": 0}},
            "safe_to_delete": []
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn negative_size_estimate_is_rejected() {
        let parsed = serde_json::from_value::<ScanSummary>(json!({
            "counts": {"delete": 1},
            "approx_size_mb": -3.0
        }));
        assert!(parsed.is_err());

        let summary: ScanSummary =
            serde_json::from_value(json!({"approx_size_mb": 0.0})).expect("zero is valid");
        assert_eq!(summary.approx_size_mb, Some(0.0));
        let summary: ScanSummary =
            serde_json::from_value(json!({"approx_size_mb": null})).expect("null is absent");
        assert!(summary.approx_size_mb.is_none());
    }

    #[test]
    fn display_samples_truncate_to_limit() {
        let sample = SampleMessage {
            subject: "Weekly digest".into(),
            from: "news@example.com".into(),
            date: "Mon, 1 Jan 2024".into(),
            size_kb: 12.5,
        };
        let result = ScanResult {
            samples: Samples {
                delete: vec![sample.clone(); 8],
                review: vec![sample; 2],
                keep: Vec::new(),
            },
            ..ScanResult::default()
        };
        assert_eq!(result.display_samples(TriageCategory::Delete).len(), 5);
        assert_eq!(result.display_samples(TriageCategory::Review).len(), 2);
        assert!(result.display_samples(TriageCategory::Keep).is_empty());
    }

    #[test]
    fn apply_request_only_built_from_non_empty_delete_set() {
        assert!(ApplyRequest::from_scan(&ScanResult::default()).is_none());

        let result = ScanResult {
            safe_to_delete: vec!["m1".into(), "m2".into()],
            ..ScanResult::default()
        };
        let request = ApplyRequest::from_scan(&result).expect("request");
        assert_eq!(request.message_ids(), ["m1", "m2"]);
        assert_eq!(
            serde_json::to_value(&request).expect("serialise"),
            json!({"message_ids": ["m1", "m2"], "mode": "trash"})
        );
    }

    #[test]
    fn apply_outcome_defaults_when_fields_missing() {
        let outcome: ApplyOutcome = serde_json::from_value(json!({})).expect("parse");
        assert_eq!(outcome, ApplyOutcome::default());
        let outcome: ApplyOutcome =
            serde_json::from_value(json!({"deleted": 3, "labeled": 0})).expect("parse");
        assert_eq!(outcome.deleted, Some(3));
    }
}
