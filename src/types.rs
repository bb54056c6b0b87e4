//! Types for the channel ticker

use crate::error::PublishError;
use crate::format::LabelTemplate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Unit a metric is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Unit {
    /// Kaspa
    KAS,
    /// US dollar
    USD,
}

/// One reading of a metric
///
/// `value` is `None` when the reading is unavailable. A present value is
/// always finite and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    /// The reading
    pub value: Option<f64>,

    /// Unit of the reading
    pub unit: Unit,

    /// When the reading was taken
    pub fetched_at: DateTime<Utc>,
}

impl MetricResult {
    /// Create a reading, discarding NaN, infinite and negative values
    pub fn new(value: f64, unit: Unit) -> Self {
        Self::at(Some(value), unit, Utc::now())
    }

    /// Create an unavailable reading
    pub fn unavailable(unit: Unit) -> Self {
        Self::at(None, unit, Utc::now())
    }

    /// Create a reading with an explicit timestamp
    pub fn at(value: Option<f64>, unit: Unit, fetched_at: DateTime<Utc>) -> Self {
        Self {
            // -0.0 passes the sign check but would render as "-0"
            value: value.filter(|v| is_publishable(*v)).map(|v| if v == 0.0 { 0.0 } else { v }),
            unit,
            fetched_at,
        }
    }

    /// True if the reading carries a value
    pub fn is_available(&self) -> bool {
        self.value.is_some()
    }
}

/// A value that may appear in a published label
pub fn is_publishable(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// What a target channel displays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetRole {
    /// NFT collection floor price
    Floor,
    /// Token market capitalization
    MarketCap,
    /// Token spot price
    Spot,
    /// Token 24h trading volume
    Volume,
}

impl TargetRole {
    /// Get the role name used in logs and config
    pub fn name(&self) -> &'static str {
        match self {
            TargetRole::Floor => "floor",
            TargetRole::MarketCap => "market_cap",
            TargetRole::Spot => "spot",
            TargetRole::Volume => "volume",
        }
    }
}

/// A channel whose name displays one metric
#[derive(Debug, Clone)]
pub struct TargetChannel {
    /// What the channel displays
    pub role: TargetRole,

    /// Platform channel identifier
    pub id: String,

    /// Renders a reading into the channel name
    pub template: LabelTemplate,
}

impl TargetChannel {
    pub fn new(role: TargetRole, id: impl Into<String>, template: LabelTemplate) -> Self {
        Self {
            role,
            id: id.into(),
            template,
        }
    }

    /// Render a reading into a label, or `None` if the reading is unavailable
    pub fn label(&self, metric: &MetricResult) -> Option<String> {
        self.template.render(metric)
    }
}

/// Result of one target within a pass
#[derive(Debug, Clone, PartialEq)]
pub enum TargetStatus {
    /// Channel renamed
    Published,
    /// Channel already carried the label
    Unchanged,
    /// Metric could not be read; channel keeps its previous label
    MetricUnavailable,
    /// Resolve or rename failed
    Failed(PublishError),
}

impl TargetStatus {
    /// True if the channel now displays the current reading
    pub fn is_success(&self) -> bool {
        matches!(self, TargetStatus::Published | TargetStatus::Unchanged)
    }
}

/// Summary of one pass, used for logging only
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    /// Identifier attached to the pass span
    pub pass_id: Uuid,

    /// When the pass started
    pub started_at: DateTime<Utc>,

    /// Status per target channel id
    pub per_target: BTreeMap<String, TargetStatus>,
}

impl RefreshOutcome {
    pub fn new() -> Self {
        Self {
            pass_id: Uuid::new_v4(),
            started_at: Utc::now(),
            per_target: BTreeMap::new(),
        }
    }

    /// Record the status of a target
    pub fn record(&mut self, target_id: &str, status: TargetStatus) {
        self.per_target.insert(target_id.to_string(), status);
    }

    /// Status recorded for a target
    pub fn status(&self, target_id: &str) -> Option<&TargetStatus> {
        self.per_target.get(target_id)
    }

    /// Number of targets that now display the current reading
    pub fn succeeded(&self) -> usize {
        self.per_target.values().filter(|s| s.is_success()).count()
    }

    /// Number of targets that failed to publish
    pub fn failed(&self) -> usize {
        self.per_target
            .values()
            .filter(|s| matches!(s, TargetStatus::Failed(_)))
            .count()
    }

    /// Number of targets skipped because their metric was unavailable
    pub fn unavailable(&self) -> usize {
        self.per_target
            .values()
            .filter(|s| matches!(s, TargetStatus::MetricUnavailable))
            .count()
    }
}

impl Default for RefreshOutcome {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RefreshOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pass {}: {} ok, {} failed, {} unavailable",
            self.pass_id,
            self.succeeded(),
            self.failed(),
            self.unavailable()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_result_rejects_unpublishable_values() {
        assert_eq!(MetricResult::new(f64::NAN, Unit::USD).value, None);
        assert_eq!(MetricResult::new(f64::INFINITY, Unit::USD).value, None);
        assert_eq!(MetricResult::new(-1.0, Unit::KAS).value, None);
        assert_eq!(MetricResult::new(0.0, Unit::KAS).value, Some(0.0));
    }

    #[test]
    fn test_negative_zero_is_normalized() {
        let zero = MetricResult::new(-0.0, Unit::KAS);
        assert!(zero.value.unwrap().is_sign_positive());

        let floor = LabelTemplate::new("NFT Floor: {} KAS", crate::format::FormatRule::WholeUnits);
        assert_eq!(floor.render(&zero).as_deref(), Some("NFT Floor: 0 KAS"));

        let spot = LabelTemplate::new("Price: ${}", crate::format::FormatRule::Fixed { decimals: 7 });
        assert_eq!(spot.render(&MetricResult::new(-0.0, Unit::USD)).as_deref(), Some("Price: $0.0000000"));
    }

    #[test]
    fn test_outcome_counts() {
        let mut outcome = RefreshOutcome::new();
        outcome.record("1", TargetStatus::Published);
        outcome.record("2", TargetStatus::Unchanged);
        outcome.record("3", TargetStatus::MetricUnavailable);
        outcome.record("4", TargetStatus::Failed(PublishError::NotFound("4".into())));

        assert_eq!(outcome.succeeded(), 2);
        assert_eq!(outcome.failed(), 1);
        assert_eq!(outcome.unavailable(), 1);
        assert_eq!(outcome.status("1"), Some(&TargetStatus::Published));
    }
}
