//! Label formatting
//!
//! Turns metric readings into channel names. A [`LabelTemplate`] is a piece
//! of text with a single `{}` placeholder and a [`FormatRule`] deciding how
//! the value is printed into it.

use crate::types::MetricResult;

/// Placeholder replaced by the formatted value
pub const PLACEHOLDER: &str = "{}";

/// How a value is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatRule {
    /// Integer part only, truncated toward zero (`1234.9` → `1234`)
    WholeUnits,
    /// US currency with thousands separators (`$344,400`)
    Currency { decimals: usize },
    /// Fixed number of decimals, no separators (`0.0000012`)
    Fixed { decimals: usize },
}

impl FormatRule {
    /// Format a value according to this rule
    pub fn apply(&self, value: f64) -> String {
        match *self {
            FormatRule::WholeUnits => format!("{:.0}", value.trunc()),
            FormatRule::Currency { decimals } => format_currency(value, decimals),
            FormatRule::Fixed { decimals } => format!("{:.*}", decimals, value),
        }
    }
}

/// Label text plus formatting rule for one target
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTemplate {
    text: String,
    rule: FormatRule,
}

impl LabelTemplate {
    pub fn new(text: impl Into<String>, rule: FormatRule) -> Self {
        Self {
            text: text.into(),
            rule,
        }
    }

    /// Render the reading, or `None` if it is unavailable
    pub fn render(&self, metric: &MetricResult) -> Option<String> {
        metric
            .value
            .map(|v| self.text.replacen(PLACEHOLDER, &self.rule.apply(v), 1))
    }
}

/// Format as US currency, `en-US` style
pub fn format_currency(value: f64, decimals: usize) -> String {
    let digits = format!("{:.*}", decimals, value.abs());
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (digits.as_str(), None),
    };

    let sign = if value < 0.0 { "-" } else { "" };
    match fraction {
        Some(fraction) => format!("{}${}.{}", sign, group_thousands(whole), fraction),
        None => format!("{}${}", sign, group_thousands(whole)),
    }
}

/// Insert `,` every three digits from the right
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Unit;

    #[test]
    fn test_whole_units_truncates() {
        assert_eq!(FormatRule::WholeUnits.apply(1234.5678), "1234");
        assert_eq!(FormatRule::WholeUnits.apply(1234.9999), "1234");
        assert_eq!(FormatRule::WholeUnits.apply(0.4), "0");
    }

    #[test]
    fn test_currency() {
        assert_eq!(format_currency(344400.0, 0), "$344,400");
        assert_eq!(format_currency(12345.678, 2), "$12,345.68");
        assert_eq!(format_currency(999.0, 0), "$999");
        assert_eq!(format_currency(1_000_000.0, 2), "$1,000,000.00");
        assert_eq!(format_currency(0.0, 2), "$0.00");
    }

    #[test]
    fn test_fixed() {
        assert_eq!(FormatRule::Fixed { decimals: 7 }.apply(2.0000002), "2.0000002");
        assert_eq!(FormatRule::Fixed { decimals: 7 }.apply(0.0000012), "0.0000012");
    }

    #[test]
    fn test_template_render() {
        let template = LabelTemplate::new("NFT Floor: {} KAS", FormatRule::WholeUnits);
        let metric = MetricResult::new(1234.5678, Unit::KAS);
        assert_eq!(template.render(&metric).as_deref(), Some("NFT Floor: 1234 KAS"));

        let missing = MetricResult::unavailable(Unit::KAS);
        assert_eq!(template.render(&missing), None);
    }
}
