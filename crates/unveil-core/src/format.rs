//! Digit grouping for ramp displays.

use serde::{Deserialize, Serialize};

/// How an integer is split into digit groups for display.
///
/// The default matches the `en-US` convention (`1,234,567`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigitGrouping {
    /// Inserted between groups. Empty disables grouping.
    pub separator: String,
    /// Digits per group, counted from the right. 0 disables grouping.
    pub group: usize,
}

impl Default for DigitGrouping {
    fn default() -> Self {
        Self::en()
    }
}

impl DigitGrouping {
    /// `1,234`
    pub fn en() -> Self {
        Self {
            separator: ",".to_string(),
            group: 3,
        }
    }

    /// `1.234`
    pub fn de() -> Self {
        Self {
            separator: ".".to_string(),
            group: 3,
        }
    }

    /// `1 234` with a narrow no-break space.
    pub fn fr() -> Self {
        Self {
            separator: "\u{202f}".to_string(),
            group: 3,
        }
    }

    /// No grouping at all.
    pub fn plain() -> Self {
        Self {
            separator: String::new(),
            group: 0,
        }
    }

    /// Format `value` with this grouping.
    pub fn format(&self, value: u64) -> String {
        let digits = value.to_string();
        if self.separator.is_empty() || self.group == 0 {
            return digits;
        }

        let len = digits.len();
        let mut out = String::with_capacity(len + (len / self.group) * self.separator.len());
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (len - i) % self.group == 0 {
                out.push_str(&self.separator);
            }
            out.push(ch);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_values_have_no_separator() {
        let g = DigitGrouping::en();
        assert_eq!(g.format(0), "0");
        assert_eq!(g.format(7), "7");
        assert_eq!(g.format(999), "999");
    }

    #[test]
    fn thousands_are_grouped() {
        let g = DigitGrouping::en();
        assert_eq!(g.format(1234), "1,234");
        assert_eq!(g.format(100_000), "100,000");
        assert_eq!(g.format(1_234_567), "1,234,567");
    }

    #[test]
    fn max_value_groups_cleanly() {
        assert_eq!(
            DigitGrouping::en().format(u64::MAX),
            "18,446,744,073,709,551,615"
        );
    }

    #[test]
    fn alternate_separators() {
        assert_eq!(DigitGrouping::de().format(1234), "1.234");
        assert_eq!(DigitGrouping::fr().format(1234), "1\u{202f}234");
        assert_eq!(DigitGrouping::plain().format(1234), "1234");
    }

    #[test]
    fn deserializes_with_defaults() {
        let g: DigitGrouping = serde_json::from_str(r#"{"separator":"'"}"#).unwrap();
        assert_eq!(g.group, 3);
        assert_eq!(g.format(12345), "12'345");
    }
}
