//! Prices in minor currency units.

use serde::{Deserialize, Serialize};

/// A price stored as an integer count of minor currency units (e.g. cents).
///
/// Stored products carry integers only; formatting is done on display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    /// Number of minor units per major unit.
    pub const MINOR_PER_MAJOR: i64 = 100;

    /// Create a price from minor units.
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Amount in minor units.
    #[must_use]
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    /// Whether no price has been set.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Format for display, e.g. `$12.345,50` (Chilean grouping).
    #[must_use]
    pub fn display(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let major = abs / Self::MINOR_PER_MAJOR.unsigned_abs();
        let minor = abs % Self::MINOR_PER_MAJOR.unsigned_abs();

        let digits = major.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }

        format!("{sign}${grouped},{minor:02}")
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}
