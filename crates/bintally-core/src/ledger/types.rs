//! Bin categories, pickup timestamps and accounting events.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when upstream data violates the snapshot contract
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataQualityError {
    /// A waste type that is not one of the tracked bins
    #[error("unknown bin category: {0:?}")]
    UnknownCategory(String),

    /// A pickup row without a date; indistinguishable from the force-init marker
    #[error("{category} pickup has no date")]
    MissingTimestamp { category: Category },

    /// A weight that is negative, NaN or infinite
    #[error("invalid weight {weight} for {category} pickup at {timestamp}")]
    InvalidWeight {
        category: Category,
        timestamp: Timestamp,
        weight: f64,
    },

    /// A weight string that is not a number
    #[error("unparseable weight {raw:?} for {category} pickup at {timestamp}")]
    UnparseableWeight {
        category: Category,
        timestamp: Timestamp,
        raw: String,
    },
}

/// Bin type tracked by the portal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Recycling
    Green,
    /// Compost
    Brown,
    /// General waste
    Black,
}

impl Category {
    /// Number of tracked categories
    pub const COUNT: usize = 3;

    /// Every tracked category, in ledger order
    pub const ALL: [Category; Category::COUNT] = [Category::Green, Category::Brown, Category::Black];

    /// Position of this category in fixed-size per-category arrays
    pub fn index(self) -> usize {
        match self {
            Category::Green => 0,
            Category::Brown => 1,
            Category::Black => 2,
        }
    }

    /// Lowercase name used in state files, metric labels and output
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Green => "green",
            Category::Brown => "brown",
            Category::Black => "black",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DataQualityError;

    /// Case-insensitive: the portal reports waste types as "Green", "Black", ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "green" => Ok(Category::Green),
            "brown" => Ok(Category::Brown),
            "black" => Ok(Category::Black),
            _ => Err(DataQualityError::UnknownCategory(s.to_string())),
        }
    }
}

/// Pickup time as reported upstream.
///
/// Treated as opaque; the portal emits ISO-like `YYYY-MM-DD HH:MM:SS`
/// strings, so lexicographic order is chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Sentinel that orders before every real timestamp (used by force-init)
    pub fn earliest() -> Self {
        Self(String::new())
    }

    /// Whether this is the force-init sentinel
    pub fn is_earliest(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Timestamp {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A genuinely new pickup, to be accounted into totals and metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub category: Category,
    pub timestamp: Timestamp,
    pub weight: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!("Green".parse::<Category>(), Ok(Category::Green));
        assert_eq!("BROWN".parse::<Category>(), Ok(Category::Brown));
        assert_eq!(" black ".parse::<Category>(), Ok(Category::Black));
    }

    #[test]
    fn test_unknown_category_is_an_error() {
        let err = "purple".parse::<Category>().unwrap_err();
        assert_eq!(err, DataQualityError::UnknownCategory("purple".to_string()));
    }

    #[test]
    fn test_category_index_matches_all() {
        for (i, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
    }

    #[test]
    fn test_category_serializes_lowercase() {
        let json = serde_json::to_string(&Category::Brown).unwrap();
        assert_eq!(json, "\"brown\"");
    }

    #[test]
    fn test_timestamp_ordering() {
        let a = Timestamp::from("2024-01-05 09:12:00");
        let b = Timestamp::from("2024-01-12 08:40:00");
        assert!(a < b);
        assert!(Timestamp::earliest() < a);
        assert!(Timestamp::earliest().is_earliest());
        assert!(!a.is_earliest());
    }
}
