use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SnowChartError};

/// Lookback window offered by the day-range selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum DayRange {
    Week,
    TwoWeeks,
    FourWeeks,
    Quarter,
}

impl DayRange {
    /// All selectable ranges, in selector order
    pub const ALL: [DayRange; 4] = [
        DayRange::Week,
        DayRange::TwoWeeks,
        DayRange::FourWeeks,
        DayRange::Quarter,
    ];

    pub fn days(&self) -> u32 {
        match self {
            DayRange::Week => 7,
            DayRange::TwoWeeks => 14,
            DayRange::FourWeeks => 28,
            DayRange::Quarter => 90,
        }
    }

    /// Parse a raw selector value.
    ///
    /// `""` means nothing was picked yet and yields `Ok(None)`; anything
    /// outside the enumerated set is rejected, surrounding whitespace included.
    pub fn from_selection(selection: &str) -> Result<Option<Self>> {
        match selection {
            "" => Ok(None),
            "7" => Ok(Some(DayRange::Week)),
            "14" => Ok(Some(DayRange::TwoWeeks)),
            "28" => Ok(Some(DayRange::FourWeeks)),
            "90" => Ok(Some(DayRange::Quarter)),
            other => Err(SnowChartError::InvalidDayRange(other.to_string())),
        }
    }
}

impl fmt::Display for DayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.days())
    }
}

impl TryFrom<u32> for DayRange {
    type Error = SnowChartError;

    fn try_from(days: u32) -> Result<Self> {
        DayRange::ALL
            .into_iter()
            .find(|r| r.days() == days)
            .ok_or_else(|| SnowChartError::InvalidDayRange(days.to_string()))
    }
}

impl From<DayRange> for u32 {
    fn from(range: DayRange) -> Self {
        range.days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_selection_is_none() {
        assert_eq!(DayRange::from_selection("").unwrap(), None);
    }

    #[test]
    fn test_known_selections() {
        for range in DayRange::ALL {
            let parsed = DayRange::from_selection(&range.to_string()).unwrap();
            assert_eq!(parsed, Some(range));
        }
    }

    #[test]
    fn test_rejects_values_outside_enum() {
        for raw in ["0", "30", "-7", "7; drop table x", "abc"] {
            let err = DayRange::from_selection(raw).unwrap_err();
            assert!(matches!(err, SnowChartError::InvalidDayRange(_)), "{raw}");
        }
    }

    #[test]
    fn test_padded_values_are_rejected() {
        for raw in [" 7 ", "\t90", "14\n", " "] {
            let err = DayRange::from_selection(raw).unwrap_err();
            assert!(matches!(err, SnowChartError::InvalidDayRange(_)), "{raw:?}");
        }
    }

    #[test]
    fn test_try_from_days() {
        assert_eq!(DayRange::try_from(90).unwrap(), DayRange::Quarter);
        assert!(DayRange::try_from(1).is_err());
    }
}
