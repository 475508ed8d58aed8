//! Time units for prices, performances and workloads.
//!
//! Instance prices, performance figures and workload sequences each carry
//! their own time unit. Before a problem is formulated, prices and
//! performances are rescaled onto the workload's timeslot length, so a
//! price quoted per year combines correctly with an hourly workload.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit of time attached to a price, a performance figure or a workload.
///
/// A year is 365 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    /// Years
    #[serde(rename = "y")]
    Year,
    /// Hours
    #[serde(rename = "h")]
    Hour,
    /// Minutes
    #[serde(rename = "m")]
    Minute,
    /// Seconds
    #[serde(rename = "s")]
    Second,
}

impl TimeUnit {
    /// Length of this unit in seconds.
    pub fn seconds(&self) -> u64 {
        match self {
            TimeUnit::Year => 365 * 24 * 3600,
            TimeUnit::Hour => 3600,
            TimeUnit::Minute => 60,
            TimeUnit::Second => 1,
        }
    }

    /// Conversion factor that rescales a per-`self` quantity onto a
    /// per-`other` quantity, e.g. `Hour.ratio_to(Year)` is 1/8760.
    pub fn ratio_to(&self, other: TimeUnit) -> f64 {
        other.seconds() as f64 / self.seconds() as f64
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Year => write!(f, "y"),
            TimeUnit::Hour => write!(f, "h"),
            TimeUnit::Minute => write!(f, "m"),
            TimeUnit::Second => write!(f, "s"),
        }
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "y" => Ok(TimeUnit::Year),
            "h" => Ok(TimeUnit::Hour),
            "m" => Ok(TimeUnit::Minute),
            "s" => Ok(TimeUnit::Second),
            _ => Err(format!("unknown time unit '{}'; expected y, h, m or s", s)),
        }
    }
}
