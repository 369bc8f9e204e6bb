//! Time-of-day slot for appointments. `"10:00 AM"` strings at the wire,
//! a `NaiveTime` in memory so ordering is a real time comparison rather
//! than a string one.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(NaiveTime);

impl SlotTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%I:%M %p"))
    }
}

impl FromStr for SlotTime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%I:%M %p")
            .map(Self)
            .map_err(|_| {
                CoreError::Validation(format!(
                    "invalid slot time {s:?}, expected the \"10:30 AM\" form"
                ))
            })
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_renders_zero_padded() {
        let slot: SlotTime = "10:00 AM".parse().unwrap();
        assert_eq!(slot.to_string(), "10:00 AM");

        // Unpadded input is accepted, output is always padded
        let slot: SlotTime = "2:15 PM".parse().unwrap();
        assert_eq!(slot.to_string(), "02:15 PM");
        assert_eq!(slot, SlotTime::new(14, 15).unwrap());
    }

    #[test]
    fn orders_by_time_of_day_not_by_string() {
        let morning: SlotTime = "09:00 AM".parse().unwrap();
        let afternoon: SlotTime = "02:00 PM".parse().unwrap();
        // "02:00 PM" < "09:00 AM" as strings; as times the morning comes first
        assert!(morning < afternoon);
        assert!(SlotTime::new(12, 0).unwrap() > SlotTime::new(11, 30).unwrap());
    }

    #[test]
    fn serde_uses_the_display_form() {
        let slot = SlotTime::new(9, 30).unwrap();
        let json = serde_json::to_value(slot).unwrap();
        assert_eq!(json, serde_json::json!("09:30 AM"));

        let back: SlotTime = serde_json::from_value(json).unwrap();
        assert_eq!(back, slot);
    }

    #[test]
    fn rejects_malformed_times() {
        assert!("".parse::<SlotTime>().is_err());
        assert!("10 AM".parse::<SlotTime>().is_err());
        assert!("25:00 AM".parse::<SlotTime>().is_err());
        assert!("10:00".parse::<SlotTime>().is_err());
    }
}
