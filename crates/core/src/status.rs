//! Supply-chain stage codec.
//!
//! Stages travel as small integer codes (0=Farm, 1=Distributor, 2=Retailer,
//! 3=Consumer). Anything else decodes to an error, never to a default stage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Label shown for codes outside the defined range. Never stored.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub enum StageStatus {
    Farm,
    Distributor,
    Retailer,
    Consumer,
}

impl StageStatus {
    pub const ALL: [StageStatus; 4] = [
        StageStatus::Farm,
        StageStatus::Distributor,
        StageStatus::Retailer,
        StageStatus::Consumer,
    ];

    /// Decode a wire code. Codes outside `0..=3` are rejected.
    pub fn from_code(code: i64) -> Result<Self, RegistryError> {
        match code {
            0 => Ok(StageStatus::Farm),
            1 => Ok(StageStatus::Distributor),
            2 => Ok(StageStatus::Retailer),
            3 => Ok(StageStatus::Consumer),
            other => Err(RegistryError::invalid(
                "status",
                format!("unrecognized status code {}", other),
            )),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            StageStatus::Farm => 0,
            StageStatus::Distributor => 1,
            StageStatus::Retailer => 2,
            StageStatus::Consumer => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StageStatus::Farm => "Farm",
            StageStatus::Distributor => "Distributor",
            StageStatus::Retailer => "Retailer",
            StageStatus::Consumer => "Consumer",
        }
    }
}

/// Display label for a raw code, `"Unknown"` when it is not a defined stage.
pub fn status_label(code: i64) -> &'static str {
    StageStatus::from_code(code)
        .map(StageStatus::label)
        .unwrap_or(UNKNOWN_LABEL)
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<StageStatus> for u8 {
    fn from(status: StageStatus) -> u8 {
        status.code()
    }
}

impl From<StageStatus> for i64 {
    fn from(status: StageStatus) -> i64 {
        i64::from(status.code())
    }
}

impl TryFrom<i64> for StageStatus {
    type Error = RegistryError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        StageStatus::from_code(code)
    }
}

impl TryFrom<u8> for StageStatus {
    type Error = RegistryError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        StageStatus::from_code(i64::from(code))
    }
}

/// Parses either a numeric code (`"1"`) or a label (`"distributor"`).
impl FromStr for StageStatus {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<i64>() {
            return StageStatus::from_code(code);
        }
        StageStatus::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                RegistryError::invalid("status", format!("unrecognized status '{}'", trimmed))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn codes_round_trip_through_decode() {
        for status in StageStatus::ALL {
            assert_eq!(
                StageStatus::from_code(i64::from(status.code())).unwrap(),
                status
            );
        }
    }

    #[test]
    fn out_of_range_codes_are_invalid_argument() {
        for code in [-1, 4, 255, i64::MAX] {
            let err = StageStatus::from_code(code).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn unknown_codes_get_unknown_label() {
        assert_eq!(status_label(0), "Farm");
        assert_eq!(status_label(3), "Consumer");
        assert_eq!(status_label(4), "Unknown");
        assert_eq!(status_label(-7), "Unknown");
    }

    #[test]
    fn parses_codes_and_labels() {
        assert_eq!("2".parse::<StageStatus>().unwrap(), StageStatus::Retailer);
        assert_eq!(
            "distributor".parse::<StageStatus>().unwrap(),
            StageStatus::Distributor
        );
        assert_eq!(" CONSUMER ".parse::<StageStatus>().unwrap(), StageStatus::Consumer);
        assert!("warehouse".parse::<StageStatus>().is_err());
        assert!("9".parse::<StageStatus>().is_err());
    }

    #[test]
    fn serializes_as_numeric_code() {
        let json = serde_json::to_string(&StageStatus::Retailer).unwrap();
        assert_eq!(json, "2");
        let back: StageStatus = serde_json::from_str("1").unwrap();
        assert_eq!(back, StageStatus::Distributor);
    }

    #[test]
    fn deserializing_unknown_code_fails() {
        assert!(serde_json::from_str::<StageStatus>("7").is_err());
        assert!(serde_json::from_str::<StageStatus>("-1").is_err());
    }
}
