use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use crate::error::MarketDataError;
use crate::utils::TimeUtils;

/// Chart range selected by the user. Each maps to a fixed bucket size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, Default)]
pub enum Timeframe {
    #[serde(rename = "1D")]
    D1,
    #[serde(rename = "1W")]
    W1,
    #[default]
    #[serde(rename = "1M")]
    M1,
    #[serde(rename = "3M")]
    M3,
    #[serde(rename = "1Y")]
    Y1,
    #[serde(rename = "ALL")]
    All,
}

impl Timeframe {
    pub fn label(&self) -> &'static str {
        match self {
            Self::D1 => "1D",
            Self::W1 => "1W",
            Self::M1 => "1M",
            Self::M3 => "3M",
            Self::Y1 => "1Y",
            Self::All => "ALL",
        }
    }

    /// Raw points folded into one bucket under count-based compression.
    pub fn points_per_bucket(&self) -> usize {
        match self {
            Self::D1 => 5,
            Self::W1 => 15,
            Self::M1 => 60,
            Self::M3 => 1440,
            Self::Y1 => 10080,
            Self::All => 43200,
        }
    }

    /// Wall-clock width of one bucket under interval-based compression.
    /// Same table as `points_per_bucket`, read as minutes.
    pub fn bucket_width_ms(&self) -> i64 {
        self.points_per_bucket() as i64 * TimeUtils::MS_IN_MIN
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Timeframe {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::iter()
            .find(|tf| tf.label() == wanted)
            .ok_or_else(|| {
                MarketDataError::PreconditionViolation(format!("Unknown timeframe '{}'", wanted))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_from_str() {
        for tf in Timeframe::iter() {
            assert_eq!(tf.label().parse::<Timeframe>().unwrap(), tf);
        }
        assert_eq!("all".parse::<Timeframe>().unwrap(), Timeframe::All);
        assert_eq!(" 3m ".parse::<Timeframe>().unwrap(), Timeframe::M3);
    }

    #[test]
    fn unknown_label_is_precondition_violation() {
        let err = "5Y".parse::<Timeframe>().unwrap_err();
        assert!(matches!(err, MarketDataError::PreconditionViolation(_)));
    }

    #[test]
    fn ratio_table() {
        let ratios: Vec<usize> = Timeframe::iter().map(|tf| tf.points_per_bucket()).collect();
        assert_eq!(ratios, vec![5, 15, 60, 1440, 10080, 43200]);
        assert_eq!(Timeframe::M1.bucket_width_ms(), TimeUtils::MS_IN_H);
    }
}
