use serde::{Deserialize, Serialize};
use std::fmt;

/// Build-up / unwinding label derived from the direction of OI and price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activity {
    #[serde(rename = "Long Build Up")]
    LongBuildUp,
    #[serde(rename = "Long Unwinding")]
    LongUnwinding,
    #[serde(rename = "Short Build Up")]
    ShortBuildUp,
    #[serde(rename = "Short Covering")]
    ShortCovering,
    #[serde(rename = "Not Classified")]
    Unclassified,
}

impl Activity {
    pub const ALL: [Activity; 5] = [
        Activity::LongBuildUp,
        Activity::LongUnwinding,
        Activity::ShortBuildUp,
        Activity::ShortCovering,
        Activity::Unclassified,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Activity::LongBuildUp => "Long Build Up",
            Activity::LongUnwinding => "Long Unwinding",
            Activity::ShortBuildUp => "Short Build Up",
            Activity::ShortCovering => "Short Covering",
            Activity::Unclassified => "Not Classified",
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a strike side by the sign of its OI change and price change.
///
/// Comparisons are strict: a zero (or NaN) price change, or a zero OI change,
/// carries no direction and yields `Unclassified`.
pub fn classify(change_in_oi: i64, change_in_price: f64) -> Activity {
    if change_in_oi > 0 && change_in_price > 0.0 {
        Activity::LongBuildUp
    } else if change_in_oi < 0 && change_in_price < 0.0 {
        Activity::LongUnwinding
    } else if change_in_oi > 0 && change_in_price < 0.0 {
        Activity::ShortBuildUp
    } else if change_in_oi < 0 && change_in_price > 0.0 {
        Activity::ShortCovering
    } else {
        Activity::Unclassified
    }
}
