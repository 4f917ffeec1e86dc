use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Indices the option-chain endpoint is queried for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexSymbol {
    #[serde(rename = "NIFTY")]
    Nifty,
    #[serde(rename = "BANKNIFTY")]
    BankNifty,
}

impl IndexSymbol {
    pub const ALL: [IndexSymbol; 2] = [IndexSymbol::Nifty, IndexSymbol::BankNifty];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexSymbol::Nifty => "NIFTY",
            IndexSymbol::BankNifty => "BANKNIFTY",
        }
    }
}

impl fmt::Display for IndexSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexSymbol {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NIFTY" => Ok(IndexSymbol::Nifty),
            "BANKNIFTY" => Ok(IndexSymbol::BankNifty),
            _ => Err(ChainError::UnsupportedIndex(s.to_string())),
        }
    }
}

/// Numeric field as the exchange sends it: sometimes a number, sometimes a
/// numeric-looking string, occasionally a placeholder such as "-".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for RawNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawNumber::Int(v) => write!(f, "{}", v),
            RawNumber::Float(v) => write!(f, "{}", v),
            RawNumber::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// Top-level response from the option-chain-indices endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPayload {
    pub records: Records,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Records {
    pub data: Vec<StrikeRow>,

    #[serde(rename = "expiryDates")]
    pub expiry_dates: Vec<String>,

    #[serde(default)]
    pub timestamp: Option<String>,

    #[serde(rename = "underlyingValue", default)]
    pub underlying_value: Option<RawNumber>,
}

/// One strike row; either side may be missing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrikeRow {
    #[serde(rename = "strikePrice", default)]
    pub strike_price: Option<RawNumber>,

    #[serde(rename = "expiryDate", default)]
    pub expiry_date: Option<String>,

    #[serde(rename = "CE", default)]
    pub call: Option<RawContractRecord>,

    #[serde(rename = "PE", default)]
    pub put: Option<RawContractRecord>,
}

/// One side of one strike, untouched. Fields the pipeline does not consume
/// are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawContractRecord {
    #[serde(rename = "strikePrice")]
    pub strike_price: Option<RawNumber>,

    #[serde(rename = "expiryDate")]
    pub expiry_date: Option<String>,

    #[serde(rename = "openInterest")]
    pub open_interest: Option<RawNumber>,

    #[serde(rename = "changeinOpenInterest")]
    pub change_in_oi: Option<RawNumber>,

    #[serde(rename = "lastPrice")]
    pub last_price: Option<RawNumber>,

    #[serde(rename = "impliedVolatility")]
    pub implied_volatility: Option<RawNumber>,

    #[serde(rename = "change")]
    pub price_change: Option<RawNumber>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawPayload {
    pub fn underlying_value(&self) -> Option<f64> {
        match self.records.underlying_value.as_ref()? {
            RawNumber::Int(v) => Some(*v as f64),
            RawNumber::Float(v) => Some(*v),
            RawNumber::Text(s) => s.trim().parse().ok(),
        }
    }
}
