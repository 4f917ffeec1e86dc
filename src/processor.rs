use crate::chain::ChainIndex;
use crate::error::{ChainError, Result};
use crate::models::{RawContractRecord, RawNumber};
use crate::rules::{classify, Activity};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Typed, classified view of one side of one strike
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub strike_price: i64,
    pub open_interest: i64,
    #[serde(rename = "change_oi")]
    pub change_in_oi: i64,
    pub last_price: f64,
    #[serde(rename = "iv")]
    pub implied_volatility: f64,
    #[serde(rename = "activity_type")]
    pub activity: Activity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "CE")]
    Call,
    #[serde(rename = "PE")]
    Put,
}

/// Both sides of one expiry, restricted to strikes where CE and PE are present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedChainView {
    pub expiry: String,
    #[serde(rename = "CE")]
    pub call: Vec<NormalizedRecord>,
    #[serde(rename = "PE")]
    pub put: Vec<NormalizedRecord>,
    /// Row of maximum open interest in `call`, first one on ties
    pub ce_max_oi_row: Option<usize>,
    pub pe_max_oi_row: Option<usize>,
    /// Positions dropped because one side was absent
    pub excluded: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideTotals {
    pub total_oi: i64,
    pub total_change_oi: i64,
}

/// Aggregates the presentation layer charts next to the tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub ce_totals: SideTotals,
    pub pe_totals: SideTotals,
    pub put_call_ratio: Option<f64>,
    pub ce_activity: Vec<(Activity, usize)>,
    pub pe_activity: Vec<(Activity, usize)>,
}

// -----------------------------------------------
// COERCION
// -----------------------------------------------

fn require<'a>(value: Option<&'a RawNumber>, field: &'static str) -> Result<&'a RawNumber> {
    value.ok_or_else(|| ChainError::coercion(field, "missing"))
}

/// Integer field; fractional numbers truncate toward zero, strings must be integral
fn coerce_int(value: Option<&RawNumber>, field: &'static str) -> Result<i64> {
    match require(value, field)? {
        RawNumber::Int(v) => Ok(*v),
        RawNumber::Float(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(f.trunc() as i64),
        RawNumber::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ChainError::coercion(field, format!("{:?}", s))),
        other => Err(ChainError::coercion(field, other.to_string())),
    }
}

fn coerce_decimal(value: Option<&RawNumber>, field: &'static str) -> Result<f64> {
    match require(value, field)? {
        RawNumber::Int(v) => Ok(*v as f64),
        RawNumber::Float(f) => Ok(*f),
        RawNumber::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ChainError::coercion(field, format!("{:?}", s))),
    }
}

// -----------------------------------------------
// NORMALIZATION
// -----------------------------------------------

/// Coerce a raw record into its typed form and classify it
pub fn normalize(entry: &RawContractRecord) -> Result<NormalizedRecord> {
    let change_in_oi = coerce_int(entry.change_in_oi.as_ref(), "changeinOpenInterest")?;
    let price_change = coerce_decimal(entry.price_change.as_ref(), "change")?;

    Ok(NormalizedRecord {
        strike_price: coerce_int(entry.strike_price.as_ref(), "strikePrice")?,
        open_interest: coerce_int(entry.open_interest.as_ref(), "openInterest")?,
        change_in_oi,
        last_price: coerce_decimal(entry.last_price.as_ref(), "lastPrice")?,
        implied_volatility: coerce_decimal(entry.implied_volatility.as_ref(), "impliedVolatility")?,
        activity: classify(change_in_oi, price_change),
    })
}

/// Build the CE/PE view for `expiry`. Positions with an absent side are
/// skipped for both sides; any coercion failure aborts the whole view.
pub fn build_view(index: &ChainIndex, expiry: &str) -> Result<NormalizedChainView> {
    let sides = index.get(expiry).ok_or_else(|| ChainError::NotFound {
        expiry: expiry.to_string(),
    })?;

    let mut call = Vec::with_capacity(sides.len());
    let mut put = Vec::with_capacity(sides.len());
    let mut excluded = 0;

    for (ce, pe) in sides.call.iter().zip(sides.put.iter()) {
        match (ce.as_record(), pe.as_record()) {
            (Some(ce), Some(pe)) => {
                call.push(normalize(ce)?);
                put.push(normalize(pe)?);
            }
            _ => excluded += 1,
        }
    }

    if excluded > 0 {
        debug!(expiry, excluded, "skipped strikes with a missing side");
    }

    Ok(NormalizedChainView {
        expiry: expiry.to_string(),
        ce_max_oi_row: max_oi_row(&call),
        pe_max_oi_row: max_oi_row(&put),
        call,
        put,
        excluded,
    })
}

/// Position of the highest open interest; ties keep the first
pub fn max_oi_row(records: &[NormalizedRecord]) -> Option<usize> {
    records
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, i64)>, (idx, rec)| match best {
            Some((_, oi)) if oi >= rec.open_interest => best,
            _ => Some((idx, rec.open_interest)),
        })
        .map(|(idx, _)| idx)
}

// -----------------------------------------------
// AGGREGATES
// -----------------------------------------------

impl NormalizedChainView {
    pub fn side(&self, side: Side) -> &[NormalizedRecord] {
        match side {
            Side::Call => &self.call,
            Side::Put => &self.put,
        }
    }

    pub fn max_oi_row(&self, side: Side) -> Option<usize> {
        match side {
            Side::Call => self.ce_max_oi_row,
            Side::Put => self.pe_max_oi_row,
        }
    }

    pub fn len(&self) -> usize {
        self.call.len()
    }

    pub fn is_empty(&self) -> bool {
        self.call.is_empty()
    }

    pub fn totals(&self, side: Side) -> SideTotals {
        self.side(side).iter().fold(SideTotals::default(), |acc, rec| SideTotals {
            total_oi: acc.total_oi + rec.open_interest,
            total_change_oi: acc.total_change_oi + rec.change_in_oi,
        })
    }

    /// PE open interest over CE open interest
    pub fn put_call_ratio(&self) -> Option<f64> {
        let ce = self.totals(Side::Call).total_oi;
        if ce == 0 {
            return None;
        }
        Some(self.totals(Side::Put).total_oi as f64 / ce as f64)
    }

    /// Count per activity label, in label order
    pub fn activity_counts(&self, side: Side) -> Vec<(Activity, usize)> {
        let records = self.side(side);
        Activity::ALL
            .iter()
            .map(|activity| {
                let count = records.iter().filter(|r| r.activity == *activity).count();
                (*activity, count)
            })
            .collect()
    }

    /// (strike, open interest, change in OI) sorted by strike
    pub fn oi_series(&self, side: Side) -> Vec<(i64, i64, i64)> {
        let mut series: Vec<(i64, i64, i64)> = self
            .side(side)
            .iter()
            .map(|r| (r.strike_price, r.open_interest, r.change_in_oi))
            .collect();
        series.sort_by_key(|(strike, _, _)| *strike);
        series
    }

    pub fn summary(&self) -> ChainSummary {
        ChainSummary {
            ce_totals: self.totals(Side::Call),
            pe_totals: self.totals(Side::Put),
            put_call_ratio: self.put_call_ratio(),
            ce_activity: self.activity_counts(Side::Call),
            pe_activity: self.activity_counts(Side::Put),
        }
    }
}
