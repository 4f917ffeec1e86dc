use crate::models::{RawContractRecord, RawPayload, StrikeRow};
use serde::Serialize;
use std::collections::HashMap;

/// One position of a per-expiry side sequence. `Absent` holds the place of a
/// missing side so CE and PE stay aligned by strike.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChainSlot {
    Present(RawContractRecord),
    Absent,
}

impl ChainSlot {
    pub fn as_record(&self) -> Option<&RawContractRecord> {
        match self {
            ChainSlot::Present(rec) => Some(rec),
            ChainSlot::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ChainSlot::Absent)
    }
}

/// CE and PE sequences for one expiry; always the same length
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpirySides {
    #[serde(rename = "CE")]
    pub call: Vec<ChainSlot>,
    #[serde(rename = "PE")]
    pub put: Vec<ChainSlot>,
}

impl ExpirySides {
    pub fn len(&self) -> usize {
        self.call.len()
    }

    pub fn is_empty(&self) -> bool {
        self.call.is_empty()
    }

    fn push(&mut self, call: ChainSlot, put: ChainSlot) {
        self.call.push(call);
        self.put.push(put);
    }
}

/// Expiry date → aligned CE/PE sequences, rebuilt from scratch per fetch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChainIndex {
    expiries: Vec<String>,
    sides: HashMap<String, ExpirySides>,
}

impl ChainIndex {
    pub fn build(raw: &RawPayload) -> Self {
        let expiries = raw.records.expiry_dates.clone();
        let mut sides = HashMap::with_capacity(expiries.len());

        for expiry in &expiries {
            let mut entry = ExpirySides::default();
            for row in raw.records.data.iter().filter(|row| row_matches(row, expiry)) {
                entry.push(side_slot(row.call.as_ref(), expiry), side_slot(row.put.as_ref(), expiry));
            }
            sides.insert(expiry.clone(), entry);
        }

        Self { expiries, sides }
    }

    /// Expiries in payload order
    pub fn expiries(&self) -> &[String] {
        &self.expiries
    }

    /// First expiry of the payload list
    pub fn default_expiry(&self) -> Option<&str> {
        self.expiries.first().map(String::as_str)
    }

    pub fn get(&self, expiry: &str) -> Option<&ExpirySides> {
        self.sides.get(expiry)
    }

    pub fn contains(&self, expiry: &str) -> bool {
        self.sides.contains_key(expiry)
    }
}

/// Rebuild the index and hand back the ordered expiry list alongside it
pub fn build_index(raw: &RawPayload) -> (ChainIndex, Vec<String>) {
    let index = ChainIndex::build(raw);
    let expiries = index.expiries.clone();
    (index, expiries)
}

fn row_matches(row: &StrikeRow, expiry: &str) -> bool {
    match &row.expiry_date {
        Some(row_expiry) => row_expiry == expiry,
        // Newer payloads drop the row-level date; fall back to the sides
        None => [row.call.as_ref(), row.put.as_ref()]
            .into_iter()
            .flatten()
            .any(|rec| rec.expiry_date.as_deref() == Some(expiry)),
    }
}

fn side_slot(side: Option<&RawContractRecord>, expiry: &str) -> ChainSlot {
    match side {
        Some(rec) if rec.expiry_date.as_deref() == Some(expiry) => ChainSlot::Present(rec.clone()),
        _ => ChainSlot::Absent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> RawPayload {
        serde_json::from_value(value).unwrap()
    }

    fn side(strike: i64, expiry: &str) -> serde_json::Value {
        json!({
            "strikePrice": strike,
            "expiryDate": expiry,
            "openInterest": 100,
            "changeinOpenInterest": 10,
            "lastPrice": 50.0,
            "impliedVolatility": 15.0,
            "change": 2.0
        })
    }

    #[test]
    fn test_sides_are_aligned_with_absent_markers() {
        let raw = payload(json!({
            "records": {
                "expiryDates": ["28-Mar-2024", "04-Apr-2024"],
                "data": [
                    {"strikePrice": 22000, "expiryDate": "28-Mar-2024",
                     "CE": side(22000, "28-Mar-2024"), "PE": side(22000, "28-Mar-2024")},
                    {"strikePrice": 22100, "expiryDate": "28-Mar-2024",
                     "CE": side(22100, "28-Mar-2024")},
                    {"strikePrice": 22200, "expiryDate": "28-Mar-2024",
                     "PE": side(22200, "28-Mar-2024")},
                    {"strikePrice": 22000, "expiryDate": "04-Apr-2024",
                     "CE": side(22000, "04-Apr-2024"), "PE": side(22000, "04-Apr-2024")}
                ]
            }
        }));

        let (index, expiries) = build_index(&raw);
        assert_eq!(expiries, vec!["28-Mar-2024", "04-Apr-2024"]);
        assert_eq!(index.default_expiry(), Some("28-Mar-2024"));

        let march = index.get("28-Mar-2024").unwrap();
        assert_eq!(march.call.len(), 3);
        assert_eq!(march.put.len(), 3);
        assert!(!march.call[1].is_absent());
        assert!(march.put[1].is_absent());
        assert!(march.call[2].is_absent());
        assert!(!march.put[2].is_absent());

        let april = index.get("04-Apr-2024").unwrap();
        assert_eq!(april.len(), 1);
    }

    #[test]
    fn test_side_with_other_expiry_is_absent() {
        let raw = payload(json!({
            "records": {
                "expiryDates": ["28-Mar-2024"],
                "data": [
                    {"expiryDate": "28-Mar-2024",
                     "CE": side(22000, "28-Mar-2024"), "PE": side(22000, "04-Apr-2024")}
                ]
            }
        }));

        let index = ChainIndex::build(&raw);
        let sides = index.get("28-Mar-2024").unwrap();
        assert_eq!(sides.len(), 1);
        assert!(sides.put[0].is_absent());
    }

    #[test]
    fn test_rows_without_row_level_expiry_use_sides() {
        let raw = payload(json!({
            "records": {
                "expiryDates": ["28-Mar-2024", "04-Apr-2024"],
                "data": [
                    {"strikePrice": 22000, "CE": side(22000, "04-Apr-2024")},
                    {"strikePrice": 22000, "PE": side(22000, "28-Mar-2024")}
                ]
            }
        }));

        let index = ChainIndex::build(&raw);
        let march = index.get("28-Mar-2024").unwrap();
        assert_eq!(march.len(), 1);
        assert!(march.call[0].is_absent());
        assert!(march.put[0].as_record().is_some());

        let april = index.get("04-Apr-2024").unwrap();
        assert_eq!(april.len(), 1);
        assert!(april.put[0].is_absent());
    }

    #[test]
    fn test_expiry_without_rows_is_empty_but_present() {
        let raw = payload(json!({
            "records": {"expiryDates": ["25-Apr-2024"], "data": []}
        }));

        let index = ChainIndex::build(&raw);
        assert!(index.contains("25-Apr-2024"));
        assert!(index.get("25-Apr-2024").unwrap().is_empty());
    }

    #[test]
    fn test_build_is_deterministic() {
        let raw = payload(json!({
            "records": {
                "expiryDates": ["28-Mar-2024"],
                "data": [
                    {"expiryDate": "28-Mar-2024", "CE": side(22000, "28-Mar-2024")},
                    {"expiryDate": "28-Mar-2024", "PE": side(22100, "28-Mar-2024")}
                ]
            }
        }));

        assert_eq!(ChainIndex::build(&raw), ChainIndex::build(&raw));
    }
}
