/// Depth feed record types
///
/// Two layers live here. The strict records handed to the book:
///   - Snapshot: full book state at `last_update_id`
///   - PartialUpdate: level changes covering `[first_update_id, last_update_id]`
///
/// And the loose wire shapes they are decoded from (see `decoder`):
///   - snapshot JSON:  {"lastUpdateId": int, "bids": [level..], "asks": [level..]}
///   - diff JSON:      {"stream": str, "data": {"e": "depthUpdate", "U": int, "u": int, "b": [..], "a": [..]}}
///   - level:          {"price": p, "qty": q} or [p, q], p/q numbers or numeric strings

use serde::Deserialize;

use crate::levels::PriceLevel;

/// Separates the capture prefix from the JSON payload on each record line
pub const RECORD_SEPARATOR: char = '|';

pub const DEPTH_UPDATE_EVENT: &str = "depthUpdate";

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub last_update_id: i64,
}

impl Snapshot {
    pub fn new(bids: Vec<PriceLevel>, asks: Vec<PriceLevel>, last_update_id: i64) -> Self {
        Snapshot {
            bids,
            asks,
            last_update_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartialUpdate {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub first_update_id: i64,
    pub last_update_id: i64,
}

impl PartialUpdate {
    pub fn new(
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
        first_update_id: i64,
        last_update_id: i64,
    ) -> Self {
        PartialUpdate {
            bids,
            asks,
            first_update_id,
            last_update_id,
        }
    }
}

/// Price or quantity as it appears on the wire
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

/// A level in either accepted shape
// Pair must come first: serde also lets a struct variant match a sequence.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawLevel {
    Pair(RawNumber, RawNumber),
    Object { price: RawNumber, qty: RawNumber },
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSnapshot {
    #[serde(rename = "lastUpdateId")]
    pub last_update_id: i64,
    pub bids: Vec<RawLevel>,
    pub asks: Vec<RawLevel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDepthUpdate {
    #[serde(rename = "e", default)]
    pub event_type: Option<String>,
    #[serde(rename = "U")]
    pub first_update_id: i64,
    #[serde(rename = "u")]
    pub last_update_id: i64,
    #[serde(rename = "b")]
    pub bids: Vec<RawLevel>,
    #[serde(rename = "a")]
    pub asks: Vec<RawLevel>,
}

/// Combined-stream wrapper around a diff payload
#[derive(Debug, Clone, Deserialize)]
pub struct StreamEnvelope<T> {
    #[serde(default)]
    pub stream: Option<String>,
    pub data: T,
}
