/// Depth record decoder
///
/// The only place loosely-shaped input is accepted. Everything past the
/// decoder sees strict `Snapshot` / `PartialUpdate` values; a malformed level
/// rejects the whole record.

use serde_json::Value;
use thiserror::Error;

use crate::levels::PriceLevel;
use crate::protocol::*;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid number: {value:?}")]
    InvalidNumber { value: String },

    #[error("record line has no '{}' separator", RECORD_SEPARATOR)]
    MissingSeparator,

    #[error("unexpected event type: {event}")]
    UnexpectedEvent { event: String },

    #[error("stream record has no event type")]
    MissingEvent,
}

pub type DecodeResult<T> = Result<T, DecodeError>;

impl RawNumber {
    fn to_f64(&self) -> DecodeResult<f64> {
        let value = match self {
            RawNumber::Number(n) => *n,
            RawNumber::Text(s) => s.trim().parse::<f64>().map_err(|_| DecodeError::InvalidNumber {
                value: s.clone(),
            })?,
        };
        if !value.is_finite() {
            return Err(DecodeError::InvalidNumber {
                value: value.to_string(),
            });
        }
        Ok(value)
    }
}

impl TryFrom<&RawLevel> for PriceLevel {
    type Error = DecodeError;

    fn try_from(raw: &RawLevel) -> DecodeResult<Self> {
        let (price, qty) = match raw {
            RawLevel::Pair(price, qty) => (price, qty),
            RawLevel::Object { price, qty } => (price, qty),
        };
        Ok(PriceLevel::new(price.to_f64()?, qty.to_f64()?))
    }
}

fn convert_levels(raw: &[RawLevel]) -> DecodeResult<Vec<PriceLevel>> {
    raw.iter().map(PriceLevel::try_from).collect()
}

impl TryFrom<RawSnapshot> for Snapshot {
    type Error = DecodeError;

    fn try_from(raw: RawSnapshot) -> DecodeResult<Self> {
        Ok(Snapshot::new(
            convert_levels(&raw.bids)?,
            convert_levels(&raw.asks)?,
            raw.last_update_id,
        ))
    }
}

impl TryFrom<RawDepthUpdate> for PartialUpdate {
    type Error = DecodeError;

    fn try_from(raw: RawDepthUpdate) -> DecodeResult<Self> {
        if let Some(event) = raw.event_type.as_deref() {
            if event != DEPTH_UPDATE_EVENT {
                return Err(DecodeError::UnexpectedEvent {
                    event: event.to_string(),
                });
            }
        }
        Ok(PartialUpdate::new(
            convert_levels(&raw.bids)?,
            convert_levels(&raw.asks)?,
            raw.first_update_id,
            raw.last_update_id,
        ))
    }
}

/// Split `<prefix>|<json>` and return the JSON part
pub fn record_payload(line: &str) -> DecodeResult<&str> {
    line.split_once(RECORD_SEPARATOR)
        .map(|(_, json)| json)
        .ok_or(DecodeError::MissingSeparator)
}

pub struct Decoder;

impl Decoder {
    /// Decode a single price level from an already-parsed JSON value
    pub fn level_from_value(value: Value) -> DecodeResult<PriceLevel> {
        let raw: RawLevel = serde_json::from_value(value)?;
        PriceLevel::try_from(&raw)
    }

    pub fn snapshot_from_value(value: Value) -> DecodeResult<Snapshot> {
        let raw: RawSnapshot = serde_json::from_value(value)?;
        Snapshot::try_from(raw)
    }

    /// Decode a diff payload object (the `data` member of a stream record)
    pub fn update_from_value(value: Value) -> DecodeResult<PartialUpdate> {
        let raw: RawDepthUpdate = serde_json::from_value(value)?;
        PartialUpdate::try_from(raw)
    }

    pub fn decode_snapshot(json: &str) -> DecodeResult<Snapshot> {
        let raw: RawSnapshot = serde_json::from_str(json)?;
        Snapshot::try_from(raw)
    }

    /// Decode a diff, either wrapped in a stream envelope or bare
    /// Enveloped payloads must carry `"e": "depthUpdate"`; bare ones may omit it.
    pub fn decode_update(json: &str) -> DecodeResult<PartialUpdate> {
        let value: Value = serde_json::from_str(json)?;
        if value.get("data").is_some() {
            let envelope: StreamEnvelope<RawDepthUpdate> = serde_json::from_value(value)?;
            if envelope.data.event_type.is_none() {
                return Err(DecodeError::MissingEvent);
            }
            PartialUpdate::try_from(envelope.data)
        } else {
            Self::update_from_value(value)
        }
    }

    pub fn decode_snapshot_line(line: &str) -> DecodeResult<Snapshot> {
        Self::decode_snapshot(record_payload(line)?)
    }

    pub fn decode_update_line(line: &str) -> DecodeResult<PartialUpdate> {
        Self::decode_update(record_payload(line)?)
    }

    /// Decode newline-separated diff records
    /// Calls callback with each decode result; stops early if callback returns false.
    /// Returns the number of non-empty lines handed to the callback.
    pub fn decode_stream<F>(text: &str, mut callback: F) -> usize
    where
        F: FnMut(DecodeResult<PartialUpdate>) -> bool,
    {
        let mut count = 0;
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            count += 1;
            if !callback(Self::decode_update_line(line)) {
                break;
            }
        }
        count
    }
}
