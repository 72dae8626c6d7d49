//! Per-position payload codec.
//!
//! The indexer attaches a small byte payload to every position of the text
//! and annotation fields. An indexed annotation token looks like
//! `np|10,20,2,1`: the lowercased label, the payload separator, then the
//! start offset, end offset, annotation id and parent id joined by the id
//! separator. The engine decodes the payload part back into an
//! [`ElementSpan`] when it loads a document's occurrences.

use crate::error::{EngineError, Result};
use crate::types::ElementSpan;

/// Separates the indexed term from its payload inside one field token.
pub const PAYLOAD_SEP: u8 = b'|';

/// Separates the four integer fields inside a payload.
pub const ID_SEP: u8 = b',';

/// Upper bound on the length of one indexed token, payload included.
pub const MAX_PAYLOAD_LEN: usize = 1024;

/// Encode the payload part of a position: `start,end,id,parent`.
pub fn encode(span: &ElementSpan) -> String {
    let sep = ID_SEP as char;
    format!(
        "{}{sep}{}{sep}{}{sep}{}",
        span.start_offset, span.end_offset, span.id, span.parent_id
    )
}

/// Encode a full annotation-field token: lowercased label, separator, payload.
///
/// The label must survive whitespace tokenization and payload splitting, so
/// separator bytes and whitespace inside it are rejected rather than
/// silently mangled.
pub fn encode_annot_token(label: &str, span: &ElementSpan) -> Result<String> {
    if label.is_empty() {
        return Err(EngineError::CorruptPayload(
            "annotation label is empty".to_string(),
        ));
    }
    if label
        .bytes()
        .any(|b| b == PAYLOAD_SEP || b == ID_SEP || b.is_ascii_whitespace())
    {
        return Err(EngineError::CorruptPayload(format!(
            "annotation label '{label}' contains a reserved byte"
        )));
    }
    let token = format!("{}{}{}", label.to_lowercase(), PAYLOAD_SEP as char, encode(span));
    if token.len() > MAX_PAYLOAD_LEN {
        return Err(EngineError::CorruptPayload(format!(
            "encoded annotation token is {} bytes, limit is {MAX_PAYLOAD_LEN}",
            token.len()
        )));
    }
    Ok(token)
}

/// Split an indexed token into its term and payload parts.
pub fn split_token(token: &str) -> Result<(&str, &[u8])> {
    let pos = token
        .bytes()
        .position(|b| b == PAYLOAD_SEP)
        .ok_or_else(|| {
            EngineError::CorruptPayload(format!("token '{token}' has no payload separator"))
        })?;
    Ok((&token[..pos], &token.as_bytes()[pos + 1..]))
}

/// Decode a payload back into an [`ElementSpan`].
///
/// A payload that is over-long, not UTF-8, not exactly four non-negative
/// integers, or describes an inverted span is corrupt; the running query is
/// aborted with the diagnostic.
pub fn decode(payload: &[u8]) -> Result<ElementSpan> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(EngineError::CorruptPayload(format!(
            "payload is {} bytes, limit is {MAX_PAYLOAD_LEN}",
            payload.len()
        )));
    }
    let text = std::str::from_utf8(payload)
        .map_err(|_| EngineError::CorruptPayload("payload is not valid UTF-8".to_string()))?;

    let mut fields = [0u32; 4];
    let mut count = 0;
    for part in text.split(ID_SEP as char) {
        if count == fields.len() {
            return Err(EngineError::CorruptPayload(format!(
                "payload '{text}' has more than 4 fields"
            )));
        }
        fields[count] = part.parse::<u32>().map_err(|_| {
            EngineError::CorruptPayload(format!("payload '{text}' field '{part}' is not a non-negative integer"))
        })?;
        count += 1;
    }
    if count != fields.len() {
        return Err(EngineError::CorruptPayload(format!(
            "payload '{text}' has {count} fields, expected 4"
        )));
    }

    let [start_offset, end_offset, id, parent_id] = fields;
    if start_offset > end_offset {
        return Err(EngineError::CorruptPayload(format!(
            "payload '{text}' has start offset {start_offset} past end offset {end_offset}"
        )));
    }
    Ok(ElementSpan {
        id,
        parent_id,
        start_offset,
        end_offset,
    })
}
