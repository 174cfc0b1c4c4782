//! Recovery: pull one JSON object out of a structuring completion.
//!
//! Even at temperature 0 with a "JSON only" instruction, models wrap their
//! answer in ` ```json ` fences or add a sentence before or after it. The
//! recovery here is two-tier and deliberately shallow:
//!
//! 1. strip fence markers and parse the rest directly;
//! 2. failing that, parse the span from the first `{` to the last `}`.
//!
//! Broken JSON syntax inside the object is never repaired. A truncated or
//! malformed object is reported as [`ScanError::StructuringParse`] with the
//! raw completion attached, and the scanner decides what to do with it.

use crate::error::ScanError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

/// Which tier produced the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryTier {
    /// The fence-stripped completion parsed as-is.
    Direct,
    /// Only the first-`{`-to-last-`}` span parsed.
    BraceSpan,
}

/// A JSON object recovered from a completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub object: Map<String, Value>,
    pub tier: RecoveryTier,
}

static RE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)```(?:json)?").unwrap());

/// Remove every fenced code-block marker and trim the result.
pub fn strip_fences(completion: &str) -> String {
    RE_FENCE.replace_all(completion, "").trim().to_string()
}

/// Recover a JSON object from a raw structuring completion.
///
/// Deterministic: the same input always yields the same result.
pub fn recover(completion: &str) -> Result<Recovered, ScanError> {
    let cleaned = strip_fences(completion);

    if let Some(object) = parse_object(&cleaned) {
        return Ok(Recovered {
            object,
            tier: RecoveryTier::Direct,
        });
    }

    if let Some(span) = brace_span(&cleaned) {
        if let Some(object) = parse_object(span) {
            debug!("Recovered JSON object from brace span ({} bytes)", span.len());
            return Ok(Recovered {
                object,
                tier: RecoveryTier::BraceSpan,
            });
        }
    }

    Err(ScanError::StructuringParse {
        raw: completion.to_string(),
    })
}

/// The substring from the first `{` to the last `}` inclusive, if any.
fn brace_span(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    (start < end).then(|| &s[start..=end])
}

fn parse_object(s: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(s) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
