//! Free-text QSO extraction
//!
//! Sends an operator's note to the completion model with a fixed prompt and
//! turns the reply into a normalized [`ParsedQso`] plus a confidence score.
//!
//! # Normalization
//!
//! - Text fields accept a string or a number (stringified); trimmed, blank → `None`
//! - `call` and `mode` upper-cased
//! - `qso_date` (`YYYY-MM-DD`), `time_on` (`HH:MM[:SS[.fff]]`) and `freq`
//!   are parsed or dropped, never rejected
//! - `confidence` defaults to 0.5 and is clamped into [0, 1]
//!
//! Anything else the model sends (a non-object, a boolean where text belongs,
//! a non-numeric confidence) rejects the whole reply.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use super::llm_client::{CompletionError, CompletionModel};

/// Maximum accepted input length, in characters
pub const MAX_INPUT_CHARS: usize = 2000;

/// Confidence assumed when the model omits it
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

const SYSTEM_PROMPT: &str = r#"You are the assistant of an amateur radio logbook. Read the operator's free-text note about a contact (QSO) and extract its fields. Reply with a single JSON object and nothing else: no explanations, no markdown.

Schema (use null for anything not stated):
{
  "call": string|null,       contacted station's callsign, uppercase, e.g. "W1AW"
  "band": string|null,       e.g. "20m", "40m", "2m"; "twenty meters" means "20m"
  "freq": number|null,       MHz, e.g. 14.225
  "mode": string|null,       uppercase: SSB, CW, FT8, FT4, RTTY, PSK31, AM, FM, DIGI or OTHER
  "rst_sent": string|null,   report sent, e.g. "59" or "579"
  "rst_rcvd": string|null,   report received
  "qso_date": string|null,   "YYYY-MM-DD"
  "time_on": string|null,    UTC "HH:MM:SS"; assume UTC when no zone is given
  "name": string|null,       operator name at the other station
  "qth": string|null,        their location, e.g. "Sydney, Australia"
  "grid": string|null,       Maidenhead locator, e.g. "FN31"
  "dxcc": string|null,       DXCC entity, e.g. "Japan"
  "notes": string|null,      anything else worth keeping
  "confidence": number       0.0 to 1.0, how complete and unambiguous the note was
}

Conventions:
- Callsigns are a 1-3 character prefix, a digit and a 1-4 letter suffix, optionally with /P, /M or /QRP.
- Phone reports have two digits (readability 1-5, strength 1-9); CW reports add a tone digit. "59" and "599" are perfect reports; "5NN" means "599".
- Band edges: 160m 1.8, 80m 3.5, 40m 7.0, 30m 10.1, 20m 14.0, 17m 18.068, 15m 21.0, 12m 24.89, 10m 28.0, 6m 50, 2m 144, 70cm 430 MHz.
- When a frequency is given, derive the band from it.
- "phone" or "voice" means SSB; "morse" means CW.
- You have no clock: relative dates such as "yesterday" become null.
- Confidence is 1.0 when call, band and mode are all present; take off 0.1 for each missing one.

Examples:

Note: worked W1AW on 20 meters ssb, gave him 59 got 57 back
Reply: {"call":"W1AW","band":"20m","freq":null,"mode":"SSB","rst_sent":"59","rst_rcvd":"57","qso_date":null,"time_on":null,"name":null,"qth":null,"grid":null,"dxcc":null,"notes":null,"confidence":0.8}

Note: QSO with VK2XYZ 14.225 MHz SSB 15:30z June 15 2025 name John QTH Sydney Australia
Reply: {"call":"VK2XYZ","band":"20m","freq":14.225,"mode":"SSB","rst_sent":null,"rst_rcvd":null,"qso_date":"2025-06-15","time_on":"15:30:00","name":"John","qth":"Sydney, Australia","grid":null,"dxcc":"Australia","notes":null,"confidence":0.9}

Note: CW contact JA1ABC 40m 599 both ways 07:14 UTC grid PM95
Reply: {"call":"JA1ABC","band":"40m","freq":null,"mode":"CW","rst_sent":"599","rst_rcvd":"599","qso_date":null,"time_on":"07:14:00","name":null,"qth":null,"grid":"PM95","dxcc":"Japan","notes":null,"confidence":0.9}

Note: FT8 DX9ABC 15m 2025-03-22 2134z -12 db
Reply: {"call":"DX9ABC","band":"15m","freq":null,"mode":"FT8","rst_sent":null,"rst_rcvd":"-12","qso_date":"2025-03-22","time_on":"21:34:00","name":null,"qth":null,"grid":null,"dxcc":null,"notes":"-12 dB signal","confidence":0.85}

Note: Worked DL3FOO on 7.050, CW, RST 579/579, name Klaus, Cologne Germany, grid JO30
Reply: {"call":"DL3FOO","band":"40m","freq":7.050,"mode":"CW","rst_sent":"579","rst_rcvd":"579","qso_date":null,"time_on":null,"name":"Klaus","qth":"Cologne, Germany","grid":"JO30","dxcc":"Germany","notes":null,"confidence":0.95}

Note: quick sked with AA7BQ on two meters FM, full quieting both ways, in Phoenix AZ
Reply: {"call":"AA7BQ","band":"2m","freq":null,"mode":"FM","rst_sent":null,"rst_rcvd":null,"qso_date":null,"time_on":null,"name":null,"qth":"Phoenix, AZ","grid":null,"dxcc":"United States","notes":"full quieting both ways","confidence":0.75}

Note: RTTY contest, W6ABC 10m, exchange: 5NN CA
Reply: {"call":"W6ABC","band":"10m","freq":null,"mode":"RTTY","rst_sent":"599","rst_rcvd":null,"qso_date":null,"time_on":null,"name":null,"qth":"California, USA","grid":null,"dxcc":"United States","notes":"exchange: 5NN CA","confidence":0.7}

Note: PSK31 on 80 with G4XYZ, 3.580 MHz, 599/599, name Pete, Birmingham UK
Reply: {"call":"G4XYZ","band":"80m","freq":3.580,"mode":"PSK31","rst_sent":"599","rst_rcvd":"599","qso_date":null,"time_on":null,"name":"Pete","qth":"Birmingham, UK","grid":null,"dxcc":"England","notes":null,"confidence":0.95}
"#;

#[derive(Debug, Error)]
pub enum ExtractionError {
    /// No model configured
    #[error("AI parsing unavailable: no model API key configured")]
    Unavailable,

    /// The model call itself failed
    #[error("AI parsing service error: {0}")]
    Upstream(#[from] CompletionError),

    /// The model replied with something that is not a usable record
    #[error("AI parsing returned malformed response: {0}")]
    Malformed(String),
}

/// Normalized extraction output; every field may be absent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedQso {
    pub call: Option<String>,
    pub band: Option<String>,
    pub freq: Option<f64>,
    pub mode: Option<String>,
    pub rst_sent: Option<String>,
    pub rst_rcvd: Option<String>,
    pub qso_date: Option<NaiveDate>,
    pub time_on: Option<NaiveTime>,
    pub name: Option<String>,
    pub qth: Option<String>,
    pub grid: Option<String>,
    pub dxcc: Option<String>,
    pub notes: Option<String>,
}

/// Response body of the parse endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub parsed: ParsedQso,
    pub confidence: f64,
    pub raw_text: String,
}

/// A text slot as the model may fill it
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextValue {
    Text(String),
    Number(serde_json::Number),
}

impl TextValue {
    fn into_clean(self) -> Option<String> {
        let s = match self {
            TextValue::Text(s) => s.trim().to_string(),
            TextValue::Number(n) => n.to_string(),
        };
        (!s.is_empty()).then_some(s)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConfidenceValue {
    Number(f64),
    Text(String),
}

/// Reply object before normalization; unknown keys are ignored
#[derive(Debug, Deserialize)]
struct RawExtraction {
    #[serde(default)]
    call: Option<TextValue>,
    #[serde(default)]
    band: Option<TextValue>,
    #[serde(default)]
    freq: Option<serde_json::Value>,
    #[serde(default)]
    mode: Option<TextValue>,
    #[serde(default)]
    rst_sent: Option<TextValue>,
    #[serde(default)]
    rst_rcvd: Option<TextValue>,
    #[serde(default)]
    qso_date: Option<serde_json::Value>,
    #[serde(default)]
    time_on: Option<serde_json::Value>,
    #[serde(default)]
    name: Option<TextValue>,
    #[serde(default)]
    qth: Option<TextValue>,
    #[serde(default)]
    grid: Option<TextValue>,
    #[serde(default)]
    dxcc: Option<TextValue>,
    #[serde(default)]
    notes: Option<TextValue>,
    #[serde(default)]
    confidence: Option<ConfidenceValue>,
}

fn text(value: Option<TextValue>) -> Option<String> {
    value.and_then(TextValue::into_clean)
}

fn parse_freq(value: Option<serde_json::Value>) -> Option<f64> {
    let freq = match value? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    freq.is_finite().then_some(freq)
}

fn parse_date(value: Option<serde_json::Value>) -> Option<NaiveDate> {
    match value? {
        serde_json::Value::String(s) => {
            let s = s.trim();
            if s.len() != 10 {
                return None;
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
        }
        _ => None,
    }
}

fn parse_time(value: Option<serde_json::Value>) -> Option<NaiveTime> {
    match value? {
        serde_json::Value::String(s) => {
            let s = s.trim();
            NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                .ok()
        }
        _ => None,
    }
}

fn parse_confidence(value: Option<ConfidenceValue>) -> Result<f64, ExtractionError> {
    let confidence = match value {
        None => DEFAULT_CONFIDENCE,
        Some(ConfidenceValue::Number(n)) => n,
        Some(ConfidenceValue::Text(s)) => s.trim().parse::<f64>().map_err(|_| {
            ExtractionError::Malformed(format!("confidence is not a number: {:?}", s))
        })?,
    };

    if confidence.is_nan() {
        return Err(ExtractionError::Malformed("confidence is NaN".to_string()));
    }
    Ok(confidence.clamp(0.0, 1.0))
}

/// Remove a surrounding markdown code fence and its optional language tag
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let body = trimmed.split("```").nth(1).unwrap_or("");
    let body = match body.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &body[4..],
        _ => body,
    };
    body.trim()
}

/// Turn a raw model reply into a normalized record and confidence
pub fn normalize_reply(reply: &str) -> Result<(ParsedQso, f64), ExtractionError> {
    let body = strip_code_fence(reply);

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ExtractionError::Malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(ExtractionError::Malformed(
            "reply is not a JSON object".to_string(),
        ));
    }

    let raw: RawExtraction =
        serde_json::from_value(value).map_err(|e| ExtractionError::Malformed(e.to_string()))?;

    let confidence = parse_confidence(raw.confidence)?;

    let parsed = ParsedQso {
        call: text(raw.call).map(|c| c.to_uppercase()),
        band: text(raw.band),
        freq: parse_freq(raw.freq),
        mode: text(raw.mode).map(|m| m.to_uppercase()),
        rst_sent: text(raw.rst_sent),
        rst_rcvd: text(raw.rst_rcvd),
        qso_date: parse_date(raw.qso_date),
        time_on: parse_time(raw.time_on),
        name: text(raw.name),
        qth: text(raw.qth),
        grid: text(raw.grid),
        dxcc: text(raw.dxcc),
        notes: text(raw.notes),
    };

    Ok((parsed, confidence))
}

/// Extraction pipeline over an optional completion model
#[derive(Clone)]
pub struct QsoExtractor {
    model: Option<Arc<dyn CompletionModel>>,
}

impl QsoExtractor {
    pub fn new(model: Option<Arc<dyn CompletionModel>>) -> Self {
        Self { model }
    }

    pub fn is_available(&self) -> bool {
        self.model.is_some()
    }

    /// Extract QSO fields from `text`
    pub async fn extract(&self, text: &str) -> Result<ExtractionResult, ExtractionError> {
        let model = self.model.as_ref().ok_or(ExtractionError::Unavailable)?;

        let reply = model.complete(SYSTEM_PROMPT, text).await.map_err(|e| {
            error!(error = %e, "Completion request failed");
            ExtractionError::from(e)
        })?;

        let (parsed, confidence) = normalize_reply(&reply).map_err(|e| {
            error!(reply = %reply, error = %e, "Model returned unusable reply");
            e
        })?;

        debug!(call = ?parsed.call, confidence, "Extracted QSO fields");

        Ok(ExtractionResult {
            parsed,
            confidence,
            raw_text: text.to_string(),
        })
    }
}
