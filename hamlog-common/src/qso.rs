//! QSO (contact) record types and validation

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{callsign, Error, Result};

/// Upper bound (exclusive) for a logged frequency, in MHz
pub const MAX_FREQ_MHZ: f64 = 450_000.0;

/// Editable fields of a QSO
///
/// Used as the create/replace request body and embedded in [`Qso`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QsoFields {
    /// Callsign of the contacted station
    pub call: String,
    /// Band, e.g. "20m"
    #[serde(default)]
    pub band: Option<String>,
    /// Frequency in MHz
    #[serde(default)]
    pub freq: Option<f64>,
    /// Mode, e.g. "SSB", "CW", "FT8"
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub rst_sent: Option<String>,
    #[serde(default)]
    pub rst_rcvd: Option<String>,
    /// UTC date of the contact
    #[serde(default)]
    pub qso_date: Option<NaiveDate>,
    /// UTC start time of the contact
    #[serde(default)]
    pub time_on: Option<NaiveTime>,
    /// Operator name at the contacted station
    #[serde(default)]
    pub name: Option<String>,
    /// Location of the contacted station
    #[serde(default)]
    pub qth: Option<String>,
    /// Maidenhead grid locator
    #[serde(default)]
    pub grid: Option<String>,
    /// DXCC entity name
    #[serde(default)]
    pub dxcc: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A stored QSO owned by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qso {
    pub id: Uuid,
    pub created_by: Uuid,
    #[serde(flatten)]
    pub fields: QsoFields,
}

/// Paginated QSO listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QsoList {
    pub items: Vec<Qso>,
    pub total: i64,
}

impl QsoFields {
    /// Validate field constraints and return the normalized record
    ///
    /// Normalization: callsign and mode upper-cased and trimmed, every other
    /// text field trimmed, blank optional text becomes `None`.
    ///
    /// # Errors
    /// [`Error::InvalidInput`] listing every violated constraint.
    pub fn validated(self) -> Result<Self> {
        let mut problems = Vec::new();

        if !callsign::is_valid(&self.call) {
            problems.push(format!(
                "call: must be {}-{} characters of letters, digits or '/'",
                callsign::MIN_CALLSIGN_LEN,
                callsign::MAX_CALLSIGN_LEN
            ));
        }

        if let Some(freq) = self.freq {
            if !(freq > 0.0 && freq < MAX_FREQ_MHZ) {
                problems.push(format!("freq: must be > 0 and < {} MHz", MAX_FREQ_MHZ));
            }
        }

        let fields = Self {
            call: callsign::normalize(&self.call),
            band: clean(self.band),
            freq: self.freq,
            mode: clean(self.mode).map(|m| m.to_uppercase()),
            rst_sent: clean(self.rst_sent),
            rst_rcvd: clean(self.rst_rcvd),
            qso_date: self.qso_date,
            time_on: self.time_on,
            name: clean(self.name),
            qth: clean(self.qth),
            grid: clean(self.grid),
            dxcc: clean(self.dxcc),
            notes: clean(self.notes),
        };

        let limits: [(&str, &Option<String>, usize); 8] = [
            ("band", &fields.band, 10),
            ("mode", &fields.mode, 10),
            ("rst_sent", &fields.rst_sent, 10),
            ("rst_rcvd", &fields.rst_rcvd, 10),
            ("name", &fields.name, 100),
            ("qth", &fields.qth, 200),
            ("grid", &fields.grid, 8),
            ("dxcc", &fields.dxcc, 50),
        ];
        for (field, value, max) in limits {
            if let Some(v) = value {
                if v.chars().count() > max {
                    problems.push(format!("{}: at most {} characters", field, max));
                }
            }
        }

        if problems.is_empty() {
            Ok(fields)
        } else {
            Err(Error::InvalidInput(problems.join("; ")))
        }
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(call: &str) -> QsoFields {
        QsoFields {
            call: call.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_record_is_valid() {
        let qso = fields("w1aw").validated().unwrap();
        assert_eq!(qso.call, "W1AW");
        assert!(qso.band.is_none());
    }

    #[test]
    fn test_invalid_callsign_rejected() {
        let err = fields("BAD CALL!").validated().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(msg) if msg.contains("call")));
    }

    #[test]
    fn test_frequency_bounds() {
        let mut qso = fields("W1AW");
        qso.freq = Some(0.0);
        assert!(qso.clone().validated().is_err());

        qso.freq = Some(450_000.0);
        assert!(qso.clone().validated().is_err());

        qso.freq = Some(14.225);
        assert!(qso.validated().is_ok());
    }

    #[test]
    fn test_length_limits_report_every_field() {
        let mut qso = fields("W1AW");
        qso.grid = Some("FN31PR12X".to_string());
        qso.band = Some("x".repeat(11));

        let err = qso.validated().unwrap_err().to_string();
        assert!(err.contains("grid"));
        assert!(err.contains("band"));
    }

    #[test]
    fn test_text_is_trimmed_and_blank_dropped() {
        let mut qso = fields(" vk2xyz ");
        qso.mode = Some(" ssb ".to_string());
        qso.name = Some("   ".to_string());
        qso.qth = Some(" Sydney, Australia ".to_string());

        let qso = qso.validated().unwrap();
        assert_eq!(qso.call, "VK2XYZ");
        assert_eq!(qso.mode.as_deref(), Some("SSB"));
        assert_eq!(qso.name, None);
        assert_eq!(qso.qth.as_deref(), Some("Sydney, Australia"));
    }

    #[test]
    fn test_qso_serializes_flat() {
        let qso = Qso {
            id: Uuid::nil(),
            created_by: Uuid::nil(),
            fields: QsoFields {
                call: "JA1ABC".to_string(),
                qso_date: NaiveDate::from_ymd_opt(2025, 6, 15),
                time_on: NaiveTime::from_hms_opt(14, 32, 0),
                ..Default::default()
            },
        };

        let json = serde_json::to_value(&qso).unwrap();
        assert_eq!(json["call"], "JA1ABC");
        assert_eq!(json["qso_date"], "2025-06-15");
        assert_eq!(json["time_on"], "14:32:00");
        assert!(json["band"].is_null());
    }
}
