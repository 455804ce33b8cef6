//! ADIF (`.adi`) export writer
//!
//! Produces the tagged plain-text interchange format understood by other
//! logging programs and award tracking services.
//!
//! # Format
//!
//! ```text
//! HamLog ADIF export
//! <ADIF_VER:5>3.1.4
//! <PROGRAMID:6>HamLog
//! <PROGRAMVERSION:5>0.1.0
//! <CREATED_TIMESTAMP:15>20250615 143200
//! <EOH>
//! <CALL:6>VK2XYZ <BAND:3>20m <MODE:3>SSB <QSO_DATE:8>20250615 <TIME_ON:6>143200 <EOR>
//! ```
//!
//! Field length is the character count of the value.

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::qso::QsoFields;

/// ADIF specification version written in the header
pub const ADIF_VERSION: &str = "3.1.4";

/// Program identifier written in the header
pub const PROGRAM_ID: &str = "HamLog";

/// Write a complete ADIF document for `records`
///
/// `created` becomes the header's `CREATED_TIMESTAMP`.
pub fn write_document<'a, I>(records: I, program_version: &str, created: DateTime<Utc>) -> String
where
    I: IntoIterator<Item = &'a QsoFields>,
{
    let mut out = String::new();
    out.push_str("HamLog ADIF export\n");
    push_field(&mut out, "ADIF_VER", ADIF_VERSION);
    out.push('\n');
    push_field(&mut out, "PROGRAMID", PROGRAM_ID);
    out.push('\n');
    push_field(&mut out, "PROGRAMVERSION", program_version);
    out.push('\n');
    push_field(
        &mut out,
        "CREATED_TIMESTAMP",
        &created.format("%Y%m%d %H%M%S").to_string(),
    );
    out.push('\n');
    out.push_str("<EOH>\n");

    for record in records {
        out.push_str(&write_record(record));
        out.push('\n');
    }

    out
}

/// Write a single QSO as one ADIF record terminated by `<EOR>`
pub fn write_record(qso: &QsoFields) -> String {
    let mut out = String::new();

    push_field(&mut out, "CALL", &qso.call);
    push_opt(&mut out, "BAND", qso.band.as_deref());
    if let Some(freq) = qso.freq {
        push_field(&mut out, "FREQ", &format_freq(freq));
    }
    if let Some(mode) = qso.mode.as_deref() {
        let (mode, submode) = adif_mode(mode);
        push_field(&mut out, "MODE", mode);
        push_opt(&mut out, "SUBMODE", submode);
    }
    push_opt(&mut out, "RST_SENT", qso.rst_sent.as_deref());
    push_opt(&mut out, "RST_RCVD", qso.rst_rcvd.as_deref());
    if let Some(date) = qso.qso_date {
        push_field(&mut out, "QSO_DATE", &date.format("%Y%m%d").to_string());
    }
    if let Some(time) = qso.time_on {
        push_field(&mut out, "TIME_ON", &time.format("%H%M%S").to_string());
    }
    push_opt(&mut out, "NAME", qso.name.as_deref());
    push_opt(&mut out, "QTH", qso.qth.as_deref());
    push_opt(&mut out, "GRIDSQUARE", qso.grid.as_deref());
    push_opt(&mut out, "COUNTRY", qso.dxcc.as_deref());
    push_opt(&mut out, "COMMENT", qso.notes.as_deref());

    out.push_str("<EOR>");
    out
}

/// Map a logged mode onto ADIF `MODE` / `SUBMODE`
///
/// ADIF files FT4 under MFSK and PSK31 under PSK; everything else is its own mode.
fn adif_mode(mode: &str) -> (&str, Option<&str>) {
    match mode {
        "FT4" => ("MFSK", Some("FT4")),
        "PSK31" => ("PSK", Some("PSK31")),
        other => (other, None),
    }
}

fn format_freq(freq: f64) -> String {
    // Up to Hz resolution, trailing zeros dropped
    let s = format!("{:.6}", freq);
    let s = s.trim_end_matches('0');
    s.trim_end_matches('.').to_string()
}

fn push_opt(out: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        push_field(out, name, value);
    }
}

fn push_field(out: &mut String, name: &str, value: &str) {
    let value = sanitize(value);
    if value.is_empty() {
        return;
    }
    // Writing to a String cannot fail
    let _ = write!(out, "<{}:{}>{} ", name, value.chars().count(), value);
}

/// Replace line breaks so a value never spans records
fn sanitize(value: &str) -> String {
    value.replace(['\r', '\n'], " ").trim().to_string()
}
