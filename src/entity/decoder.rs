//! Decoding of the administrative tool output.
//!
//! The tool prints one `key : value` pair per line and separates records with
//! a blank line. [`decode_line`] handles one line, [`unmarshal`] turns a block
//! of lines into a typed record.

use chrono::{NaiveDateTime, Utc};
use log::trace;

use super::schema::{Record, Slot};
use crate::error_handling::types::UnmarshalError;

/// Layout of timestamps printed by the tool (no timezone, always UTC).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const DELIMITER: char = ':';

/// Splits one output line into a lowercase `(key, value)` pair.
///
/// Non-printable characters (controls, tabs, whitespace other than the plain
/// space, and invisible format marks such as a BOM) are dropped before
/// splitting at the first `:`. Returns `None`
/// when the line holds no delimiter.
pub fn decode_line(line: &str) -> Option<(String, String)> {
    let clean: String = line
        .chars()
        .filter(|c| is_printable(*c))
        .flat_map(char::to_lowercase)
        .collect();

    let (key, value) = clean.split_once(DELIMITER)?;
    Some((
        key.trim_matches(' ').to_string(),
        value.trim_matches(' ').to_string(),
    ))
}

// Invisible format characters (BOM, zero-width and bidi marks) the tool or a
// console codepage may leave in the output.
const FORMAT_CHARS: &[(char, char)] = &[
    ('\u{00AD}', '\u{00AD}'),
    ('\u{061C}', '\u{061C}'),
    ('\u{180E}', '\u{180E}'),
    ('\u{200B}', '\u{200F}'),
    ('\u{2028}', '\u{202E}'),
    ('\u{2060}', '\u{206F}'),
    ('\u{FEFF}', '\u{FEFF}'),
    ('\u{FFF9}', '\u{FFFB}'),
];

fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    !FORMAT_CHARS
        .iter()
        .any(|(lo, hi)| (*lo..=*hi).contains(&c))
}

/// A line that separates two records: nothing but spaces and characters
/// [`decode_line`] would drop.
pub fn is_blank(line: &[u8]) -> bool {
    String::from_utf8_lossy(line)
        .chars()
        .all(|c| c == ' ' || !is_printable(c))
}

/// Builds a record of type `R` from a block of raw lines.
///
/// Lines without a delimiter and unknown keys are skipped. Integer and
/// timestamp values that fail to parse leave the field at its default. A
/// block that fills no field at all yields [`UnmarshalError::NotFound`].
/// Invalid UTF-8 is replaced with U+FFFD. A block that repeats the record's
/// identifying key holds two records run together and yields
/// [`UnmarshalError::DuplicateKey`].
pub fn unmarshal<R, L>(lines: &[L]) -> Result<R, UnmarshalError>
where
    R: Record,
    L: AsRef<[u8]>,
{
    let mut record = R::default();
    let id_key = R::fields().first().map(|f| f.key);
    let mut seen_id = false;

    for raw in lines {
        let line = String::from_utf8_lossy(raw.as_ref());

        let Some((key, value)) = decode_line(&line) else {
            continue;
        };

        let Some(field) = R::field(&key) else {
            continue;
        };

        if Some(field.key) == id_key {
            if seen_id {
                return Err(UnmarshalError::DuplicateKey(field.key.to_string()));
            }
            seen_id = true;
        }

        match &field.slot {
            Slot::Text(slot) => *slot(&mut record) = value,
            Slot::Integer(slot) => match value.parse::<i64>() {
                Ok(v) => *slot(&mut record) = v,
                Err(_) => trace!("{}.{}: ignoring non-integer {:?}", R::KIND, field.name, value),
            },
            Slot::Timestamp(slot) => {
                match NaiveDateTime::parse_from_str(&value.to_uppercase(), TIMESTAMP_FORMAT) {
                    Ok(t) => *slot(&mut record) = Some(t.and_utc()),
                    Err(_) => {
                        trace!("{}.{}: ignoring bad timestamp {:?}", R::KIND, field.name, value)
                    }
                }
            }
        }
    }

    if record == R::default() {
        return Err(UnmarshalError::NotFound);
    }

    Ok(record)
}

#[cfg(test)]
pub(crate) fn utc(s: &str) -> chrono::DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .unwrap()
        .and_utc()
}
