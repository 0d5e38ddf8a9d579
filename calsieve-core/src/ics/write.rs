//! ICS serialization.
//!
//! Components are written back exactly as parsed. The icalendar builder types
//! re-sort properties and stamp missing DTSTAMP/UID values with the current
//! time, so the content lines are emitted here instead.
//!
//! TEXT values are held decoded in the model and are escaped again on the way
//! out, using the same value-type rules the parser used to decode them.

use std::fmt::Write;
use std::str::FromStr;

use icalendar::ValueType;

use crate::calendar::{CalendarDocument, Component, Parameter, Property};

/// RFC 5545 §3.1: lines SHOULD NOT be longer than 75 octets
const MAX_LINE_OCTETS: usize = 75;

/// Serialize a document to ICS bytes.
pub fn serialize(cal: &CalendarDocument) -> Vec<u8> {
    to_ics_string(cal).into_bytes()
}

pub fn to_ics_string(cal: &CalendarDocument) -> String {
    let mut out = String::new();
    write_line(&mut out, "BEGIN:VCALENDAR");
    for prop in &cal.properties {
        write_property(&mut out, prop);
    }
    for component in &cal.components {
        write_component(&mut out, component);
    }
    write_line(&mut out, "END:VCALENDAR");
    out
}

fn write_component(out: &mut String, component: &Component) {
    write_line(out, &format!("BEGIN:{}", component.name));
    for prop in &component.properties {
        write_property(out, prop);
    }
    for sub in &component.components {
        write_component(out, sub);
    }
    write_line(out, &format!("END:{}", component.name));
}

fn write_property(out: &mut String, prop: &Property) {
    let mut line = prop.name.clone();
    for param in &prop.params {
        line.push(';');
        write_parameter(&mut line, param);
    }
    line.push(':');
    if is_text(prop) {
        let list_valued = LIST_PROPERTIES.contains(&prop.name.as_str());
        push_escaped_text(&mut line, &prop.value, list_valued);
    } else {
        line.push_str(&prop.value);
    }
    write_line(out, &line);
}

/// Property names whose default value type is TEXT (RFC 5545 §3.7, §3.8).
const TEXT_PROPERTIES: &[&str] = &[
    "CALSCALE",
    "METHOD",
    "PRODID",
    "VERSION",
    "CATEGORIES",
    "CLASS",
    "COMMENT",
    "DESCRIPTION",
    "LOCATION",
    "RESOURCES",
    "STATUS",
    "SUMMARY",
    "TRANSP",
    "TZID",
    "TZNAME",
    "CONTACT",
    "RELATED-TO",
    "UID",
    "ACTION",
    "REQUEST-STATUS",
];

/// TEXT properties holding a comma-separated list; their commas are separators.
const LIST_PROPERTIES: &[&str] = &["CATEGORIES", "RESOURCES"];

/// Whether the parser decoded this value as TEXT: an explicit `VALUE`
/// parameter wins, otherwise the (upper-case) property name decides.
fn is_text(prop: &Property) -> bool {
    let declared = prop
        .params
        .iter()
        .find(|param| param.key == "VALUE")
        .and_then(|param| param.value.as_deref())
        .and_then(|value| ValueType::from_str(value).ok());
    if let Some(value_type) = declared {
        return value_type == ValueType::Text;
    }
    let name = prop.name.as_str();
    if name.chars().any(char::is_lowercase) {
        return false;
    }
    name.starts_with("X-") || TEXT_PROPERTIES.contains(&name)
}

/// RFC 5545 §3.3.11 escaping: backslash, semicolon, comma and newline.
fn push_escaped_text(line: &mut String, value: &str, keep_commas: bool) {
    for ch in value.chars() {
        match ch {
            '\\' => line.push_str("\\\\"),
            ';' => line.push_str("\\;"),
            ',' if !keep_commas => line.push_str("\\,"),
            '\n' => line.push_str("\\n"),
            _ => line.push(ch),
        }
    }
}

fn write_parameter(line: &mut String, param: &Parameter) {
    line.push_str(&param.key);
    let Some(value) = &param.value else {
        return;
    };
    line.push('=');
    let already_quoted = value.len() >= 2 && value.starts_with('"') && value.ends_with('"');
    if !already_quoted && value.contains([':', ';', ',']) {
        let _ = write!(line, "\"{}\"", value);
    } else {
        line.push_str(value);
    }
}

/// Write one content line, folding it at 75 octets without splitting a
/// UTF-8 sequence. Continuation lines start with a single space.
fn write_line(out: &mut String, line: &str) {
    let mut budget = MAX_LINE_OCTETS;
    let mut used = 0;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if used + len > budget {
            out.push_str("\r\n ");
            // the leading space counts toward the next line's limit
            budget = MAX_LINE_OCTETS - 1;
            used = 0;
        }
        out.push(ch);
        used += len;
    }
    out.push_str("\r\n");
}
