//! In-memory calendar document.
//!
//! These types mirror the structure of an iCalendar stream closely enough to
//! write it back out unchanged: components, properties and parameters keep
//! their original order, and property values keep their text (TEXT values
//! decoded, as the parser delivers them). Only
//! `DTSTART` is ever interpreted, through [`StartTime`].

use chrono::{NaiveDate, NaiveDateTime};

/// Fetched feed body, not yet parsed.
#[derive(Debug, Clone)]
pub struct RawCalendar {
    pub url: String,
    pub text: String,
}

/// A parsed VCALENDAR: its own properties plus the components it contains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarDocument {
    pub properties: Vec<Property>,
    pub components: Vec<Component>,
}

impl CalendarDocument {
    pub fn find_prop(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Top-level VEVENT components, in document order.
    pub fn events(&self) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(|c| c.is_event())
    }
}

/// A calendar component such as VEVENT, VTIMEZONE or a nested VALARM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub properties: Vec<Property>,
    pub components: Vec<Component>,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Component {
            name: name.into(),
            properties: Vec::new(),
            components: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn is_event(&self) -> bool {
        self.name.eq_ignore_ascii_case("VEVENT")
    }

    pub fn find_prop(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Classify the DTSTART property.
    ///
    /// `None` when DTSTART is absent or its value is not a DATE or DATE-TIME.
    pub fn start_time(&self) -> Option<StartTime> {
        StartTime::from_property(self.find_prop("DTSTART")?)
    }
}

/// One content line: `NAME;KEY=VAL:value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub params: Vec<Parameter>,
    /// TEXT values are stored unescaped (`\,` is held as `,`).
    pub value: String,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Property {
            name: name.into(),
            params: Vec::new(),
            value: value.into(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(Parameter {
            key: key.into(),
            value: Some(value.into()),
        });
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.key.eq_ignore_ascii_case(key))
            .and_then(|p| p.value.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub key: String,
    pub value: Option<String>,
}

/// Time zone information attached to a DATE-TIME value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Zone {
    /// `...Z` suffix
    Utc,
    /// No suffix and no TZID: local time wherever the attendee is
    Floating,
    /// `TZID=` parameter
    Tzid(String),
}

/// The start of an event, as either a calendar date or a date with time of day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartTime {
    DateOnly(NaiveDate),
    DateTime {
        date_time: NaiveDateTime,
        zone: Zone,
    },
}

impl StartTime {
    /// Interpret a DTSTART-like property.
    ///
    /// Handles:
    /// - `VALUE=DATE`: `DTSTART;VALUE=DATE:20240302`
    /// - UTC: `DTSTART:20240301T090000Z`
    /// - TZID parameter: `DTSTART;TZID=Europe/Berlin:20240301T090000`
    /// - Floating: `DTSTART:20240301T090000`
    /// - Bare date without VALUE=DATE: `DTSTART:20240302`
    pub fn from_property(prop: &Property) -> Option<StartTime> {
        let value = prop.value.trim();

        match prop.param("VALUE") {
            Some(kind) if kind.eq_ignore_ascii_case("DATE") => {
                return parse_date(value).map(StartTime::DateOnly);
            }
            Some(kind) if !kind.eq_ignore_ascii_case("DATE-TIME") => return None,
            _ => {}
        }

        if let Some(utc) = value.strip_suffix('Z') {
            return parse_date_time(utc).map(|date_time| StartTime::DateTime {
                date_time,
                zone: Zone::Utc,
            });
        }

        if let Some(date_time) = parse_date_time(value) {
            let zone = match prop.param("TZID") {
                Some(tzid) => Zone::Tzid(tzid.to_string()),
                None => Zone::Floating,
            };
            return Some(StartTime::DateTime { date_time, zone });
        }

        parse_date(value).map(StartTime::DateOnly)
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y%m%d").ok()
}

fn parse_date_time(s: &str) -> Option<NaiveDateTime> {
    if s.len() != 15 {
        return None;
    }
    NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S").ok()
}
