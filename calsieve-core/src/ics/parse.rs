//! ICS parsing using the icalendar crate's parser.

use icalendar::parser::{self, read_calendar, unfold};

use crate::calendar::{CalendarDocument, Component, Parameter, Property, RawCalendar};
use crate::error::{SieveError, SieveResult};

/// Top-level properties every VCALENDAR must carry (RFC 5545 §3.6)
const REQUIRED_PROPERTIES: &[&str] = &["VERSION", "PRODID"];

/// Parse a fetched feed into a [`CalendarDocument`].
pub fn parse(raw: &RawCalendar) -> SieveResult<CalendarDocument> {
    parse_str(&raw.text)
}

/// Parse ICS text into a [`CalendarDocument`], keeping everything verbatim.
pub fn parse_str(content: &str) -> SieveResult<CalendarDocument> {
    let parse_error = |reason: String| SieveError::Parse {
        reason,
        bytes: content.len(),
    };

    if content.trim().is_empty() {
        return Err(parse_error("empty document".to_string()));
    }

    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| parse_error(e.to_string()))?;

    let document = CalendarDocument {
        properties: calendar.properties.iter().map(to_property).collect(),
        components: calendar.components.iter().map(to_component).collect(),
    };

    for name in REQUIRED_PROPERTIES {
        if document.find_prop(name).is_none() {
            return Err(parse_error(format!(
                "missing required calendar property {}",
                name
            )));
        }
    }

    Ok(document)
}

fn to_component(component: &parser::Component) -> Component {
    Component {
        name: component.name.to_string(),
        properties: component.properties.iter().map(to_property).collect(),
        components: component.components.iter().map(to_component).collect(),
    }
}

fn to_property(prop: &parser::Property) -> Property {
    Property {
        name: prop.name.to_string(),
        params: prop
            .params
            .iter()
            .map(|p| Parameter {
                key: p.key.to_string(),
                value: p.val.as_ref().map(|v| v.to_string()),
            })
            .collect(),
        value: prop.val.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{StartTime, Zone};

    const FEED: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Example Corp//Team Calendar//EN\r\n\
X-WR-CALNAME:Team\r\n\
BEGIN:VTIMEZONE\r\n\
TZID:Europe/Berlin\r\n\
BEGIN:STANDARD\r\n\
DTSTART:19701025T030000\r\n\
TZOFFSETFROM:+0200\r\n\
TZOFFSETTO:+0100\r\n\
END:STANDARD\r\n\
END:VTIMEZONE\r\n\
BEGIN:VEVENT\r\n\
UID:standup-1@example.com\r\n\
DTSTAMP:20240220T120000Z\r\n\
SUMMARY:Standup\r\n\
DTSTART;TZID=Europe/Berlin:20240301T090000\r\n\
DTEND;TZID=Europe/Berlin:20240301T091500\r\n\
DESCRIPTION:Daily sync \r\n with the whole team\r\n\
BEGIN:VALARM\r\n\
ACTION:DISPLAY\r\n\
DESCRIPTION:Reminder\r\n\
TRIGGER:-PT10M\r\n\
END:VALARM\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:holiday-1@example.com\r\n\
DTSTAMP:20240220T120000Z\r\n\
SUMMARY:Holiday\r\n\
DTSTART;VALUE=DATE:20240302\r\n\
DTEND;VALUE=DATE:20240303\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn test_parse_keeps_components_in_order() {
        let doc = parse_str(FEED).expect("Should parse");

        let names: Vec<&str> = doc.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["VTIMEZONE", "VEVENT", "VEVENT"]);
        assert_eq!(doc.find_prop("X-WR-CALNAME").unwrap().value, "Team");

        let timezone = &doc.components[0];
        assert_eq!(timezone.components.len(), 1);
        assert_eq!(timezone.components[0].name, "STANDARD");
    }

    #[test]
    fn test_parse_keeps_params_and_nested_alarms() {
        let doc = parse_str(FEED).expect("Should parse");
        let standup = &doc.components[1];

        assert_eq!(standup.find_prop("SUMMARY").unwrap().value, "Standup");
        assert_eq!(
            standup.find_prop("DTSTART").unwrap().param("TZID"),
            Some("Europe/Berlin")
        );
        assert!(matches!(
            standup.start_time(),
            Some(StartTime::DateTime {
                zone: Zone::Tzid(_),
                ..
            })
        ));
        assert_eq!(standup.components.len(), 1);
        assert_eq!(standup.components[0].name, "VALARM");
        assert_eq!(
            standup.find_prop("DESCRIPTION").unwrap().value,
            "Daily sync with the whole team"
        );

        let holiday = &doc.components[2];
        assert!(matches!(holiday.start_time(), Some(StartTime::DateOnly(_))));
    }

    #[test]
    fn test_parse_rejects_empty_input() {
        let err = parse_str("   \r\n").unwrap_err();
        assert!(matches!(err, SieveError::Parse { bytes: 5, .. }));
    }

    #[test]
    fn test_parse_rejects_missing_prodid() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:x\r\n\
DTSTART:20240301T090000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        match parse_str(ics) {
            Err(SieveError::Parse { reason, bytes }) => {
                assert!(reason.contains("PRODID"), "unexpected reason: {}", reason);
                assert_eq!(bytes, ics.len());
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_non_calendar_text() {
        let html = "<html><body>Service Unavailable</body></html>";
        assert!(matches!(parse_str(html), Err(SieveError::Parse { .. })));
    }
}
