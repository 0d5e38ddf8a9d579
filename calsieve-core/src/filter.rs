//! Timed-event filter.

use crate::calendar::{CalendarDocument, Component, Property, StartTime};

pub const DEFAULT_PRODID: &str = "-//calsieve//Timed Events//EN";

/// Fixed metadata for the republished calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarMeta {
    pub prodid: String,
    pub name: Option<String>,
}

impl Default for CalendarMeta {
    fn default() -> Self {
        CalendarMeta {
            prodid: DEFAULT_PRODID.to_string(),
            name: None,
        }
    }
}

impl CalendarMeta {
    fn properties(&self) -> Vec<Property> {
        let mut properties = vec![
            Property::new("PRODID", self.prodid.clone()),
            Property::new("VERSION", "2.0"),
        ];
        if let Some(name) = &self.name {
            properties.push(Property::new("X-WR-CALNAME", name.clone()));
        }
        properties
    }
}

/// How many VEVENTs were seen and what happened to them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub total: usize,
    pub included: usize,
    pub all_day: usize,
    pub missing_start: usize,
    pub unclassified: usize,
}

impl FilterStats {
    pub fn excluded(&self) -> usize {
        self.total - self.included
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filtered {
    pub calendar: CalendarDocument,
    pub stats: FilterStats,
}

enum Verdict {
    Timed,
    AllDay,
    MissingStart,
    Unclassified,
}

fn classify(event: &Component) -> Verdict {
    if event.find_prop("DTSTART").is_none() {
        return Verdict::MissingStart;
    }
    match event.start_time() {
        Some(StartTime::DateTime { .. }) => Verdict::Timed,
        Some(StartTime::DateOnly(_)) => Verdict::AllDay,
        None => Verdict::Unclassified,
    }
}

/// Build a new calendar holding only the timed VEVENTs of `cal`.
///
/// Events are copied unchanged and in their original order. Everything else
/// (time zones, to-dos, the source calendar's own properties) is dropped.
pub fn filter(cal: &CalendarDocument, meta: &CalendarMeta) -> Filtered {
    let mut stats = FilterStats::default();
    let mut components = Vec::new();

    for event in cal.events() {
        stats.total += 1;
        match classify(event) {
            Verdict::Timed => {
                stats.included += 1;
                components.push(event.clone());
            }
            Verdict::AllDay => stats.all_day += 1,
            Verdict::MissingStart => stats.missing_start += 1,
            Verdict::Unclassified => stats.unclassified += 1,
        }
    }

    Filtered {
        calendar: CalendarDocument {
            properties: meta.properties(),
            components,
        },
        stats,
    }
}
