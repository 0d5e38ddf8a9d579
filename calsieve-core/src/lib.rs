//! Republish a remote iCalendar feed with all-day events removed.
//!
//! A run fetches the feed, parses it, keeps only VEVENTs whose DTSTART has a
//! time of day, serializes the result and publishes it together with an HTML
//! status page. See [`pipeline::Pipeline`].

pub mod calendar;
pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod ics;
pub mod pipeline;
pub mod publish;
pub mod report;
pub mod status_page;

pub use calendar::{CalendarDocument, Component, Property, RawCalendar, StartTime, Zone};
pub use config::SieveConfig;
pub use error::{SieveError, SieveResult, Stage};
pub use filter::{CalendarMeta, FilterStats, Filtered, filter};
pub use pipeline::{Pipeline, RunSummary};
pub use publish::{Artifacts, DirPublisher, Publisher};
pub use report::{Reporter, TracingReporter};
