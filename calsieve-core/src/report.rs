//! Progress reporting for pipeline runs.
//!
//! The pipeline never logs directly; it tells a [`Reporter`] what happened.
//! [`TracingReporter`] turns that into `tracing` events.

use std::error::Error;

use crate::error::{SieveError, Stage};
use crate::filter::FilterStats;

pub trait Reporter {
    fn stage_started(&self, stage: Stage);

    /// A stage finished; `detail` is a short human-readable summary.
    fn stage_completed(&self, stage: Stage, detail: &str);

    fn stage_failed(&self, stage: Stage, error: &SieveError);

    /// Called once the filter has classified every event.
    fn filtered(&self, _stats: &FilterStats) {}
}

/// Reports through the `tracing` macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn stage_started(&self, stage: Stage) {
        tracing::debug!(stage = %stage, "stage started");
    }

    fn stage_completed(&self, stage: Stage, detail: &str) {
        tracing::info!(stage = %stage, "{}", detail);
    }

    fn stage_failed(&self, stage: Stage, error: &SieveError) {
        let mut cause = error.to_string();
        let mut source = error.source();
        while let Some(err) = source {
            cause.push_str(": ");
            cause.push_str(&err.to_string());
            source = err.source();
        }
        tracing::error!(stage = %stage, error = %cause, "stage failed");
    }

    fn filtered(&self, stats: &FilterStats) {
        if stats.unclassified > 0 {
            tracing::warn!(
                count = stats.unclassified,
                "events with an unrecognized DTSTART were skipped"
            );
        }
        tracing::debug!(
            total = stats.total,
            included = stats.included,
            all_day = stats.all_day,
            missing_start = stats.missing_start,
            excluded = stats.excluded(),
            "filter summary"
        );
    }
}
