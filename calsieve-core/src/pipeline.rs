//! One fetch → parse → filter → serialize → publish run.

use chrono::Utc;

use crate::config::SieveConfig;
use crate::error::{SieveError, SieveResult, Stage};
use crate::fetch::{fetch, http_client};
use crate::filter::{FilterStats, filter};
use crate::ics;
use crate::publish::{Artifacts, Publisher};
use crate::report::Reporter;

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: FilterStats,
    pub bytes_fetched: usize,
    pub bytes_written: usize,
}

pub struct Pipeline<'a> {
    config: &'a SieveConfig,
    publisher: &'a dyn Publisher,
    reporter: &'a dyn Reporter,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a SieveConfig,
        publisher: &'a dyn Publisher,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Pipeline {
            config,
            publisher,
            reporter,
        }
    }

    /// Run every stage once, stopping at the first failure.
    ///
    /// Nothing is published unless all earlier stages succeeded.
    pub async fn run(&self) -> SieveResult<RunSummary> {
        let url = &self.config.source_url;

        self.reporter.stage_started(Stage::Fetch);
        let client = http_client(self.config.request_timeout).map_err(|source| {
            SieveError::Transport {
                url: url.to_string(),
                source,
            }
        });
        let client = self.observe(client)?;
        let raw = self.observe(fetch(&client, url).await)?;
        self.reporter.stage_completed(
            Stage::Fetch,
            &format!("fetched {} bytes from {}", raw.text.len(), url),
        );

        self.reporter.stage_started(Stage::Parse);
        let document = self.observe(ics::parse(&raw))?;
        self.reporter.stage_completed(
            Stage::Parse,
            &format!("parsed {} components", document.components.len()),
        );

        self.reporter.stage_started(Stage::Filter);
        let filtered = filter(&document, &self.config.calendar_meta());
        self.reporter.filtered(&filtered.stats);
        self.reporter.stage_completed(
            Stage::Filter,
            &format!(
                "kept {} of {} events",
                filtered.stats.included, filtered.stats.total
            ),
        );

        self.reporter.stage_started(Stage::Serialize);
        let calendar = ics::serialize(&filtered.calendar);
        self.reporter.stage_completed(
            Stage::Serialize,
            &format!("serialized {} bytes", calendar.len()),
        );

        self.reporter.stage_started(Stage::Publish);
        let artifacts = Artifacts {
            calendar,
            included: filtered.stats.included,
            generated_at: Utc::now(),
        };
        self.observe(self.publisher.publish(&artifacts))?;
        self.reporter.stage_completed(
            Stage::Publish,
            &format!("published to {}", self.config.output_dir.display()),
        );

        Ok(RunSummary {
            stats: filtered.stats,
            bytes_fetched: raw.text.len(),
            bytes_written: artifacts.calendar.len(),
        })
    }

    /// Report a failure under the stage the error belongs to.
    fn observe<T>(&self, result: SieveResult<T>) -> SieveResult<T> {
        if let Err(e) = &result {
            self.reporter.stage_failed(e.stage(), e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_PATH_VAR;
    use crate::publish::DirPublisher;
    use crate::report::testing::RecordingReporter;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;
    use std::path::Path;

    const FEED: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Upstream//EN\r\n\
BEGIN:VTIMEZONE\r\n\
TZID:Europe/Berlin\r\n\
END:VTIMEZONE\r\n\
BEGIN:VEVENT\r\n\
UID:standup@example.com\r\n\
DTSTAMP:20240220T120000Z\r\n\
SUMMARY:Standup\r\n\
DTSTART:20240301T090000Z\r\n\
DTEND:20240301T091500Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:holiday@example.com\r\n\
DTSTAMP:20240220T120000Z\r\n\
SUMMARY:Holiday\r\n\
DTSTART;VALUE=DATE:20240302\r\n\
DTEND;VALUE=DATE:20240303\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/feed.ics", addr)
    }

    fn config(url: &str, output_dir: &Path) -> SieveConfig {
        let vars = [
            ("CALSIEVE_SOURCE_URL", url.to_string()),
            ("CALSIEVE_OUTPUT_DIR", output_dir.to_string_lossy().to_string()),
            ("CALSIEVE_CALENDAR_NAME", "Timed only".to_string()),
            (CONFIG_PATH_VAR, "/nonexistent/calsieve.toml".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        SieveConfig::from_vars(vars).expect("Should load config")
    }

    #[tokio::test]
    async fn test_run_publishes_timed_events() {
        let url = serve(Router::new().route("/feed.ics", get(|| async { FEED }))).await;
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&url, dir.path());
        let publisher = DirPublisher::from_config(&cfg);
        let reporter = RecordingReporter::default();

        let summary = Pipeline::new(&cfg, &publisher, &reporter)
            .run()
            .await
            .expect("Should run");

        assert_eq!(summary.stats.total, 2);
        assert_eq!(summary.stats.included, 1);
        assert_eq!(summary.bytes_fetched, FEED.len());

        let calendar = std::fs::read_to_string(publisher.calendar_path()).unwrap();
        assert!(calendar.contains("SUMMARY:Standup\r\n"));
        assert!(!calendar.contains("Holiday"));
        assert!(!calendar.contains("VTIMEZONE"));
        assert!(calendar.contains("X-WR-CALNAME:Timed only\r\n"));
        assert_eq!(calendar.len(), summary.bytes_written);

        let page = std::fs::read_to_string(publisher.status_page_path()).unwrap();
        assert!(page.contains("1 timed event "));
        assert!(page.contains("<title>Timed only</title>"));

        let lines = reporter.lines();
        assert!(lines.contains(&"filtered 1/2".to_string()));
        assert!(lines.iter().any(|l| l.starts_with("done publish")));
        assert!(!lines.iter().any(|l| l.starts_with("failed")));
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_output_untouched() {
        let url = serve(Router::new().route(
            "/feed.ics",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        ))
        .await;
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&url, dir.path());
        let publisher = DirPublisher::from_config(&cfg);
        std::fs::write(publisher.calendar_path(), "previous calendar").unwrap();
        std::fs::write(publisher.status_page_path(), "previous page").unwrap();
        let reporter = RecordingReporter::default();

        let err = Pipeline::new(&cfg, &publisher, &reporter)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, SieveError::Fetch { status: 503, .. }));
        assert_eq!(
            std::fs::read_to_string(publisher.calendar_path()).unwrap(),
            "previous calendar"
        );
        assert_eq!(
            std::fs::read_to_string(publisher.status_page_path()).unwrap(),
            "previous page"
        );

        let lines = reporter.lines();
        assert!(lines.iter().any(|l| l.starts_with("failed fetch")));
        assert!(!lines.iter().any(|l| l.starts_with("start parse")));
    }

    #[tokio::test]
    async fn test_parse_failure_publishes_nothing() {
        let url = serve(Router::new().route(
            "/feed.ics",
            get(|| async { "<html>login required</html>" }),
        ))
        .await;
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let cfg = config(&url, &out);
        let publisher = DirPublisher::from_config(&cfg);
        let reporter = RecordingReporter::default();

        let err = Pipeline::new(&cfg, &publisher, &reporter)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, SieveError::Parse { bytes: 27, .. }));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_empty_feed_publishes_empty_calendar() {
        let url = serve(Router::new().route(
            "/feed.ics",
            get(|| async { "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Upstream//EN\r\nEND:VCALENDAR\r\n" }),
        ))
        .await;
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&url, dir.path());
        let publisher = DirPublisher::from_config(&cfg);
        let reporter = RecordingReporter::default();

        let summary = Pipeline::new(&cfg, &publisher, &reporter)
            .run()
            .await
            .expect("Should run");

        assert_eq!(summary.stats.total, 0);
        assert_eq!(summary.stats.included, 0);
        let calendar = std::fs::read_to_string(publisher.calendar_path()).unwrap();
        assert!(calendar.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(!calendar.contains("BEGIN:VEVENT"));
    }

    #[test]
    fn test_failures_are_reported_under_their_own_stage() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config("http://127.0.0.1:9/feed.ics", dir.path());
        let publisher = DirPublisher::from_config(&cfg);
        let reporter = RecordingReporter::default();
        let pipeline = Pipeline::new(&cfg, &publisher, &reporter);

        // a reqwest error without a network round trip
        let source = reqwest::Client::new().get("not a url").build().unwrap_err();
        let err = pipeline
            .observe::<()>(Err(SieveError::Transport {
                url: cfg.source_url.to_string(),
                source,
            }))
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Fetch);

        let _ = pipeline.observe::<()>(Err(SieveError::Parse {
            reason: "missing PRODID".into(),
            bytes: 3,
        }));

        assert_eq!(
            reporter.lines(),
            vec![
                "failed fetch: Request to http://127.0.0.1:9/feed.ics failed".to_string(),
                "failed parse: ICS parse error (3 bytes received): missing PRODID".to_string(),
            ]
        );
    }
}
