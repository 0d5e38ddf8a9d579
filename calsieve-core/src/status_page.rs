//! HTML status page published next to the calendar file.

use chrono::{DateTime, Utc};
use url::Url;

pub struct StatusPage<'a> {
    pub title: &'a str,
    pub calendar_file: &'a str,
    pub included: usize,
    pub updated_at: DateTime<Utc>,
    /// Where the output directory is served from, if known
    pub public_url: Option<&'a Url>,
}

/// `YYYY-MM-DD HH:MM:SS UTC`
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

impl StatusPage<'_> {
    /// Absolute https and webcal subscription links, when a public URL is configured.
    fn subscription_urls(&self) -> Option<(String, String)> {
        let url = self.public_url?.join(self.calendar_file).ok()?;
        let https = url.to_string();
        let webcal = match https.split_once("://") {
            Some((_, rest)) => format!("webcal://{}", rest),
            None => https.clone(),
        };
        Some((https, webcal))
    }

    pub fn render(&self) -> String {
        let title = escape_html(self.title);
        let href = escape_html(self.calendar_file);
        let event_noun = if self.included == 1 { "event" } else { "events" };

        let subscribe = match self.subscription_urls() {
            Some((https, webcal)) => format!(
                "<p>Subscribe in your calendar app with this URL:</p>\n\
                 <pre>{https}</pre>\n\
                 <p><a href=\"{webcal}\">Open in calendar app</a></p>\n",
                https = escape_html(&https),
                webcal = escape_html(&webcal),
            ),
            None => "<p>To subscribe, copy the address of the download link above and add it \
                     to your calendar app as a calendar subscription (\"From URL\" / \"Add by URL\").</p>\n"
                .to_string(),
        };

        format!(
            "<!DOCTYPE html>\n\
<html>\n\
<head>\n\
<meta charset=\"utf-8\">\n\
<title>{title}</title>\n\
</head>\n\
<body>\n\
<h1>{title}</h1>\n\
<p>Last updated: {updated}</p>\n\
<p>{included} timed {event_noun} (all-day events removed)</p>\n\
<p><a href=\"{href}\">Download Calendar</a></p>\n\
<h2>Subscribe</h2>\n\
{subscribe}\
<p>Calendar apps refresh subscriptions on their own schedule, usually every few hours.</p>\n\
</body>\n\
</html>\n",
            updated = format_timestamp(self.updated_at),
            included = self.included,
        )
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
