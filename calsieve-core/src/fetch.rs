//! Feed download.

use std::time::Duration;

use url::Url;

use crate::calendar::RawCalendar;
use crate::error::{SieveError, SieveResult};

const USER_AGENT: &str = concat!("calsieve/", env!("CARGO_PKG_VERSION"));

/// Keep error messages readable when a server answers with a full HTML page
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Build the HTTP client used for fetching feeds.
pub fn http_client(timeout: Option<Duration>) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}

/// Download the feed with a single GET request.
pub async fn fetch(client: &reqwest::Client, url: &Url) -> SieveResult<RawCalendar> {
    let transport = |source: reqwest::Error| SieveError::Transport {
        url: url.to_string(),
        source,
    };

    let response = client.get(url.clone()).send().await.map_err(transport)?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SieveError::Fetch {
            url: url.to_string(),
            status: status.as_u16(),
            body: truncate(body.trim(), MAX_ERROR_BODY_CHARS),
        });
    }

    let text = response.text().await.map_err(transport)?;

    Ok(RawCalendar {
        url: url.to_string(),
        text,
    })
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
