//! Blocking HTTP GET over libcurl (via the `curl` crate).
//!
//! Both the feed client and the artifact fetcher go through [`get`]. Runs in
//! the current thread; call from `spawn_blocking` if used from async code.

use crate::error::TransferError;
use std::time::Duration;

/// Timeouts applied to one transfer.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub connect: Duration,
    pub total: Duration,
}

impl Timeouts {
    /// Feed pages are small; give up quickly.
    pub const FEED: Timeouts = Timeouts {
        connect: Duration::from_secs(30),
        total: Duration::from_secs(120),
    };

    /// E-prints can be tens of megabytes.
    pub const ARTIFACT: Timeouts = Timeouts {
        connect: Duration::from_secs(30),
        total: Duration::from_secs(3600),
    };
}

/// Successful (2xx) response with the whole body buffered.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u32,
    /// `Content-Type` of the final response after redirects, if it sent one.
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Performs a GET and buffers the body. Non-2xx statuses become `TransferError::Http`.
///
/// `headers` are sent as-is (`("Content-Type", "application/json")` etc.).
pub fn get(url: &str, headers: &[(&str, &str)], timeouts: Timeouts) -> Result<Response, TransferError> {
    let mut body: Vec<u8> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(timeouts.connect)?;
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(Duration::from_secs(60))?;
    easy.timeout(timeouts.total)?;

    if !headers.is_empty() {
        let mut list = curl::easy::List::new();
        for (k, v) in headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        easy.http_headers(list)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let status = easy.response_code()?;
    if !(200..300).contains(&status) {
        return Err(TransferError::Http(status));
    }

    let content_type = easy.content_type()?.map(str::to_string);
    Ok(Response {
        status,
        content_type,
        body,
    })
}
