use std::io;
use std::thread;
use std::time::Duration;

use camino::Utf8Path;
use regex::Regex;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, warn};

use crate::error::GnssError;
use crate::fs_util;
use crate::tools::{Fetcher, RemoteFile};

/// In-process transport for HTTP(S) archives. FTP-only archives still need
/// [`crate::tools::WgetFetcher`].
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, GnssError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("gnss-fetch/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| GnssError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| GnssError::Http(err.to_string()))?;
        Ok(Self { client })
    }

    fn send_with_retries<F>(&self, mut make_req: F) -> Result<Response, GnssError>
    where
        F: FnMut() -> RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(GnssError::Http(err.to_string()));
                }
            }
        }
    }

    /// `Ok(false)` when the server has no such file.
    fn download(&self, url: &str, work_dir: &Utf8Path, name: &str) -> Result<bool, GnssError> {
        let mut response = self.send_with_retries(|| self.client.get(url))?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(url, "not on server");
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(GnssError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let mut temp = tempfile::Builder::new()
            .prefix(".gnss-fetch")
            .tempfile_in(work_dir.as_std_path())
            .map_err(|err| GnssError::Filesystem(err.to_string()))?;
        io::copy(&mut response, temp.as_file_mut())
            .map_err(|err| GnssError::Http(format!("{url}: {err}")))?;
        temp.persist(work_dir.join(name).as_std_path())
            .map_err(|err| GnssError::Filesystem(err.to_string()))?;
        Ok(true)
    }

    fn list_index(&self, url_dir: &str) -> Result<Vec<String>, GnssError> {
        let response = self.send_with_retries(|| self.client.get(url_dir))?;
        if !response.status().is_success() {
            return Err(GnssError::HttpStatus {
                status: response.status().as_u16(),
                url: url_dir.to_string(),
            });
        }
        let body = response
            .text()
            .map_err(|err| GnssError::Http(err.to_string()))?;
        index_entries(&body)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, remote: &RemoteFile, work_dir: &Utf8Path) -> Result<(), GnssError> {
        if !remote.url_dir.starts_with("http://") && !remote.url_dir.starts_with("https://") {
            return Err(GnssError::Http(format!(
                "{} needs an FTP-capable transport",
                remote.url_dir
            )));
        }

        if remote.has_wildcard() {
            let matcher = fs_util::glob_regex(&remote.pattern())?;
            for name in self.list_index(&remote.url_dir)? {
                if matcher.is_match(&name) {
                    let url = format!("{}{name}", remote.url_dir);
                    self.download(&url, work_dir, &name)?;
                }
            }
            return Ok(());
        }

        for compression in &remote.candidates {
            let name = format!("{}{}", remote.stem, compression.suffix());
            let url = format!("{}{name}", remote.url_dir);
            match self.download(&url, work_dir, &name) {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(err) => warn!(url, error = %err, "download failed"),
            }
        }
        Ok(())
    }
}

/// File names linked from an HTML directory index.
fn index_entries(html: &str) -> Result<Vec<String>, GnssError> {
    let href = Regex::new(r#"(?i)href\s*=\s*"([^"?#]+)""#)
        .map_err(|err| GnssError::InvalidPattern(err.to_string()))?;
    let mut names = href
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|link| !link.ends_with('/'))
        .filter_map(|link| link.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    names.sort();
    names.dedup();
    Ok(names)
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
