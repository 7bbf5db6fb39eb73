//! HTTP watermark fetcher.

use std::io::{self, Read};
use std::time::{Duration, Instant};

use imgshift_core::{FetchError, WatermarkFetcher};
use reqwest::blocking::{Client, ClientBuilder};
use reqwest::redirect::Policy;
use tracing::debug;

use crate::config::FetchConfig;
use crate::ssrf::{validate_url, CheckedUrl, EgressPolicy};

const READ_CHUNK: usize = 16 * 1024;

/// Fetches watermark images over HTTP(S) under an [`EgressPolicy`].
///
/// `timeout_ms` bounds the whole fetch, body included. Redirects are not
/// followed and system proxies are ignored; either would route the request
/// past the egress check.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    policy: EgressPolicy,
    timeout: Duration,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = client_builder(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            policy: EgressPolicy {
                allow_private_ips: config.allow_private_ips,
                allowed_hosts: config.allowed_hosts.clone(),
            },
            timeout,
            max_bytes: config.max_bytes,
        })
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Client that connects only to the checked addresses of `target`.
    fn client_for(&self, target: &CheckedUrl) -> Result<Client, FetchError> {
        let host = match target.url.host_str() {
            Some(host) if !target.addrs.is_empty() => host,
            _ => return Ok(self.client.clone()),
        };
        client_builder(self.timeout)
            .resolve_to_addrs(host, &target.addrs)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))
    }

    fn map_transport(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout_ms())
        } else {
            FetchError::Transport(e.to_string())
        }
    }

    fn map_read(&self, e: io::Error) -> FetchError {
        let timed_out = e.kind() == io::ErrorKind::TimedOut
            || e.get_ref()
                .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
                .is_some_and(reqwest::Error::is_timeout);
        if timed_out {
            FetchError::Timeout(self.timeout_ms())
        } else {
            FetchError::Transport(e.to_string())
        }
    }

    fn fetch_checked(&self, target: &CheckedUrl) -> Result<Vec<u8>, FetchError> {
        let deadline = Instant::now() + self.timeout;
        debug!(
            url = %target.url,
            pinned = target.addrs.len(),
            "fetching watermark"
        );

        let mut response = self
            .client_for(target)?
            .get(target.url.clone())
            .send()
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let declared = response.content_length().unwrap_or(0);
        if declared > self.max_bytes {
            return Err(FetchError::TooLarge {
                limit: self.max_bytes,
            });
        }

        // The client timeout restarts on every read; the deadline does not
        let mut body = Vec::new();
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            if Instant::now() >= deadline {
                return Err(FetchError::Timeout(self.timeout_ms()));
            }
            let read = match response.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.map_read(e)),
            };
            if (body.len() + read) as u64 > self.max_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk[..read]);
        }

        debug!(bytes = body.len(), "watermark fetched");
        Ok(body)
    }
}

fn client_builder(timeout: Duration) -> ClientBuilder {
    Client::builder()
        .timeout(timeout)
        .redirect(Policy::none())
        .no_proxy()
}

impl WatermarkFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let target = validate_url(url, &self.policy)?;
        self.fetch_checked(&target)
    }
}
