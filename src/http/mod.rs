//! HTTP client options shared by the clients of a project.

use crate::core::middleware::AuthMiddleware;
use reqwest::{Client, Proxy};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use std::time::Duration;

const DEFAULT_MAX_RETRIES: u32 = 3;

/// Transport settings for the HTTP clients created by a project factory.
///
/// ```rust
/// # use firebase_projects::http::HttpClientOptions;
/// # use std::time::Duration;
/// let options = HttpClientOptions::default()
///     .with_timeout(Duration::from_secs(10))
///     .with_max_retries(0);
/// assert_eq!(options.timeout(), Some(Duration::from_secs(10)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientOptions {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    proxy: Option<String>,
    max_retries: u32,
}

impl Default for HttpClientOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: None,
            read_timeout: None,
            proxy: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl HttpClientOptions {
    /// Total time allowed for a request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Routes all traffic through the given proxy URL.
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Retries of transient failures; `0` disables the retry layer.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Builds a client authenticating through `middleware`.
    pub fn build_client(&self, middleware: AuthMiddleware) -> Result<ClientWithMiddleware, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = self.read_timeout {
            builder = builder.read_timeout(timeout);
        }
        if let Some(proxy) = &self.proxy {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        let mut client = ClientBuilder::new(builder.build()?);
        if self.max_retries > 0 {
            let retry_policy = ExponentialBackoff::builder().build_with_max_retries(self.max_retries);
            client = client.with(RetryTransientMiddleware::new_with_policy(retry_policy));
        }

        Ok(client.with(middleware).build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = HttpClientOptions::default();
        assert_eq!(options.timeout(), None);
        assert_eq!(options.proxy(), None);
        assert_eq!(options.max_retries(), 3);
    }

    #[test]
    fn test_builder_methods() {
        let options = HttpClientOptions::default()
            .with_timeout(Duration::from_secs(10))
            .with_connect_timeout(Duration::from_secs(2))
            .with_read_timeout(Duration::from_secs(5))
            .with_proxy("http://proxy.local:3128")
            .with_max_retries(1);

        assert_eq!(options.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(options.connect_timeout(), Some(Duration::from_secs(2)));
        assert_eq!(options.read_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(options.proxy(), Some("http://proxy.local:3128"));
        assert_eq!(options.max_retries(), 1);
    }
}
