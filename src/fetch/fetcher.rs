//! HTTP fetcher implementation
//!
//! This module handles page downloads for the workers, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - Routing a request through an outbound proxy
//! - Classifying failures into [`FetchError`]
//!
//! Failures are never retried here; the worker drops the item.

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Why a page could not be fetched
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Invalid proxy {proxy}: {source}")]
    Proxy { proxy: String, source: reqwest::Error },
}

/// Downloads raw page content
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url`, optionally through `proxy`, returning the body on a 2xx response
    async fn fetch(&self, url: &str, proxy: Option<&str>) -> Result<String, FetchError>;
}

/// Client settings shared by every fetch
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub user_agent: String,
    pub timeout: Duration,
}

impl FetchSettings {
    pub fn from_config(config: &crate::config::WorkerConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }
}

/// Builds an HTTP client, optionally routed through a proxy
///
/// # Arguments
///
/// * `settings` - User agent and per-request timeout
/// * `proxy` - Proxy URL applied to both http and https traffic
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Invalid proxy or TLS backend failure
pub fn build_http_client(
    settings: &FetchSettings,
    proxy: Option<&str>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(settings.user_agent.clone())
        .timeout(settings.timeout)
        .connect_timeout(settings.timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

/// reqwest-backed fetcher
///
/// One client is built per known proxy up front so connections are pooled
/// per route; an unknown proxy gets a one-off client.
pub struct HttpFetcher {
    settings: FetchSettings,
    direct: Client,
    proxied: HashMap<String, Client>,
}

impl HttpFetcher {
    /// Creates a fetcher with clients for the direct route and every given proxy
    pub fn new<'a>(
        settings: FetchSettings,
        proxies: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, reqwest::Error> {
        let direct = build_http_client(&settings, None)?;

        let mut proxied = HashMap::new();
        for proxy in proxies {
            match build_http_client(&settings, Some(proxy)) {
                Ok(client) => {
                    proxied.insert(proxy.to_string(), client);
                }
                Err(e) => tracing::warn!(proxy, error = %e, "Skipping unusable proxy"),
            }
        }

        Ok(Self {
            settings,
            direct,
            proxied,
        })
    }

    fn client_for(&self, proxy: Option<&str>) -> Result<Client, FetchError> {
        match proxy {
            None => Ok(self.direct.clone()),
            Some(p) => match self.proxied.get(p) {
                Some(client) => Ok(client.clone()),
                None => build_http_client(&self.settings, Some(p)).map_err(|source| {
                    FetchError::Proxy {
                        proxy: p.to_string(),
                        source,
                    }
                }),
            },
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, proxy: Option<&str>) -> Result<String, FetchError> {
        let client = self.client_for(proxy)?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| classify_error(url, e))
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> FetchSettings {
        FetchSettings {
            user_agent: "HarvestTest/1.0".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&settings(), None).is_ok());
        assert!(build_http_client(&settings(), Some("http://10.0.0.1:8080")).is_ok());
    }

    #[test]
    fn test_fetcher_skips_unusable_proxy() {
        let fetcher = HttpFetcher::new(settings(), ["http://10.0.0.1:8080", "http://[::1"]);
        let fetcher = fetcher.unwrap();
        assert_eq!(fetcher.proxied.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_success_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/detail/filter"))
            .and(header("user-agent", "HarvestTest/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(settings(), []).unwrap();
        let body = fetcher
            .fetch(&format!("{}/detail/filter", server.uri()), None)
            .await
            .unwrap();

        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_fetch_non_success_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(settings(), []).unwrap();
        let err = fetcher
            .fetch(&format!("{}/blocked", server.uri()), None)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(
            FetchSettings {
                user_agent: "HarvestTest/1.0".to_string(),
                timeout: Duration::from_millis(200),
            },
            [],
        )
        .unwrap();
        let err = fetcher
            .fetch(&format!("{}/slow", server.uri()), None)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let fetcher = HttpFetcher::new(settings(), []).unwrap();
        let err = fetcher
            .fetch("http://127.0.0.1:9/unreachable", None)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Http { .. }));
    }
}
