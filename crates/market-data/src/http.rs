//! Shared HTTP access for all upstream clients.
//!
//! Every provider talks to the network through [`HttpGetter`], so the
//! connection pool is shared and tests can substitute canned responses.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;

use crate::errors::MarketDataError;

/// Default HTTP request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on idle connections kept per host.
pub const DEFAULT_MAX_CONNECTIONS: usize = 20;

/// Raw answer of an upstream.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Performs GET requests.
///
/// Cancellation happens by dropping the returned future.
#[async_trait]
pub trait HttpGetter: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: &[(&'static str, &'static str)],
    ) -> Result<HttpResponse, MarketDataError>;
}

/// GET that fails on any status other than 200.
pub(crate) async fn get_ok(
    getter: &dyn HttpGetter,
    provider: &str,
    url: &str,
    headers: &[(&'static str, &'static str)],
) -> Result<Vec<u8>, MarketDataError> {
    debug!("{provider} GET {url}");
    let response = getter.get(url, headers).await?;
    if response.status != 200 {
        return Err(MarketDataError::provider(
            provider,
            format!("HTTP error: {} for {}", response.status, url),
        ));
    }

    Ok(response.body)
}

/// [`HttpGetter`] backed by a pooled `reqwest` client.
#[derive(Clone)]
pub struct ReqwestGetter {
    client: Client,
}

impl ReqwestGetter {
    pub fn new(max_connections: usize) -> Result<Self, MarketDataError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(max_connections)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpGetter for ReqwestGetter {
    async fn get(
        &self,
        url: &str,
        headers: &[(&'static str, &'static str)],
    ) -> Result<HttpResponse, MarketDataError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse { status, body })
    }
}
