use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

/// Performs a single health request.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// GET `url`, returning the HTTP status or a short error description.
    async fn check(&self, url: &str) -> Result<u16, String>;
}

/// [`HealthCheck`] over reqwest.
#[derive(Debug, Clone)]
pub struct HttpHealthCheck {
    client: Client,
}

impl HttpHealthCheck {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthCheck for HttpHealthCheck {
    async fn check(&self, url: &str) -> Result<u16, String> {
        match self.client.get(url).send().await {
            Ok(resp) => Ok(resp.status().as_u16()),
            Err(e) if e.is_timeout() => Err("timed out".to_string()),
            Err(e) if e.is_connect() => Err("connection refused".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }
}
