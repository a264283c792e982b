//! Gluetun control server: reports the port forwarded by the VPN provider.

use std::sync::Arc;

use serde::Deserialize;

use super::api::ServiceApi;
use super::error::ServiceError;
use super::transport::HttpTransport;
use crate::retry::RetryPolicy;

#[derive(Debug, Deserialize)]
struct PortForwarded {
    #[serde(default)]
    port: u16,
}

pub struct GluetunClient {
    api: ServiceApi,
}

impl GluetunClient {
    pub fn new(base_url: &str, transport: Arc<dyn HttpTransport>, retry: RetryPolicy) -> Self {
        Self {
            api: ServiceApi::new("Gluetun", base_url, transport, retry),
        }
    }

    /// `None` while the provider has not assigned a port yet.
    pub async fn forwarded_port(&self) -> Result<Option<u16>, ServiceError> {
        let body: PortForwarded = self.api.get_json("/v1/openvpn/portforwarded").await?;
        Ok(Some(body.port).filter(|p| *p > 0))
    }
}
