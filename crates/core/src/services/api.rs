//! Request plumbing shared by the REST clients.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::ServiceError;
use super::transport::{ApiRequest, ApiResponse, HttpTransport};
use crate::retry::{retry, RetryPolicy};

/// Base URL, auth header and retry policy for one service.
#[derive(Clone)]
pub(crate) struct ServiceApi {
    name: String,
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    auth_header: Option<(String, String)>,
    retry: RetryPolicy,
}

impl ServiceApi {
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        transport: Arc<dyn HttpTransport>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            auth_header: None,
            retry,
        }
    }

    pub fn with_auth_header(mut self, header: &str, value: &str) -> Self {
        self.auth_header = Some((header.to_string(), value.to_string()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send with retry on transient failures; non-2xx becomes an error.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ServiceError> {
        let request = match &self.auth_header {
            Some((name, value)) => request.header(name.as_str(), value.as_str()),
            None => request,
        };
        let label = format!("{}: {} {}", self.name, request.method, request.path());
        retry(&self.retry, &label, ServiceError::is_transient, || {
            let request = request.clone();
            async move {
                let response = self.transport.send(request.clone()).await?;
                response.error_for_status(&request)
            }
        })
        .await
    }

    /// Like [`execute`](Self::execute) but returns the raw response whatever
    /// its status. Only transport failures are retried.
    pub async fn execute_raw(&self, request: ApiRequest) -> Result<ApiResponse, ServiceError> {
        let label = format!("{}: {} {}", self.name, request.method, request.path());
        retry(&self.retry, &label, ServiceError::is_transient, || {
            let request = request.clone();
            async move { self.transport.send(request).await }
        })
        .await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        self.execute(ApiRequest::get(self.url(path))).await?.json()
    }

    pub async fn post_json(&self, path: &str, body: Value) -> Result<ApiResponse, ServiceError> {
        self.execute(ApiRequest::post(self.url(path)).json(body)).await
    }

    pub async fn put_json(&self, path: &str, body: Value) -> Result<ApiResponse, ServiceError> {
        self.execute(ApiRequest::put(self.url(path)).json(body)).await
    }

    pub async fn post_form<K, V>(
        &self,
        path: &str,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Result<ApiResponse, ServiceError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.execute(ApiRequest::post(self.url(path)).form(fields)).await
    }
}

/// `fields` array entries as used by the *arr schema-driven resources.
pub(crate) fn field_value<'a>(resource: &'a Value, name: &str) -> Option<&'a Value> {
    resource
        .get("fields")?
        .as_array()?
        .iter()
        .find(|f| f.get("name").and_then(Value::as_str) == Some(name))
        .and_then(|f| f.get("value"))
}

/// Set `name` in the resource's `fields` array, appending it when absent.
pub(crate) fn set_field(resource: &mut Value, name: &str, value: Value) {
    if !resource.get("fields").map(Value::is_array).unwrap_or(false) {
        resource["fields"] = Value::Array(Vec::new());
    }
    if let Some(fields) = resource.get_mut("fields").and_then(Value::as_array_mut) {
        match fields
            .iter_mut()
            .find(|f| f.get("name").and_then(Value::as_str) == Some(name))
        {
            Some(field) => field["value"] = value,
            None => fields.push(serde_json::json!({ "name": name, "value": value })),
        }
    }
}

/// First entry of a list whose `implementation` equals `implementation`.
pub(crate) fn find_by_implementation<'a>(items: &'a [Value], implementation: &str) -> Option<&'a Value> {
    items
        .iter()
        .find(|item| item.get("implementation").and_then(Value::as_str) == Some(implementation))
}
