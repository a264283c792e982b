use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// `application/x-www-form-urlencoded`; keys may repeat.
    Form(Vec<(String, String)>),
}

/// A single HTTP request issued by a service client.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn form<K: Into<String>, V: Into<String>>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self {
        self.body = RequestBody::Form(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// URL path without scheme, host or query.
    pub fn path(&self) -> &str {
        let rest = self.url.split_once("://").map(|(_, r)| r).unwrap_or(&self.url);
        let path = rest.find('/').map(|i| &rest[i..]).unwrap_or("/");
        path.split('?').next().unwrap_or(path)
    }

    pub fn is_mutation(&self) -> bool {
        self.method != Method::Get
    }

    /// JSON body, if any.
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(v) => Some(v),
            _ => None,
        }
    }

    /// First value of a form field, if any.
    pub fn form_value(&self, key: &str) -> Option<&str> {
        match &self.body {
            RequestBody::Form(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

/// Raw response: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok_json(body: &Value) -> Self {
        Self::new(200, body.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ServiceError> {
        serde_json::from_str(&self.body).map_err(|e| ServiceError::InvalidResponse(e.to_string()))
    }

    /// Turn a non-2xx status into [`ServiceError::Http`].
    pub fn error_for_status(self, request: &ApiRequest) -> Result<Self, ServiceError> {
        if self.is_success() {
            return Ok(self);
        }
        Err(ServiceError::Http {
            method: request.method.to_string(),
            url: request.url.clone(),
            status: self.status,
            body: self.body.chars().take(200).collect(),
        })
    }
}

/// Sends [`ApiRequest`]s. Non-2xx statuses are returned, not raised.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ServiceError>;
}

/// [`HttpTransport`] over reqwest, with a cookie jar for session-based APIs.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| ServiceError::ConnectionFailed(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ServiceError> {
        debug!("{} {}", request.method, request.url);
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(fields) => builder.form(fields),
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::Timeout(request.url.clone())
            } else if e.is_connect() {
                ServiceError::ConnectionFailed(e.to_string())
            } else {
                ServiceError::InvalidResponse(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;
        Ok(ApiResponse { status, body })
    }
}
