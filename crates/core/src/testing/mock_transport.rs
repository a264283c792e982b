//! Mock HTTP transport for testing.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::services::{ApiRequest, ApiResponse, HttpTransport, Method, ServiceError};

type Handler = Arc<dyn Fn(&ApiRequest) -> ApiResponse + Send + Sync>;

struct Route {
    method: Method,
    path: String,
    handler: Handler,
}

impl Route {
    /// Exact path, or a prefix when the pattern ends with `*`.
    fn matches(&self, request: &ApiRequest) -> bool {
        if self.method != request.method {
            return false;
        }
        match self.path.strip_suffix('*') {
            Some(prefix) => request.path().starts_with(prefix),
            None => request.path() == self.path,
        }
    }
}

/// Mock implementation of [`HttpTransport`].
///
/// Routes are matched on method and URL path; the most recently registered
/// match wins, so a test can override a default route. Unmatched requests
/// get a 404. Every request is recorded.
///
/// # Example
///
/// ```rust,ignore
/// let transport = MockTransport::new();
/// transport.on(Method::Get, "/api/v3/downloadclient", |_| ApiResponse::ok_json(&json!([])));
/// transport.on(Method::Post, "/api/v3/*", |_| ApiResponse::new(201, "{}"));
///
/// // ... exercise a client ...
/// assert_eq!(transport.mutating_requests().len(), 1);
/// ```
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("routes", &"<routes>")
            .field("requests", &self.requests().len())
            .finish()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `method` and `path`.
    pub fn on<F>(&self, method: Method, path: &str, handler: F)
    where
        F: Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static,
    {
        self.routes.lock().unwrap().push(Route {
            method,
            path: path.to_string(),
            handler: Arc::new(handler),
        });
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests other than GETs.
    pub fn mutating_requests(&self) -> Vec<ApiRequest> {
        self.requests().into_iter().filter(ApiRequest::is_mutation).collect()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        let handler = self
            .routes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|route| route.matches(&request))
            .map(|route| route.handler.clone());
        Ok(match handler {
            Some(handler) => handler(&request),
            None => ApiResponse::new(404, "Not Found"),
        })
    }
}
