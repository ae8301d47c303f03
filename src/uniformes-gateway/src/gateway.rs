//! The request gateway every domain service calls.
//!
//! A single call goes `Pending -> {Succeeded, Unauthorized, Forbidden,
//! ClientError, ServerError, NetworkUnreachable}` with no retries. Each call
//! that reaches the network reports to the connectivity tracker exactly once,
//! before the outcome is returned. Error statuses report as soon as the
//! status line arrives; a 2xx reports only once its body has been read, so a
//! timeout mid-body counts as unreachable.

use reqwest::{Method, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use uniformes_login::CredentialStore;

use crate::config::{ApiEndpoint, ConfigError};
use crate::connectivity::ConnectivityTracker;
use crate::detail::ErrorDetail;
use crate::error::{GatewayError, GatewayResult};
use crate::guard::{LoggingNavigator, Navigator, SessionGuard};
use crate::http_client::{
    DEFAULT_TIMEOUT, create_client_with_timeout, create_health_check_client,
};
use crate::request::{
    ApiResponse, MultipartBody, RequestBody, RequestOptions, UploadFile, compose_headers,
    resolve_url,
};

struct Inner {
    http: reqwest::Client,
    health_http: reqwest::Client,
    endpoint: ApiEndpoint,
    store: Arc<CredentialStore>,
    connectivity: Arc<ConnectivityTracker>,
    guard: SessionGuard,
}

/// Shared HTTP facade. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.inner.endpoint.base_url())
            .finish_non_exhaustive()
    }
}

/// Wires a `Gateway` to its collaborators.
pub struct GatewayBuilder {
    endpoint: ApiEndpoint,
    store: Option<Arc<CredentialStore>>,
    connectivity: Option<Arc<ConnectivityTracker>>,
    navigator: Option<Arc<dyn Navigator>>,
    timeout: Duration,
}

impl GatewayBuilder {
    pub fn credential_store(mut self, store: Arc<CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn connectivity(mut self, tracker: Arc<ConnectivityTracker>) -> Self {
        self.connectivity = Some(tracker);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Gateway, ConfigError> {
        let http = create_client_with_timeout(self.timeout).map_err(ConfigError::HttpClient)?;
        let health_http = create_health_check_client().map_err(ConfigError::HttpClient)?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(CredentialStore::in_memory()));
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(LoggingNavigator));
        let guard = SessionGuard::new(store.clone(), navigator);

        Ok(Gateway {
            inner: Arc::new(Inner {
                http,
                health_http,
                endpoint: self.endpoint,
                store,
                connectivity: self.connectivity.unwrap_or_default(),
                guard,
            }),
        })
    }
}

impl Gateway {
    pub fn builder(endpoint: ApiEndpoint) -> GatewayBuilder {
        GatewayBuilder {
            endpoint,
            store: None,
            connectivity: None,
            navigator: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn credential_store(&self) -> &Arc<CredentialStore> {
        &self.inner.store
    }

    pub fn connectivity(&self) -> &Arc<ConnectivityTracker> {
        &self.inner.connectivity
    }

    pub fn session_guard(&self) -> &SessionGuard {
        &self.inner.guard
    }

    pub fn base_url(&self) -> String {
        self.inner.endpoint.base_url()
    }

    /// Point subsequent calls at another backend.
    pub fn set_base_url(&self, url: &str) -> Result<(), ConfigError> {
        self.inner.endpoint.set_base_url(url)
    }

    /// Issue a call and parse its body.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        options: RequestOptions,
    ) -> GatewayResult<ApiResponse> {
        let response = self.dispatch(method, path, body, &options).await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            self.inner.connectivity.report(true);
            return Ok(ApiResponse::empty(status.as_u16()));
        }

        let bytes = self.read_body(response).await?;
        Ok(ApiResponse::from_body(status.as_u16(), &bytes))
    }

    pub async fn get(&self, path: &str, options: RequestOptions) -> GatewayResult<ApiResponse> {
        self.request(Method::GET, path, RequestBody::Empty, options)
            .await
    }

    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        options: RequestOptions,
    ) -> GatewayResult<ApiResponse> {
        self.request(Method::POST, path, RequestBody::json(body)?, options)
            .await
    }

    pub async fn put<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        options: RequestOptions,
    ) -> GatewayResult<ApiResponse> {
        self.request(Method::PUT, path, RequestBody::json(body)?, options)
            .await
    }

    pub async fn patch<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        options: RequestOptions,
    ) -> GatewayResult<ApiResponse> {
        self.request(Method::PATCH, path, RequestBody::json(body)?, options)
            .await
    }

    pub async fn delete(&self, path: &str, options: RequestOptions) -> GatewayResult<ApiResponse> {
        self.request(Method::DELETE, path, RequestBody::Empty, options)
            .await
    }

    /// Upload one file as `multipart/form-data` under `field_name`.
    pub async fn upload_binary(
        &self,
        path: &str,
        file: UploadFile,
        field_name: &str,
    ) -> GatewayResult<ApiResponse> {
        self.upload_multipart(
            path,
            MultipartBody::new().file(field_name, file),
            RequestOptions::default(),
        )
        .await
    }

    /// Upload an arbitrary multipart body (files plus text fields).
    pub async fn upload_multipart(
        &self,
        path: &str,
        body: MultipartBody,
        options: RequestOptions,
    ) -> GatewayResult<ApiResponse> {
        self.request(Method::POST, path, RequestBody::Multipart(body), options)
            .await
    }

    /// Fetch a binary resource (documents, receipts) as raw bytes.
    pub async fn download(&self, path: &str, options: RequestOptions) -> GatewayResult<Vec<u8>> {
        let response = self
            .dispatch(Method::GET, path, RequestBody::Empty, &options)
            .await?;
        self.read_body(response).await
    }

    /// Probe the health endpoint and report the outcome.
    pub async fn probe(&self) -> bool {
        self.inner
            .connectivity
            .probe(&self.inner.health_http, &self.base_url())
            .await
    }

    /// Poll the health endpoint every `every` until the returned handle is
    /// dropped.
    pub fn spawn_health_poller(&self, every: Duration) -> HealthPoller {
        let gateway = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let online = gateway.probe().await;
                debug!(online, "Background health probe");
            }
        });
        HealthPoller { handle }
    }

    /// Read a 2xx body and report the outcome of the whole exchange.
    async fn read_body(&self, response: Response) -> GatewayResult<Vec<u8>> {
        let status = response.status();
        match response.bytes().await {
            Ok(bytes) => {
                self.inner.connectivity.report(true);
                Ok(bytes.to_vec())
            }
            Err(e) => {
                self.inner.connectivity.report(false);
                warn!(status = %status, error = %e, "Response body did not arrive");
                Err(GatewayError::from(e))
            }
        }
    }

    /// Build, send and classify. Returns the response only for 2xx; the
    /// caller reports success once the body is in.
    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        options: &RequestOptions,
    ) -> GatewayResult<Response> {
        let url = resolve_url(&self.inner.endpoint.base_url(), path, &options.params)?;
        let token = self.inner.store.token();
        let headers = compose_headers(
            token.as_ref().map(|t| t.expose_secret()),
            &body,
            &options.headers,
        )?;

        let builder = self
            .inner
            .http
            .request(method.clone(), url.clone())
            .headers(headers);
        let builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(multipart) => builder.multipart(multipart.into_form()?),
        };

        debug!(%method, path = url.path(), "Dispatching request");

        match builder.send().await {
            Ok(response) => self.check_status(response, options).await,
            Err(e) => {
                self.inner.connectivity.report(false);
                warn!(%method, path = url.path(), error = %e, "Request failed without a response");
                Err(GatewayError::from(e))
            }
        }
    }

    async fn check_status(
        &self,
        response: Response,
        options: &RequestOptions,
    ) -> GatewayResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        self.inner.connectivity.report(true);

        match status {
            StatusCode::UNAUTHORIZED if options.session_guard => {
                self.inner.guard.on_unauthorized();
                Err(GatewayError::unauthorized())
            }
            StatusCode::FORBIDDEN => {
                debug!("Request forbidden for current principal");
                Err(GatewayError::forbidden())
            }
            _ => {
                let body = read_error_body(response).await;
                let err = GatewayError::from_response(status.as_u16(), ErrorDetail::from_body(&body));
                debug!(status = %status, kind = %err.kind(), "Request failed");
                Err(err)
            }
        }
    }
}

/// Parse an error body; anything unreadable becomes `{}`.
async fn read_error_body(response: Response) -> Value {
    match response.text().await {
        Ok(text) => serde_json::from_str(&text).unwrap_or_else(|_| Value::Object(Default::default())),
        Err(_) => Value::Object(Default::default()),
    }
}

/// Background health polling; stops when dropped.
#[derive(Debug)]
pub struct HealthPoller {
    handle: JoinHandle<()>,
}

impl HealthPoller {
    /// Stop polling now.
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for HealthPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
