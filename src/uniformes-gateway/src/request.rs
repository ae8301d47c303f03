//! Request descriptors and response values.
//!
//! A request is built per call and never stored. Its body decides the
//! transport path: JSON bodies are serialized with an explicit
//! `application/json` content type, multipart bodies are handed to the HTTP
//! stack which writes its own boundary-bearing content type. For multipart
//! sends any caller-supplied `Content-Type` is dropped.

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use tracing::debug;
use url::Url;

use crate::constants::API_PREFIX;
use crate::error::{GatewayError, GatewayResult};

const DEFAULT_MIME: &str = "application/octet-stream";

/// A file to send in a multipart body.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
            mime_type: None,
        }
    }

    pub fn with_mime(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Read a file from disk; the file name is taken from the path.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, bytes))
    }

    fn into_part(self) -> GatewayResult<Part> {
        let mime = self.mime_type.as_deref().unwrap_or(DEFAULT_MIME);
        Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(mime)
            .map_err(|e| GatewayError::invalid_request(format!("Invalid MIME type '{mime}': {e}")))
    }
}

/// Multipart body: binary parts plus plain text fields.
#[derive(Debug, Clone, Default)]
pub struct MultipartBody {
    files: Vec<(String, UploadFile)>,
    fields: Vec<(String, String)>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, field_name: impl Into<String>, file: UploadFile) -> Self {
        self.files.push((field_name.into(), file));
        self
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub(crate) fn into_form(self) -> GatewayResult<Form> {
        let mut form = Form::new();
        for (name, value) in self.fields {
            form = form.text(name, value);
        }
        for (name, file) in self.files {
            form = form.part(name, file.into_part()?);
        }
        Ok(form)
    }
}

/// Request body, by transport path.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(MultipartBody),
}

impl RequestBody {
    /// Serialize `value` into a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> GatewayResult<Self> {
        serde_json::to_value(value)
            .map(RequestBody::Json)
            .map_err(|e| GatewayError::invalid_request(format!("Failed to serialize body: {e}")))
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, RequestBody::Multipart(_))
    }
}

/// Per-call options.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Query parameters; entries without a value are skipped.
    pub params: Vec<(String, Option<String>)>,
    /// Header overrides.
    pub headers: Vec<(String, String)>,
    /// Whether a 401 triggers the session guard.
    pub session_guard: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            params: Vec::new(),
            headers: Vec::new(),
            session_guard: true,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), Some(value.to_string())));
        self
    }

    pub fn param_opt<V: ToString>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        self.params
            .push((name.into(), value.map(|v| v.to_string())));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Handle a 401 locally instead of dropping the session.
    pub fn without_session_guard(mut self) -> Self {
        self.session_guard = false;
        self
    }
}

/// Successful response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// Parsed body: `null` when empty, a JSON string when not JSON.
    pub data: Value,
    pub status: u16,
}

impl ApiResponse {
    pub(crate) fn from_body(status: u16, body: &[u8]) -> Self {
        let data = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(body)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
        };
        Self { data, status }
    }

    pub(crate) fn empty(status: u16) -> Self {
        Self {
            data: Value::Null,
            status,
        }
    }

    /// Deserialize the body.
    pub fn json<T: DeserializeOwned>(&self) -> GatewayResult<T> {
        T::deserialize(&self.data).map_err(|e| {
            debug!(error = %e, "Response body did not match the expected shape");
            GatewayError::invalid_response(self.status, "Respuesta inválida del servidor.")
        })
    }
}

/// `<base><API_PREFIX><path>?<params>`, skipping params without a value.
pub fn resolve_url(
    base_url: &str,
    path: &str,
    params: &[(String, Option<String>)],
) -> GatewayResult<Url> {
    let base = base_url.trim_end_matches('/');
    let path = path.trim();
    let raw = if path.starts_with('/') {
        format!("{base}{API_PREFIX}{path}")
    } else {
        format!("{base}{API_PREFIX}/{path}")
    };

    let mut url = Url::parse(&raw)
        .map_err(|e| GatewayError::invalid_request(format!("Invalid request URL '{raw}': {e}")))?;

    let present: Vec<(&str, &str)> = params
        .iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name.as_str(), v)))
        .collect();
    if !present.is_empty() {
        url.query_pairs_mut().extend_pairs(present);
    }

    Ok(url)
}

/// Headers for one call: caller overrides, then the body's content type,
/// then the bearer token when one is held.
pub(crate) fn compose_headers(
    token: Option<&str>,
    body: &RequestBody,
    overrides: &[(String, String)],
) -> GatewayResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    for (name, value) in overrides {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| GatewayError::invalid_request(format!("Invalid header name '{name}': {e}")))?;
        if name == CONTENT_TYPE && body.is_multipart() {
            debug!("Dropping caller Content-Type for multipart body");
            continue;
        }
        let value = HeaderValue::from_str(value).map_err(|e| {
            GatewayError::invalid_request(format!("Invalid value for header '{name}': {e}"))
        })?;
        headers.insert(name, value);
    }

    if let RequestBody::Json(_) = body {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    match token.filter(|t| !t.is_empty()) {
        Some(token) => {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| GatewayError::invalid_request("Stored token is not a valid header value"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        None => {
            headers.remove(AUTHORIZATION);
        }
    }

    Ok(headers)
}
