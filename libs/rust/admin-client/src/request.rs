//! Request descriptors.
//!
//! A [`RequestDescriptor`] captures one logical call. Callers build it once;
//! the pipeline only adds headers and, when a refreshed credential is
//! attached, sets the internal retried marker.

use crate::error::{ClientError, ClientResult};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::config::resolve_url;
use crate::transport::PreparedRequest;

/// MIME type attached to serialized structured bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Structured body, serialized as JSON
    Json(Value),
    /// Pre-encoded body (form data, binary upload) sent as-is
    Encoded {
        /// Content type of the encoded bytes
        content_type: String,
        /// Encoded payload
        bytes: Vec<u8>,
    },
}

/// Per-call notification options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Do not display failures of this call to the user
    pub suppress_error_notification: bool,
    /// Display the server's success message
    pub show_success_notification: bool,
}

/// One logical API call.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    url: String,
    params: Option<Value>,
    body: Option<Body>,
    headers: HeaderMap,
    options: RequestOptions,
    retried: bool,
}

impl RequestDescriptor {
    /// Create a descriptor for `method` and `url` (relative or absolute).
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: None,
            body: None,
            headers: HeaderMap::new(),
            options: RequestOptions::default(),
            retried: false,
        }
    }

    /// GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// POST request.
    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// PUT request.
    #[must_use]
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    /// DELETE request.
    #[must_use]
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Set query-style parameters.
    ///
    /// For POST and PUT without a body these become the JSON body.
    ///
    /// # Errors
    ///
    /// Returns a request configuration error if `params` cannot be serialized.
    pub fn with_params<T: Serialize + ?Sized>(mut self, params: &T) -> ClientResult<Self> {
        self.params = Some(serde_json::to_value(params).map_err(ClientError::request_config)?);
        Ok(self)
    }

    /// Set a structured JSON body.
    ///
    /// # Errors
    ///
    /// Returns a request configuration error if `body` cannot be serialized.
    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> ClientResult<Self> {
        self.body = Some(Body::Json(
            serde_json::to_value(body).map_err(ClientError::request_config)?,
        ));
        Ok(self)
    }

    /// Set a pre-encoded body.
    #[must_use]
    pub fn with_encoded_body(mut self, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.body = Some(Body::Encoded {
            content_type: content_type.into(),
            bytes,
        });
        self
    }

    /// Add an outgoing header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Do not display failures of this call.
    #[must_use]
    pub const fn suppress_error_notification(mut self) -> Self {
        self.options.suppress_error_notification = true;
        self
    }

    /// Display the server's success message.
    #[must_use]
    pub const fn show_success_notification(mut self) -> Self {
        self.options.show_success_notification = true;
        self
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// URL as given by the caller.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Query-style parameters.
    #[must_use]
    pub const fn params(&self) -> Option<&Value> {
        self.params.as_ref()
    }

    /// Body payload.
    #[must_use]
    pub const fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Outgoing headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Notification options.
    #[must_use]
    pub const fn options(&self) -> RequestOptions {
        self.options
    }

    /// Whether a refreshed credential was already attached to this call.
    #[must_use]
    pub const fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) const fn mark_retried(&mut self) {
        self.retried = true;
    }

    pub(crate) fn has_authorization(&self) -> bool {
        self.headers.contains_key(AUTHORIZATION)
    }

    pub(crate) fn set_authorization(&mut self, token: &str) -> ClientResult<()> {
        let value = HeaderValue::from_str(token).map_err(ClientError::request_config)?;
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    /// Move parameters into the body for methods that carry one.
    pub(crate) fn move_params_to_body(&mut self) {
        let carries_body = self.method == Method::POST || self.method == Method::PUT;
        if carries_body && self.body.is_none() {
            if let Some(params) = self.params.take() {
                self.body = Some(Body::Json(params));
            }
        }
    }

    /// Set the content type implied by the body unless one was given.
    pub(crate) fn ensure_content_type(&mut self) -> ClientResult<()> {
        if self.headers.contains_key(CONTENT_TYPE) {
            return Ok(());
        }
        let content_type = match &self.body {
            Some(Body::Json(_)) => HeaderValue::from_static(JSON_CONTENT_TYPE),
            Some(Body::Encoded { content_type, .. }) => {
                HeaderValue::from_str(content_type).map_err(ClientError::request_config)?
            }
            None => return Ok(()),
        };
        self.headers.insert(CONTENT_TYPE, content_type);
        Ok(())
    }

    /// Resolve against `base` and encode the body.
    pub(crate) fn prepare(&self, base: &Url) -> ClientResult<PreparedRequest> {
        let mut url = resolve_url(base, &self.url).map_err(ClientError::request_config)?;
        if let Some(params) = &self.params {
            append_query(&mut url, params)?;
        }

        let body = match &self.body {
            Some(Body::Json(value)) => {
                Some(serde_json::to_vec(value).map_err(ClientError::request_config)?)
            }
            Some(Body::Encoded { bytes, .. }) => Some(bytes.clone()),
            None => None,
        };

        Ok(PreparedRequest {
            method: self.method.clone(),
            url,
            headers: self.headers.clone(),
            body,
        })
    }
}

/// Append object parameters to the query string.
fn append_query(url: &mut Url, params: &Value) -> ClientResult<()> {
    let Value::Object(map) = params else {
        return Err(ClientError::request_config(
            "query parameters must be an object",
        ));
    };

    let mut pairs = url.query_pairs_mut();
    for (key, value) in map {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    pairs.append_pair(key, &query_value(item));
                }
            }
            other => {
                pairs.append_pair(key, &query_value(other));
            }
        }
    }
    drop(pairs);

    if url.query() == Some("") {
        url.set_query(None);
    }
    Ok(())
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
