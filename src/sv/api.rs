//! Shared JSON request helper for the marketplace backend.
//!
//! Every data-access module goes through the [`Transport`] capability so the
//! UI components can be driven against a fake in tests. [`ApiClient`] is the
//! real implementation: it prefixes the base URL, attaches the bearer token,
//! applies the client timeout and turns non-success statuses into
//! [`Error::Api`] carrying the backend's own message.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};

use crate::prelude::*;

/// One backend call: method, path relative to the base URL, query pairs and
/// an optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method: Method,
  pub path: String,
  pub query: Vec<(String, String)>,
  pub body: Option<json::Value>,
}

impl ApiRequest {
  pub fn new(method: Method, path: impl Into<String>) -> Self {
    Self { method, path: path.into(), query: Vec::new(), body: None }
  }

  pub fn get(path: impl Into<String>) -> Self {
    Self::new(Method::GET, path)
  }

  pub fn post(path: impl Into<String>) -> Self {
    Self::new(Method::POST, path)
  }

  pub fn patch(path: impl Into<String>) -> Self {
    Self::new(Method::PATCH, path)
  }

  pub fn delete(path: impl Into<String>) -> Self {
    Self::new(Method::DELETE, path)
  }

  pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
    self.query.push((key.to_string(), value.into()));
    self
  }

  pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self> {
    self.body = Some(json::to_value(body)?);
    Ok(self)
  }
}

#[async_trait]
pub trait Transport: Send + Sync {
  /// Perform the request and return the parsed JSON response
  /// (`Value::Null` for an empty body).
  async fn request(&self, request: ApiRequest) -> Result<json::Value>;
}

/// Issue `request` and decode the response into `T`.
pub async fn call<T: DeserializeOwned>(
  api: &dyn Transport,
  request: ApiRequest,
) -> Result<T> {
  let value = api.request(request).await?;
  Ok(json::from_value(value)?)
}

/// Some endpoints wrap their payload as `{ data: ... }`, others return it
/// bare; accept both.
pub fn unwrap_data(value: json::Value) -> json::Value {
  match value {
    json::Value::Object(mut map) if map.contains_key("data") => {
      map.remove("data").unwrap_or(json::Value::Null)
    }
    other => other,
  }
}

/// Backend client over reqwest.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  base_url: String,
  token: Option<String>,
}

impl ApiClient {
  pub fn new(
    base_url: impl Into<String>,
    token: Option<String>,
    timeout: Duration,
  ) -> Result<Self> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

    Ok(Self {
      client,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      token,
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/{}", self.base_url, path.trim_start_matches('/'))
  }
}

#[async_trait]
impl Transport for ApiClient {
  async fn request(&self, request: ApiRequest) -> Result<json::Value> {
    let url = self.url(&request.path);
    debug!("{} {}", request.method, url);

    let mut builder = self.client.request(request.method.clone(), &url);

    if let Some(token) = &self.token {
      builder = builder.bearer_auth(token);
    }
    if !request.query.is_empty() {
      builder = builder.query(&request.query);
    }
    if let Some(body) = &request.body {
      builder = builder.json(body);
    }

    let response = builder.send().await.map_err(|e| {
      warn!("{} {} failed: {}", request.method, url, e);
      Error::Transport(format!("Request failed: {e}"))
    })?;

    let status = response.status();
    let text = response.text().await?;
    parse_response(status, &text)
  }
}

fn parse_response(status: StatusCode, text: &str) -> Result<json::Value> {
  let body = if text.trim().is_empty() {
    json::Value::Null
  } else {
    match json::from_str(text) {
      Ok(value) => value,
      Err(_) if !status.is_success() => json::Value::String(text.to_string()),
      Err(e) => return Err(e.into()),
    }
  };

  if status.is_success() {
    return Ok(body);
  }

  let message = match &body {
    json::Value::Object(map) => ["message", "error"]
      .iter()
      .find_map(|key| map.get(*key).and_then(|v| v.as_str()))
      .map(str::to_string),
    json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
    _ => None,
  }
  .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

  Err(Error::Api { status: status.as_u16(), message })
}
