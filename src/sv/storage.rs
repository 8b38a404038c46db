//! Image store used for designer product samples.
//!
//! Files are pushed to Firebase Storage through its REST endpoint and
//! addressed afterwards by their public download URL.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::prelude::*;

/// Raw image picked by the operator.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageFile {
  pub name: String,
  pub content_type: String,
  pub bytes: Vec<u8>,
}

impl ImageFile {
  pub fn new(
    name: impl Into<String>,
    content_type: impl Into<String>,
    bytes: Vec<u8>,
  ) -> Self {
    Self { name: name.into(), content_type: content_type.into(), bytes }
  }
}

impl std::fmt::Debug for ImageFile {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ImageFile")
      .field("name", &self.name)
      .field("content_type", &self.content_type)
      .field("len", &self.bytes.len())
      .finish()
  }
}

#[async_trait]
pub trait ImageStore: Send + Sync {
  /// Store `file` under the logical `folder` and return its public URL.
  async fn upload(&self, file: &ImageFile, folder: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedObject {
  name: String,
  #[serde(default)]
  download_tokens: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StorageError {
  error: StorageErrorBody,
}

#[derive(Debug, Deserialize)]
struct StorageErrorBody {
  message: String,
}

#[derive(Clone)]
pub struct FirebaseStorage {
  client: Client,
  base_url: String,
  bucket: String,
  token: Option<String>,
}

impl FirebaseStorage {
  pub fn new(
    base_url: impl Into<String>,
    bucket: impl Into<String>,
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
      bucket: bucket.into(),
      token,
    })
  }

  fn objects_url(&self) -> Result<Url> {
    Url::parse(&format!("{}/b/{}/o", self.base_url, self.bucket))
      .map_err(|e| Error::Storage(format!("Invalid storage URL: {e}")))
  }

  /// Public URL of a stored object; the object name is a single
  /// percent-encoded path segment.
  fn download_url(&self, name: &str, token: Option<&str>) -> Result<Url> {
    let mut url = self.objects_url()?;
    url
      .path_segments_mut()
      .map_err(|_| Error::Storage("Storage URL cannot be a base".into()))?
      .push(name);

    {
      let mut query = url.query_pairs_mut();
      query.append_pair("alt", "media");
      if let Some(token) = token {
        query.append_pair("token", token);
      }
    }
    Ok(url)
  }
}

/// `<folder>/<uuid>-<file name>`, keeping only path-safe characters of the
/// original name.
pub fn object_name(folder: &str, file_name: &str) -> String {
  let safe: String = file_name
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || "._-".contains(c) { c } else { '_' })
    .collect();
  let safe = if safe.is_empty() { "image".to_string() } else { safe };

  format!("{}/{}-{}", folder.trim_matches('/'), uuid::Uuid::new_v4(), safe)
}

#[async_trait]
impl ImageStore for FirebaseStorage {
  async fn upload(&self, file: &ImageFile, folder: &str) -> Result<String> {
    let name = object_name(folder, &file.name);

    let mut request = self
      .client
      .post(self.objects_url()?)
      .query(&[("uploadType", "media"), ("name", name.as_str())])
      .header(reqwest::header::CONTENT_TYPE, file.content_type.as_str())
      .body(file.bytes.clone());

    if let Some(token) = &self.token {
      request =
        request.header(reqwest::header::AUTHORIZATION, format!("Firebase {token}"));
    }

    let response = request
      .send()
      .await
      .map_err(|e| Error::Storage(format!("Upload failed: {e}")))?;

    let status = response.status();
    let text = response
      .text()
      .await
      .map_err(|e| Error::Storage(format!("Upload failed: {e}")))?;

    if !status.is_success() {
      let message = json::from_str::<StorageError>(&text)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| format!("Upload failed with HTTP {}", status));
      return Err(Error::Storage(message));
    }

    let object: UploadedObject = json::from_str(&text).map_err(|e| {
      Error::Storage(format!("Failed to parse upload response: {e}"))
    })?;

    // several tokens may come back comma separated, any of them works
    let token = object
      .download_tokens
      .as_deref()
      .and_then(|tokens| tokens.split(',').next());

    let url = self.download_url(&object.name, token)?;
    debug!("Stored {} as {}", file.name, object.name);
    Ok(url.to_string())
  }
}
