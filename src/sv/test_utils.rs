//! Shared test doubles for the backend and the image store

use std::{
  collections::VecDeque,
  sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  },
};

use async_trait::async_trait;
use reqwest::Method;

use super::{
  api::{ApiRequest, Transport},
  storage::{ImageFile, ImageStore},
};
use crate::{prelude::*, ui::designer_detail::DetailHost};

type Reply = std::result::Result<json::Value, (u16, String)>;

/// Scripted backend. Each route answers with its queued replies in order and
/// keeps repeating the last one; unknown routes answer 404.
#[derive(Default)]
pub struct FakeTransport {
  routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
  calls: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn on(self, method: Method, path: &str, value: json::Value) -> Self {
    self.push(method, path, Ok(value));
    self
  }

  pub fn fail(
    self,
    method: Method,
    path: &str,
    status: u16,
    message: &str,
  ) -> Self {
    self.push(method, path, Err((status, message.to_string())));
    self
  }

  fn push(&self, method: Method, path: &str, reply: Reply) {
    self
      .routes
      .lock()
      .unwrap()
      .entry((method, path.to_string()))
      .or_default()
      .push_back(reply);
  }

  pub fn calls(&self) -> Vec<ApiRequest> {
    self.calls.lock().unwrap().clone()
  }

  pub fn calls_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
    self
      .calls()
      .into_iter()
      .filter(|c| c.method == method && c.path == path)
      .collect()
  }
}

#[async_trait]
impl Transport for FakeTransport {
  async fn request(&self, request: ApiRequest) -> Result<json::Value> {
    self.calls.lock().unwrap().push(request.clone());

    let key = (request.method.clone(), request.path.clone());
    let reply = {
      let mut routes = self.routes.lock().unwrap();
      match routes.get_mut(&key) {
        Some(queue) if queue.len() > 1 => queue.pop_front(),
        Some(queue) => queue.front().cloned(),
        None => None,
      }
    };

    match reply {
      Some(Ok(value)) => Ok(value),
      Some(Err((status, message))) => Err(Error::Api { status, message }),
      None => Err(Error::Api { status: 404, message: "Not found".into() }),
    }
  }
}

/// Image store that hands out predictable URLs and can be told to fail on a
/// given attempt.
#[derive(Default)]
pub struct FakeImageStore {
  fail_on: Option<usize>,
  attempts: Mutex<Vec<String>>,
}

impl FakeImageStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Fail the `n`-th upload attempt (0-based).
  pub fn failing_on(n: usize) -> Self {
    Self { fail_on: Some(n), ..Self::default() }
  }

  pub fn attempts(&self) -> Vec<String> {
    self.attempts.lock().unwrap().clone()
  }
}

#[async_trait]
impl ImageStore for FakeImageStore {
  async fn upload(&self, file: &ImageFile, folder: &str) -> Result<String> {
    let attempt = {
      let mut attempts = self.attempts.lock().unwrap();
      attempts.push(file.name.clone());
      attempts.len() - 1
    };

    if self.fail_on == Some(attempt) {
      return Err(Error::Storage(format!("Quota exceeded for {}", file.name)));
    }
    Ok(format!("https://cdn.test/{folder}/{}", file.name))
  }
}

/// Counts the notifications a component sends to its parent.
#[derive(Default)]
pub struct RecordingHost {
  pub changed: AtomicUsize,
  pub reloads: AtomicUsize,
}

impl RecordingHost {
  pub fn changed(&self) -> usize {
    self.changed.load(Ordering::SeqCst)
  }

  pub fn reloads(&self) -> usize {
    self.reloads.load(Ordering::SeqCst)
  }
}

impl DetailHost for RecordingHost {
  fn images_changed(&self) {
    self.changed.fetch_add(1, Ordering::SeqCst);
  }

  fn reload(&self) {
    self.reloads.fetch_add(1, Ordering::SeqCst);
  }
}

pub fn image(name: &str) -> ImageFile {
  ImageFile::new(name, "image/png", vec![0x89, b'P', b'N', b'G'])
}
