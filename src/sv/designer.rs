use super::api::{ApiRequest, Transport, call, unwrap_data};
use crate::{
  entity::designer::{
    self, ApprovalPayload, Count, SampleImagesPayload, SampleIndexesPayload,
  },
  prelude::*,
};

pub struct Designer<'a> {
  api: &'a dyn Transport,
}

impl<'a> Designer<'a> {
  pub fn new(api: &'a dyn Transport) -> Self {
    Self { api }
  }

  pub async fn pending_count(&self) -> Result<u64> {
    self.count("/designer/pending-count").await
  }

  pub async fn approved_count(&self) -> Result<u64> {
    self.count("/designer/approved-count").await
  }

  pub async fn total_count(&self) -> Result<u64> {
    self.count("/designer/total-count").await
  }

  async fn count(&self, path: &str) -> Result<u64> {
    let count: Count = call(self.api, ApiRequest::get(path)).await?;
    Ok(count.count)
  }

  pub async fn all(&self) -> Result<Vec<designer::Model>> {
    let value =
      self.api.request(ApiRequest::get("/designer/designersDashboard")).await?;
    Ok(json::from_value(unwrap_data(value))?)
  }

  /// Designers offered for status filtering; same listing as [`Self::all`].
  pub async fn all_for_filter(&self) -> Result<Vec<designer::Model>> {
    self.all().await.inspect_err(|e| {
      error!("Designer filter API error: {}", e);
    })
  }

  pub async fn by_id(&self, designer_id: &str) -> Result<designer::Model> {
    let value = self
      .api
      .request(ApiRequest::get(format!("/designer/designers/{designer_id}")))
      .await?;
    Ok(json::from_value(unwrap_data(value))?)
  }

  pub async fn set_approval(
    &self,
    designer_id: &str,
    is_approved: bool,
  ) -> Result<json::Value> {
    let request = ApiRequest::patch(format!("/designer/{designer_id}/status"))
      .json(&ApprovalPayload { is_approved })?;
    self.api.request(request).await
  }

  pub async fn disable(&self, designer_id: &str) -> Result<json::Value> {
    self
      .api
      .request(ApiRequest::patch(format!("/designer/disable/{designer_id}")))
      .await
  }

  /// Register already stored image URLs as product samples of a designer.
  pub async fn upload_sample_images(
    &self,
    designer_id: &str,
    image_urls: Vec<String>,
  ) -> Result<json::Value> {
    let request = ApiRequest::post(format!(
      "/designer/{designer_id}/product-sample-images"
    ))
    .json(&SampleImagesPayload { image_urls })?;
    self.api.request(request).await
  }

  /// Remove product samples by their position in the designer's list.
  pub async fn delete_sample_images(
    &self,
    designer_id: &str,
    image_indexes: Vec<usize>,
  ) -> Result<json::Value> {
    let request = ApiRequest::delete(format!(
      "/designer/{designer_id}/product-sample-images"
    ))
    .json(&SampleIndexesPayload { image_indexes })?;
    self.api.request(request).await
  }
}

#[cfg(test)]
mod tests {
  use reqwest::Method;

  use super::*;
  use crate::sv::test_utils::FakeTransport;

  #[tokio::test]
  async fn test_counts() {
    let api = FakeTransport::new()
      .on(Method::GET, "/designer/pending-count", json::json!({"count": 4}))
      .on(Method::GET, "/designer/total-count", json::json!({"count": 9}));
    let sv = Designer::new(&api);

    assert_eq!(sv.pending_count().await.unwrap(), 4);
    assert_eq!(sv.total_count().await.unwrap(), 9);
  }

  #[tokio::test]
  async fn test_list_accepts_bare_and_wrapped() {
    let item = json::json!({"_id": "d1", "userId": {"displayName": "Asha"}});

    let api = FakeTransport::new().on(
      Method::GET,
      "/designer/designersDashboard",
      json::json!([item.clone()]),
    );
    assert_eq!(Designer::new(&api).all().await.unwrap()[0].id, "d1");

    let api = FakeTransport::new().on(
      Method::GET,
      "/designer/designersDashboard",
      json::json!({"data": [item]}),
    );
    assert_eq!(Designer::new(&api).all_for_filter().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_request_shapes() {
    let api = FakeTransport::new()
      .on(Method::PATCH, "/designer/d1/status", json::json!({"_id": "d1"}))
      .on(Method::PATCH, "/designer/disable/d1", json::Value::Null)
      .on(Method::POST, "/designer/d1/product-sample-images", json::Value::Null)
      .on(
        Method::DELETE,
        "/designer/d1/product-sample-images",
        json::Value::Null,
      );
    let sv = Designer::new(&api);

    sv.set_approval("d1", true).await.unwrap();
    sv.disable("d1").await.unwrap();
    sv.upload_sample_images("d1", vec!["u1".into()]).await.unwrap();
    sv.delete_sample_images("d1", vec![2]).await.unwrap();

    let calls = api.calls();
    assert_eq!(calls[0].body, Some(json::json!({"is_approved": true})));
    assert_eq!(calls[1].body, None);
    assert_eq!(calls[2].body, Some(json::json!({"imageUrls": ["u1"]})));
    assert_eq!(calls[3].body, Some(json::json!({"imageIndexes": [2]})));
  }

  #[tokio::test]
  async fn test_errors_propagate() {
    let api = FakeTransport::new().fail(
      Method::GET,
      "/designer/designers/missing",
      404,
      "Designer not found",
    );

    let err = Designer::new(&api).by_id("missing").await.unwrap_err();
    assert_eq!(err.user_message(), "Designer not found");
  }
}
