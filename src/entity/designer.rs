use serde::{Deserialize, Deserializer, Serialize};

use super::nullable;

/// Designer account as returned by the dashboard endpoints.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
  #[serde(rename = "_id")]
  pub id: String,
  /// The owning user account; some endpoints return only its id, which
  /// leaves every profile field empty.
  #[serde(rename = "userId", default, deserialize_with = "profile")]
  pub user: Profile,
  #[serde(rename = "is_approved", default, deserialize_with = "nullable")]
  pub is_approved: bool,
  #[serde(default, deserialize_with = "nullable")]
  pub logo_url: Option<String>,
  #[serde(rename = "backGroundImage", default, deserialize_with = "nullable")]
  pub background_image: Option<String>,
  #[serde(default)]
  pub product_sample_images: Option<Vec<String>>,
  /// Older snapshots spell the sample list in snake case.
  #[serde(rename = "product_sample_images", default, skip_serializing)]
  pub legacy_sample_images: Option<Vec<String>>,
  #[serde(default)]
  pub short_description: json::Value,
  #[serde(default, deserialize_with = "nullable")]
  pub created_time: Option<String>,
}

impl Model {
  /// Product sample urls by position. The camelCase list wins when a
  /// snapshot carries both spellings.
  pub fn sample_images(&self) -> &[String] {
    self
      .product_sample_images
      .as_deref()
      .or(self.legacy_sample_images.as_deref())
      .unwrap_or_default()
  }
}

/// Contact details of the user behind a designer account. Every field is kept
/// as raw JSON because the backend is inconsistent about their shapes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
  #[serde(default)]
  pub display_name: json::Value,
  #[serde(default)]
  pub email: json::Value,
  #[serde(default)]
  pub phone_number: json::Value,
  #[serde(default)]
  pub address: json::Value,
  #[serde(default)]
  pub city: json::Value,
  #[serde(default)]
  pub state: json::Value,
  #[serde(default)]
  pub pincode: json::Value,
}

fn profile<'de, D>(deserializer: D) -> Result<Profile, D::Error>
where
  D: Deserializer<'de>,
{
  match json::Value::deserialize(deserializer)? {
    value @ json::Value::Object(_) => {
      json::from_value(value).map_err(serde::de::Error::custom)
    }
    _ => Ok(Profile::default()),
  }
}

/// Response of the `*-count` endpoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Count {
  #[serde(default)]
  pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct ApprovalPayload {
  pub is_approved: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleImagesPayload {
  pub image_urls: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleIndexesPayload {
  pub image_indexes: Vec<usize>,
}
