use crate::{prelude::*, ui::coupon_table::PAGE_SIZE_OPTIONS};

pub const DEFAULT_STORAGE_URL: &str =
  "https://firebasestorage.googleapis.com/v0";
pub const DEFAULT_STORAGE_FOLDER: &str = "designer-product-samples";

#[derive(Debug, Clone)]
pub struct Config {
  pub bot_token: String,
  pub admins: HashSet<i64>,
  pub api_base_url: String,
  pub api_token: Option<String>,
  pub http_timeout: Duration,
  pub storage_url: String,
  pub storage_bucket: String,
  pub storage_token: Option<String>,
  pub storage_folder: String,
  pub coupon_page_size: usize,
}

impl Config {
  pub fn from_env() -> Result<Self> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Builds the config from any key lookup, so tests don't touch the process
  /// environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let required = |key: &str| {
      lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::Config(format!("{key} not set")))
    };
    let optional =
      |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let admins = required("ADMIN_IDS")?
      .split(',')
      .filter(|s| !s.trim().is_empty())
      .map(|id| {
        id.trim()
          .parse::<i64>()
          .map_err(|_| Error::Config(format!("Invalid admin id `{}`", id.trim())))
      })
      .collect::<Result<HashSet<_>>>()?;

    let http_timeout = match optional("HTTP_TIMEOUT") {
      Some(raw) => humantime::parse_duration(&raw).map_err(|e| {
        Error::Config(format!("Invalid HTTP_TIMEOUT `{raw}`: {e}"))
      })?,
      None => Duration::from_secs(30),
    };

    let coupon_page_size = match optional("COUPON_PAGE_SIZE") {
      Some(raw) => raw
        .parse::<usize>()
        .ok()
        .filter(|size| PAGE_SIZE_OPTIONS.contains(size))
        .ok_or_else(|| {
          Error::Config(format!(
            "COUPON_PAGE_SIZE must be one of {PAGE_SIZE_OPTIONS:?}, got `{raw}`"
          ))
        })?,
      None => 10,
    };

    Ok(Self {
      bot_token: required("TELOXIDE_TOKEN")?,
      admins,
      api_base_url: required("API_BASE_URL")?.trim_end_matches('/').to_string(),
      api_token: optional("API_TOKEN"),
      http_timeout,
      storage_url: optional("STORAGE_URL")
        .unwrap_or_else(|| DEFAULT_STORAGE_URL.into())
        .trim_end_matches('/')
        .to_string(),
      storage_bucket: required("STORAGE_BUCKET")?,
      storage_token: optional("STORAGE_TOKEN"),
      storage_folder: optional("STORAGE_FOLDER")
        .unwrap_or_else(|| DEFAULT_STORAGE_FOLDER.into()),
      coupon_page_size,
    })
  }
}
