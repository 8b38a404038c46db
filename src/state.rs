use teloxide::Bot;
use tokio::sync::Mutex;

use crate::{
  config::Config,
  prelude::*,
  sv::{self, ApiClient, FirebaseStorage, ImageStore, Transport},
  ui::{CouponTable, DesignerDetail},
};

/// Dashboard state of one operator chat.
#[derive(Debug)]
pub struct Session {
  pub detail: DesignerDetail,
  pub coupons: CouponTable,
}

impl Session {
  pub fn new(page_size: usize) -> Self {
    Self { detail: DesignerDetail::new(), coupons: CouponTable::new(page_size) }
  }
}

pub struct Services<'a> {
  pub designer: sv::Designer<'a>,
  pub coupon: sv::Coupon<'a>,
}

pub struct AppState {
  pub bot: Bot,
  pub admins: HashSet<i64>,
  pub config: Config,
  pub api: Arc<dyn Transport>,
  pub storage: Arc<dyn ImageStore>,
  pub sessions: DashMap<i64, Arc<Mutex<Session>>>,
}

impl AppState {
  pub fn new(config: Config) -> Result<Self> {
    let api = ApiClient::new(
      config.api_base_url.clone(),
      config.api_token.clone(),
      config.http_timeout,
    )?;
    let storage = FirebaseStorage::new(
      config.storage_url.clone(),
      config.storage_bucket.clone(),
      config.storage_token.clone(),
      config.http_timeout,
    )?;
    let bot = Bot::new(&config.bot_token);

    Ok(Self::with_backends(bot, config, Arc::new(api), Arc::new(storage)))
  }

  pub fn with_backends(
    bot: Bot,
    config: Config,
    api: Arc<dyn Transport>,
    storage: Arc<dyn ImageStore>,
  ) -> Self {
    Self {
      bot,
      admins: config.admins.clone(),
      config,
      api,
      storage,
      sessions: DashMap::new(),
    }
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      designer: sv::Designer::new(self.api.as_ref()),
      coupon: sv::Coupon::new(self.api.as_ref()),
    }
  }

  /// Session of `chat_id`, created on first use. The map guard is dropped
  /// before returning, so the session can be locked across awaits.
  pub fn session(&self, chat_id: i64) -> Arc<Mutex<Session>> {
    self
      .sessions
      .entry(chat_id)
      .or_insert_with(|| {
        debug!("New dashboard session for {}", chat_id);
        Arc::new(Mutex::new(Session::new(self.config.coupon_page_size)))
      })
      .clone()
  }
}
