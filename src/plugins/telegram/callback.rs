use std::sync::Arc;

use teloxide::{
  prelude::*,
  types::{InlineKeyboardButton, InlineKeyboardMarkup},
};

use super::{ReplyBot, dashboard};
use crate::{
  entity::coupon::UserOption,
  prelude::*,
  state::AppState,
  ui::{
    Notice,
    coupon_table::{PAGE_SIZE_OPTIONS, TablePage},
    designer_detail::DesignerCard,
  },
};

/// Callback data enum - provides type-safe callback handling
#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
  Upload,
  Close,
  DeleteImage(usize),
  CouponPage(usize),
  PageSize(usize),
  DeleteCoupon(String),
  PickUser(String),
  Noop,
}

impl Callback {
  pub fn to_data(&self) -> String {
    match self {
      Callback::Upload => "upload".to_string(),
      Callback::Close => "close".to_string(),
      Callback::DeleteImage(position) => format!("delimg:{}", position),
      Callback::CouponPage(page) => format!("page:{}", page),
      Callback::PageSize(size) => format!("size:{}", size),
      Callback::DeleteCoupon(id) => format!("delc:{}", id),
      Callback::PickUser(id) => format!("user:{}", id),
      Callback::Noop => "noop".to_string(),
    }
  }

  pub fn from_data(data: &str) -> Option<Self> {
    match data {
      "upload" => Some(Callback::Upload),
      "close" => Some(Callback::Close),
      "noop" => Some(Callback::Noop),
      _ => {
        let (kind, arg) = data.split_once(':')?;
        match kind {
          "delimg" => arg.parse().ok().map(Callback::DeleteImage),
          "page" => arg.parse().ok().map(Callback::CouponPage),
          "size" => arg.parse().ok().map(Callback::PageSize),
          "delc" if !arg.is_empty() => {
            Some(Callback::DeleteCoupon(arg.to_string()))
          }
          "user" if !arg.is_empty() => Some(Callback::PickUser(arg.to_string())),
          _ => None,
        }
      }
    }
  }
}

fn button(text: impl Into<String>, callback: Callback) -> InlineKeyboardButton {
  InlineKeyboardButton::callback(text, callback.to_data())
}

pub fn card_keyboard(card: &DesignerCard) -> InlineKeyboardMarkup {
  let mut rows: Vec<Vec<InlineKeyboardButton>> = card
    .samples
    .chunks(4)
    .map(|chunk| {
      chunk
        .iter()
        .map(|sample| {
          let icon = if sample.deleting { "⏳" } else { "🗑" };
          button(
            format!("{} #{}", icon, sample.position + 1),
            Callback::DeleteImage(sample.position),
          )
        })
        .collect()
    })
    .collect();

  if card.uploading {
    rows.push(vec![button("⏳ Uploading...", Callback::Noop)]);
  } else if let Some(label) = &card.upload_label {
    rows.push(vec![button(format!("⬆️ {}", label), Callback::Upload)]);
  }
  rows.push(vec![button("✖️ Close", Callback::Close)]);

  InlineKeyboardMarkup::new(rows)
}

pub fn table_keyboard(page: &TablePage) -> InlineKeyboardMarkup {
  let mut rows: Vec<Vec<InlineKeyboardButton>> = page
    .rows
    .chunks(2)
    .map(|chunk| {
      chunk
        .iter()
        .map(|row| {
          button(
            format!("🗑 {}", row.code),
            Callback::DeleteCoupon(row.id.clone()),
          )
        })
        .collect()
    })
    .collect();

  let mut nav = Vec::new();
  if page.page > 1 {
    nav.push(button("«", Callback::CouponPage(page.page - 1)));
  }
  nav.push(button(
    format!("{}/{}", page.page, page.page_count),
    Callback::Noop,
  ));
  if page.page < page.page_count {
    nav.push(button("»", Callback::CouponPage(page.page + 1)));
  }
  rows.push(nav);

  rows.push(
    PAGE_SIZE_OPTIONS
      .iter()
      .map(|&size| {
        let label = if size == page.page_size {
          format!("• {} •", size)
        } else {
          size.to_string()
        };
        button(label, Callback::PageSize(size))
      })
      .collect(),
  );

  InlineKeyboardMarkup::new(rows)
}

pub fn users_keyboard(options: &[UserOption]) -> InlineKeyboardMarkup {
  InlineKeyboardMarkup::new(
    options
      .iter()
      .map(|user| {
        vec![button(
          format!("👤 {}", user.label()),
          Callback::PickUser(user.id.clone()),
        )]
      })
      .collect::<Vec<_>>(),
  )
}

pub async fn handle(
  app: Arc<AppState>,
  bot: ReplyBot,
  data: &str,
) -> ResponseResult<()> {
  if !app.admins.contains(&bot.user_id) {
    return Ok(());
  }

  let Some(callback) = Callback::from_data(data) else {
    debug!("Unknown callback data: {}", data);
    return Ok(());
  };

  match callback {
    Callback::Upload => dashboard::upload(app, bot).await,
    Callback::DeleteImage(position) => {
      dashboard::delete_image(app, bot, position).await
    }
    Callback::Close => dashboard::close_card(&app, &bot, true).await,
    Callback::CouponPage(page) => {
      let session = app.session(bot.chat_id.0);
      session.lock().await.coupons.goto_page(page);
      dashboard::show_coupons(&app, &bot, true).await
    }
    Callback::PageSize(size) => {
      let session = app.session(bot.chat_id.0);
      let result = session.lock().await.coupons.set_page_size(size);
      if let Err(err) = result {
        return bot.notify(&Notice::from_error(&err, "")).await;
      }
      dashboard::show_coupons(&app, &bot, true).await
    }
    Callback::DeleteCoupon(id) => dashboard::delete_coupon(&app, &bot, &id).await,
    Callback::PickUser(id) => {
      let session = app.session(bot.chat_id.0);
      let picked = session
        .lock()
        .await
        .coupons
        .open_user_form()
        .picker
        .select(&id)
        .map(|user| user.label());

      let text = match picked {
        Ok(label) => format!(
          "👤 Coupon target: <b>{}</b>\n\
          Now send /usercoupon &lt;code&gt; &lt;amount&gt; &lt;YYYY-MM-DD&gt;",
          dashboard::escape(&label)
        ),
        Err(err) => dashboard::notice_html(&Notice::from_error(&err, "")),
      };
      bot.reply_html(text).await?;
      Ok(())
    }
    Callback::Noop => Ok(()),
  }
}
