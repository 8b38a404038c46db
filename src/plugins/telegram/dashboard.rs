//! Flows shared by commands and buttons, and the HTML the chat shows for
//! each component.

use std::sync::atomic::{AtomicBool, Ordering};

use teloxide::prelude::*;
use tokio::sync::Mutex;

use super::{ReplyBot, callback};
use crate::{
  entity::{CouponKind, coupon::UserOption, designer},
  prelude::*,
  state::{AppState, Session},
  ui::{
    Notice,
    coupon_table::{
      ActiveFilter, Column, CouponTable, Direction, LoadPhase, TablePage,
    },
    designer_detail::{
      DesignerCard, DetailHost, DetailView, MAX_STAGED, PLACEHOLDER,
      UploadPhase, field_value,
    },
  },
  utils,
};

pub fn escape(text: &str) -> String {
  teloxide::utils::html::escape(text)
}

/// A notice as text safe to send with the HTML parse mode.
pub fn notice_html(notice: &Notice) -> String {
  escape(&notice.to_string())
}

/// Remembers whether the card asked for a fresh designer snapshot.
#[derive(Default)]
struct ChatHost {
  stale: AtomicBool,
}

impl ChatHost {
  fn is_stale(&self) -> bool {
    self.stale.load(Ordering::SeqCst)
  }
}

impl DetailHost for ChatHost {
  fn images_changed(&self) {
    self.stale.store(true, Ordering::SeqCst);
  }

  fn reload(&self) {
    self.stale.store(true, Ordering::SeqCst);
  }
}

async fn refetch(app: &AppState, session: &Mutex<Session>, designer_id: &str) {
  match app.sv().designer.by_id(designer_id).await {
    Ok(designer) => session.lock().await.detail.refresh(designer),
    Err(err) => warn!("Failed to refresh designer {}: {}", designer_id, err),
  }
}

pub async fn show_card(
  bot: &ReplyBot,
  view: Option<DetailView>,
) -> ResponseResult<()> {
  match view {
    None => {
      bot.notify(&Notice::info(Error::CardClosed.user_message())).await
    }
    Some(DetailView::Loading) => bot.reply_html("⏳ Loading designer...").await,
    Some(DetailView::Card(card)) => {
      let keyboard = callback::card_keyboard(&card);
      bot.reply_html_chunked(designer_card(&card), Some(keyboard)).await
    }
  }
}

/// Open the card of `designer_id`. The session stays locked until the
/// designer arrives, so nothing else can touch a half-open card.
pub async fn open_designer(
  app: &AppState,
  bot: &ReplyBot,
  designer_id: &str,
) -> ResponseResult<()> {
  let session = app.session(bot.chat_id.0);
  let mut session = session.lock().await;

  session.detail.open_loading();
  show_card(bot, session.detail.view()).await?;

  match app.sv().designer.by_id(designer_id).await {
    Ok(designer) => session.detail.open(designer),
    Err(err) => {
      session.detail.fail_loading();
      error!("Error fetching designer {}: {}", designer_id, err);
      let notice = Notice::from_error(&err, "Failed to load designer");
      return bot.notify(&notice).await;
    }
  }

  show_card(bot, session.detail.view()).await
}

/// Close the card. Requests already sent keep running; their results are
/// dropped.
pub async fn close_card(
  app: &AppState,
  bot: &ReplyBot,
  edit: bool,
) -> ResponseResult<()> {
  let notice = {
    let session = app.session(bot.chat_id.0);
    let mut session = session.lock().await;
    let busy = session.detail.phase() == UploadPhase::Uploading
      || !session.detail.deleting().is_empty();
    session.detail.close();

    if busy {
      Notice::info("Designer card closed, requests already sent still finish")
    } else {
      Notice::info("Designer card closed")
    }
  };

  if edit {
    bot.edit_html(notice_html(&notice)).await
  } else {
    bot.notify(&notice).await
  }
}

/// Hide both coupon dialogs; what was typed stays for next time.
pub async fn cancel_forms(
  app: &AppState,
  bot: &ReplyBot,
) -> ResponseResult<()> {
  {
    let session = app.session(bot.chat_id.0);
    let mut session = session.lock().await;
    session.coupons.cancel_promotion_form();
    session.coupons.cancel_user_form();
  }
  bot.notify(&Notice::info("Coupon forms closed")).await
}

/// Refresh the open card after the designer changed elsewhere.
pub async fn refresh_card(
  app: &AppState,
  bot: &ReplyBot,
  designer_id: &str,
) -> ResponseResult<()> {
  let session = app.session(bot.chat_id.0);
  let is_shown = session
    .lock()
    .await
    .detail
    .designer()
    .is_some_and(|designer| designer.id == designer_id);

  if is_shown {
    refetch(app, &session, designer_id).await;
    let view = session.lock().await.detail.view();
    show_card(bot, view).await?;
  }
  Ok(())
}

/// Start uploading the staged files. The upload itself runs in the
/// background so the chat stays usable meanwhile.
pub async fn upload(app: Arc<AppState>, bot: ReplyBot) -> ResponseResult<()> {
  let session = app.session(bot.chat_id.0);
  let begun =
    session.lock().await.detail.begin_upload(&app.config.storage_folder);
  let batch = match begun {
    Ok(batch) => batch,
    Err(err) => return bot.notify(&Notice::from_error(&err, "")).await,
  };

  bot
    .reply_html(format!(
      "⏳ Uploading {}...",
      utils::plural(batch.files.len(), "image")
    ))
    .await?;

  tokio::spawn(async move {
    let sv = app.sv();
    let result = batch.run(app.storage.as_ref(), &sv.designer).await;
    let designer_id = batch.designer_id.clone();

    let host = ChatHost::default();
    let notice = session.lock().await.detail.finish_upload(batch, result, &host);
    if host.is_stale() {
      refetch(&app, &session, &designer_id).await;
    }

    let view = session.lock().await.detail.view();
    let shown = async {
      bot.notify(&notice).await?;
      if view.is_some() {
        show_card(&bot, view).await?;
      }
      Ok::<_, teloxide::RequestError>(())
    };
    if let Err(err) = shown.await {
      error!("Failed to report upload result: {}", err);
    }
  });

  Ok(())
}

/// Remove one product sample. Several removals may be in flight at once.
pub async fn delete_image(
  app: Arc<AppState>,
  bot: ReplyBot,
  position: usize,
) -> ResponseResult<()> {
  let session = app.session(bot.chat_id.0);
  let begun = session.lock().await.detail.begin_delete(position);
  let pending = match begun {
    Ok(pending) => pending,
    Err(err) => return bot.notify(&Notice::from_error(&err, "")).await,
  };

  bot.reply_html(format!("⏳ Removing image #{}...", position + 1)).await?;

  tokio::spawn(async move {
    let sv = app.sv();
    let result = pending.run(&sv.designer).await;
    let designer_id = pending.designer_id.clone();

    let host = ChatHost::default();
    let notice =
      session.lock().await.detail.finish_delete(pending, result, &host);
    if host.is_stale() {
      refetch(&app, &session, &designer_id).await;
    }

    let view = session.lock().await.detail.view();
    let shown = async {
      bot.notify(&notice).await?;
      if view.is_some() {
        show_card(&bot, view).await?;
      }
      Ok::<_, teloxide::RequestError>(())
    };
    if let Err(err) = shown.await {
      error!("Failed to report image removal: {}", err);
    }
  });

  Ok(())
}

/// Show the current coupon page, loading the list on first use. `edit`
/// rewrites the message the button belongs to.
pub async fn show_coupons(
  app: &AppState,
  bot: &ReplyBot,
  edit: bool,
) -> ResponseResult<()> {
  let session = app.session(bot.chat_id.0);
  let mut session = session.lock().await;

  if let Some(notice) = session.coupons.ensure_loaded(&app.sv().coupon).await {
    bot.notify(&notice).await?;
  }

  let page = session.coupons.page();
  let text = coupon_page(&session.coupons, &page);
  let keyboard = callback::table_keyboard(&page);

  if edit && text.len() <= utils::MESSAGE_LIMIT {
    bot.edit_with_keyboard(text, keyboard).await
  } else {
    bot.reply_html_chunked(text, Some(keyboard)).await
  }
}

pub async fn delete_coupon(
  app: &AppState,
  bot: &ReplyBot,
  coupon_id: &str,
) -> ResponseResult<()> {
  let notice = {
    let session = app.session(bot.chat_id.0);
    let mut session = session.lock().await;
    session.coupons.delete(&app.sv().coupon, coupon_id).await
  };
  bot.notify(&notice).await?;

  if !notice.is_error() {
    show_coupons(app, bot, false).await?;
  }
  Ok(())
}

fn link(url: Option<&str>) -> String {
  match url {
    Some(url) => format!("<a href=\"{}\">open</a>", escape(url)),
    None => PLACEHOLDER.to_string(),
  }
}

pub fn designer_card(card: &DesignerCard) -> String {
  let status = if card.approved { "✅" } else { "⏳" };
  let mut text = format!(
    "🎨 <b>{}</b>\n\
    {} {} · <code>{}</code>\n\n\
    <b>Contact</b>\n\
    Email: {}\n\
    Phone: {}\n\
    Joined: {}\n\n\
    <b>Address</b>\n\
    {}\n\
    City: {}\n\
    State: {}\n\
    Pincode: {}\n\n\
    <b>About</b>\n\
    {}\n\n\
    Logo: {}\n\
    Cover: {}\n\n",
    escape(&card.title),
    status,
    card.status,
    escape(&card.id),
    escape(&card.email),
    escape(&card.phone),
    card.joined,
    escape(&card.address),
    escape(&card.city),
    escape(&card.state),
    escape(&card.pincode),
    escape(&card.about),
    link(card.logo.as_deref()),
    link(card.cover.as_deref()),
  );

  text.push_str(&format!(
    "🖼 <b>Product samples ({})</b>\n",
    card.samples.len()
  ));
  if card.samples.is_empty() {
    text.push_str("<i>No product samples</i>\n");
  }
  for sample in &card.samples {
    text.push_str(&format!(
      "{}. <a href=\"{}\">image</a>{}\n",
      sample.position + 1,
      escape(&sample.url),
      if sample.deleting { " ⏳ removing" } else { "" }
    ));
  }

  text.push_str(&format!(
    "\n📎 <b>Staged ({}/{})</b>\n",
    card.staged.len(),
    MAX_STAGED
  ));
  for (i, name) in card.staged.iter().enumerate() {
    text.push_str(&format!("{}. {}\n", i + 1, escape(name)));
  }
  if card.uploading {
    text.push_str("<i>Uploading...</i>");
  } else if card.can_stage_more {
    text.push_str("<i>Send photos to stage them for upload.</i>");
  } else {
    text.push_str("<i>Staging limit reached.</i>");
  }

  text
}

fn kind_tag(kind: CouponKind) -> String {
  let dot = match kind {
    CouponKind::Promotion => "🟢",
    CouponKind::UserSpecific => "🔵",
  };
  format!("{} {}", dot, kind.title())
}

pub fn coupon_page(table: &CouponTable, page: &TablePage) -> String {
  let mut text = String::from("🎟 <b>Coupons</b>\n");

  let (_, term) = table.search();
  if !term.trim().is_empty() {
    let placeholder = table.placeholder();
    text.push_str(&format!("{}: <i>{}</i>\n", placeholder, escape(term)));
  }
  if let Some((column, direction)) = table.sort() {
    let column = match column {
      Column::Code => "code",
      Column::Amount => "amount",
      Column::Type => "type",
      Column::Active => "active",
      Column::Expiry => "expiry",
    };
    let arrow = match direction {
      Direction::Asc => "↑",
      Direction::Desc => "↓",
    };
    text.push_str(&format!("Sorted by {} {}\n", column, arrow));
  }
  match table.filter() {
    ActiveFilter::All => {}
    ActiveFilter::Active => text.push_str("Showing active only\n"),
    ActiveFilter::Inactive => text.push_str("Showing inactive only\n"),
  }
  text.push('\n');

  if page.rows.is_empty() {
    text.push_str("<i>No coupons</i>\n");
  }
  let first = (page.page - 1) * page.page_size;
  for (i, row) in page.rows.iter().enumerate() {
    text.push_str(&format!(
      "{}. <code>{}</code> · {} · {} · {} · {}\n",
      first + i + 1,
      escape(&row.code),
      row.amount,
      kind_tag(row.kind),
      row.active_label(),
      row.expiry
    ));
  }

  text.push_str(&format!("\n<i>{}</i>", page.total_label()));
  if page.loading {
    text.push_str("\n⏳ Loading...");
  } else if table.phase() == LoadPhase::Failed {
    text.push_str("\n⚠️ Coupons could not be loaded, /coupons retries");
  }
  text
}

pub fn designer_list(
  designers: &[designer::Model],
  (pending, approved, total): (u64, u64, u64),
) -> String {
  let mut text = format!(
    "🎨 <b>Designers</b>\n\
    Pending: {} · Approved: {} · Total: {}\n\n",
    pending, approved, total
  );

  if designers.is_empty() {
    text.push_str("<i>No designers</i>");
  }
  for (i, designer) in designers.iter().enumerate() {
    let status = if designer.is_approved { "✅" } else { "⏳" };
    text.push_str(&format!(
      "<b>{}.</b> {} {} · <code>{}</code>\n",
      i + 1,
      status,
      escape(&field_value(&designer.user.display_name)),
      escape(&designer.id)
    ));
  }
  text
}

pub fn user_options(options: &[UserOption]) -> String {
  if options.is_empty() {
    return "🔍 No users found".into();
  }
  format!("🔍 Pick the coupon target ({} found):", options.len())
}
