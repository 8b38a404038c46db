use std::sync::Arc;

use futures::future;
use teloxide::{prelude::*, utils::command::BotCommands};

use super::{ReplyBot, callback, dashboard};
use crate::{
  prelude::*,
  state::{AppState, Services},
  ui::{
    Notice,
    coupon_table::{ActiveFilter, Column, Direction, SearchMode},
  },
  utils,
};

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
  #[command(description = "show the dashboard help")]
  Start,
  #[command(description = "show the dashboard help")]
  Help,
  #[command(description = "list designers with counters")]
  Designers(String),
  #[command(description = "open a designer card")]
  Designer(String),
  #[command(description = "approve a designer")]
  Approve(String),
  #[command(description = "move a designer back to pending")]
  Pending(String),
  #[command(description = "disable a designer")]
  Disable(String),
  #[command(description = "remove a staged image")]
  Unstage(String),
  #[command(description = "upload staged images")]
  Upload,
  #[command(description = "delete a product sample")]
  Delimg(String),
  #[command(description = "close the designer card")]
  Close,
  #[command(description = "show the coupon table")]
  Coupons,
  #[command(description = "go to a coupon page")]
  Page(String),
  #[command(description = "set coupons per page")]
  Pagesize(String),
  #[command(description = "search coupons")]
  Search(String),
  #[command(description = "sort coupons")]
  Sort(String),
  #[command(description = "filter coupons by status")]
  Filter(String),
  #[command(description = "create a promotion coupon")]
  Promo(String),
  #[command(description = "find the user for a user coupon")]
  Users(String),
  #[command(description = "create a coupon for the picked user")]
  Usercoupon(String),
  #[command(description = "delete a coupon")]
  Delcoupon(String),
  #[command(description = "close the coupon forms")]
  Cancel,
}

const HELP: &str = "\
<b>📋 Admin Dashboard</b>

<b>Designers:</b>
/designers [pending|approved] - Counters and designer list
/designer &lt;id&gt; - Open a designer card
/approve &lt;id&gt; - Approve a designer
/pending &lt;id&gt; - Move a designer back to pending
/disable &lt;id&gt; - Disable a designer

<b>Product samples (open card):</b>
Send photos or image files - Stage them for upload
/unstage &lt;n&gt; - Remove staged file n
/upload - Upload staged files
/delimg &lt;n&gt; - Delete product sample n
/close - Close the card

<b>Coupons:</b>
/coupons - Show the coupon table
/page &lt;n&gt; - Go to page n
/pagesize &lt;5|10|20|50&gt; - Coupons per page
/search &lt;code|amount|type&gt; [term] - Search (no term clears)
/sort [code|amount|type|active|expiry] [asc|desc] - Sort (no column clears)
/filter &lt;active|inactive|all&gt; - Filter by status
/promo &lt;code&gt; &lt;amount&gt; &lt;max_usage&gt; &lt;YYYY-MM-DD&gt; - Promotion coupon
/users &lt;name or email&gt; - Pick the target of a user coupon
/usercoupon &lt;code&gt; &lt;amount&gt; &lt;YYYY-MM-DD&gt; - Coupon for the picked user
/delcoupon &lt;id&gt; - Delete a coupon
/cancel - Close the coupon forms, keeping what was typed
/help - Show this message";

/// 1-based position from the command argument.
fn parse_position(input: &str, usage: &str) -> Result<usize> {
  input
    .trim()
    .parse::<usize>()
    .ok()
    .filter(|n| *n > 0)
    .map(|n| n - 1)
    .ok_or_else(|| Error::InvalidArgs(format!("Usage: {usage}")))
}

/// Approval status a designer listing is narrowed to.
fn parse_status(input: &str) -> Result<Option<bool>> {
  match input.trim().to_lowercase().as_str() {
    "" => Ok(None),
    "approved" => Ok(Some(true)),
    "pending" => Ok(Some(false)),
    _ => {
      Err(Error::InvalidArgs("Usage: /designers [pending|approved]".into()))
    }
  }
}

fn parse_id(input: &str, usage: &str) -> Result<String> {
  let id = input.trim();
  if id.is_empty() {
    return Err(Error::InvalidArgs(format!("Usage: {usage}")));
  }
  Ok(id.to_string())
}

/// Numbers that fail to parse are left empty for the form to reject.
fn parse_amount(input: Option<&&str>) -> Option<f64> {
  input.and_then(|raw| raw.parse::<f64>().ok())
}

fn parse_expiry(input: Option<&&str>) -> Result<Option<NaiveDate>> {
  input.map(|raw| utils::parse_date(raw)).transpose()
}

pub async fn handle(
  app: Arc<AppState>,
  bot: ReplyBot,
  cmd: Command,
) -> ResponseResult<()> {
  if !app.admins.contains(&bot.user_id) {
    return Ok(());
  }

  let sv = app.sv();

  let result: Result<String> = match cmd {
    Command::Start | Command::Help => Ok(HELP.to_string()),

    Command::Designers(status) => {
      async {
        let status = parse_status(&status)?;
        let listing = async {
          match status {
            None => sv.designer.all().await,
            Some(approved) => sv.designer.all_for_filter().await.map(|all| {
              all
                .into_iter()
                .filter(|designer| designer.is_approved == approved)
                .collect::<Vec<_>>()
            }),
          }
        };
        let (counts, designers) = future::join(
          future::try_join3(
            sv.designer.pending_count(),
            sv.designer.approved_count(),
            sv.designer.total_count(),
          ),
          listing,
        )
        .await;
        Ok(dashboard::designer_list(&designers?, counts?))
      }
      .await
    }

    Command::Designer(id) => match parse_id(&id, "/designer <id>") {
      Ok(id) => return dashboard::open_designer(&app, &bot, &id).await,
      Err(e) => Err(e),
    },

    Command::Approve(id) => {
      return set_approval(&app, &sv, &bot, &id, true).await;
    }
    Command::Pending(id) => {
      return set_approval(&app, &sv, &bot, &id, false).await;
    }

    Command::Disable(id) => match parse_id(&id, "/disable <id>") {
      Ok(id) => match sv.designer.disable(&id).await {
        Ok(_) => {
          info!("Designer {} disabled", id);
          bot.reply_html("🚫 Designer disabled").await?;
          return dashboard::refresh_card(&app, &bot, &id).await;
        }
        Err(e) => {
          error!("Error disabling designer {}: {}", id, e);
          Err(e)
        }
      },
      Err(e) => Err(e),
    },

    Command::Unstage(n) => {
      async {
        let index = parse_position(&n, "/unstage <n>")?;
        let session = app.session(bot.chat_id.0);
        let removed = session.lock().await.detail.unstage(index)?;
        Ok(format!("✅ Unstaged {}", dashboard::escape(&removed.name)))
      }
      .await
    }

    Command::Upload => return dashboard::upload(app.clone(), bot).await,

    Command::Delimg(n) => match parse_position(&n, "/delimg <n>") {
      Ok(position) => {
        return dashboard::delete_image(app.clone(), bot, position).await;
      }
      Err(e) => Err(e),
    },

    Command::Close => return dashboard::close_card(&app, &bot, false).await,

    Command::Coupons => return dashboard::show_coupons(&app, &bot, false).await,

    Command::Page(n) => match parse_position(&n, "/page <n>") {
      Ok(index) => {
        let session = app.session(bot.chat_id.0);
        session.lock().await.coupons.goto_page(index + 1);
        return dashboard::show_coupons(&app, &bot, false).await;
      }
      Err(e) => Err(e),
    },

    Command::Pagesize(n) => {
      let result = match n.trim().parse::<usize>() {
        Ok(size) => {
          let session = app.session(bot.chat_id.0);
          session.lock().await.coupons.set_page_size(size)
        }
        Err(_) => {
          Err(Error::InvalidArgs("Usage: /pagesize <5|10|20|50>".into()))
        }
      };
      match result {
        Ok(()) => return dashboard::show_coupons(&app, &bot, false).await,
        Err(e) => Err(e),
      }
    }

    Command::Search(args) => {
      let result = async {
        let mut parts = args.trim().splitn(2, ' ');
        let mode = parts
          .next()
          .filter(|mode| !mode.is_empty())
          .ok_or_else(|| {
            Error::InvalidArgs(
              "Usage: /search <code|amount|type> [term]".into(),
            )
          })?
          .parse::<SearchMode>()?;
        let term = parts.next().unwrap_or_default().to_string();

        let session = app.session(bot.chat_id.0);
        let mut session = session.lock().await;
        session.coupons.set_search_mode(mode);
        session.coupons.set_search_term(term);
        Ok(())
      }
      .await;
      match result {
        Ok(()) => return dashboard::show_coupons(&app, &bot, false).await,
        Err(e) => Err(e),
      }
    }

    Command::Sort(args) => {
      let parts: Vec<&str> = args.split_whitespace().collect();
      let sort = match parts.as_slice() {
        [] => Ok(None),
        [column] => column.parse::<Column>().map(|c| Some((c, Direction::Asc))),
        [column, direction] => column
          .parse::<Column>()
          .and_then(|c| Ok(Some((c, direction.parse::<Direction>()?)))),
        _ => Err(Error::InvalidArgs(
          "Usage: /sort [code|amount|type|active|expiry] [asc|desc]".into(),
        )),
      };
      match sort {
        Ok(sort) => {
          let session = app.session(bot.chat_id.0);
          session.lock().await.coupons.set_sort(sort);
          return dashboard::show_coupons(&app, &bot, false).await;
        }
        Err(e) => Err(e),
      }
    }

    Command::Filter(args) => match args.trim().parse::<ActiveFilter>() {
      Ok(filter) => {
        let session = app.session(bot.chat_id.0);
        session.lock().await.coupons.set_filter(filter);
        return dashboard::show_coupons(&app, &bot, false).await;
      }
      Err(e) => Err(e),
    },

    Command::Promo(args) => {
      async {
        let parts: Vec<&str> = args.split_whitespace().collect();
        if parts.len() > 4 {
          return Err(Error::InvalidArgs(
            "Usage: /promo <code> <amount> <max_usage> <YYYY-MM-DD>".into(),
          ));
        }
        let today = Local::now().date_naive();
        let expiry = parse_expiry(parts.get(3))?;

        let session = app.session(bot.chat_id.0);
        let mut session = session.lock().await;
        let form = session.coupons.open_promotion_form();
        form.code = parts.first().map(|s| s.to_string()).unwrap_or_default();
        form.amount = parse_amount(parts.get(1));
        form.max_usage = parts.get(2).and_then(|raw| raw.parse::<i64>().ok());
        if let Some(date) = expiry {
          form.select_expiry(date, today)?;
        }

        let notice =
          session.coupons.submit_promotion(&sv.coupon, today, &Local).await;
        Ok(dashboard::notice_html(&notice))
      }
      .await
    }

    Command::Users(text) => {
      let session = app.session(bot.chat_id.0);
      let mut session = session.lock().await;
      let form = session.coupons.open_user_form();

      if let Some(notice) = form.picker.search(&sv.coupon, text.trim()).await {
        Ok(dashboard::notice_html(&notice))
      } else if text.trim().is_empty() {
        Ok("Usage: /users &lt;name or email&gt;".into())
      } else {
        let options = form.picker.options.clone();
        drop(session);
        bot
          .reply_with_keyboard(
            dashboard::user_options(&options),
            callback::users_keyboard(&options),
          )
          .await?;
        return Ok(());
      }
    }

    Command::Usercoupon(args) => {
      async {
        let parts: Vec<&str> = args.split_whitespace().collect();
        if parts.len() > 3 {
          return Err(Error::InvalidArgs(
            "Usage: /usercoupon <code> <amount> <YYYY-MM-DD>".into(),
          ));
        }
        let today = Local::now().date_naive();
        let expiry = parse_expiry(parts.get(2))?;

        let session = app.session(bot.chat_id.0);
        let mut session = session.lock().await;
        let form = session.coupons.open_user_form();
        form.code = parts.first().map(|s| s.to_string()).unwrap_or_default();
        form.amount = parse_amount(parts.get(1));
        if let Some(date) = expiry {
          form.select_expiry(date, today)?;
        }

        let notice =
          session.coupons.submit_user_coupon(&sv.coupon, today, &Local).await;
        Ok(dashboard::notice_html(&notice))
      }
      .await
    }

    Command::Delcoupon(id) => match parse_id(&id, "/delcoupon <id>") {
      Ok(id) => return dashboard::delete_coupon(&app, &bot, &id).await,
      Err(e) => Err(e),
    },

    Command::Cancel => return dashboard::cancel_forms(&app, &bot).await,
  };

  match result {
    Ok(text) => bot.reply_html_chunked(text, None).await,
    Err(e) => bot.reply_html(error_text(&e)).await,
  }
}

fn error_text(err: &Error) -> String {
  dashboard::notice_html(&Notice::error(err.user_message()))
}

async fn set_approval(
  app: &AppState,
  sv: &Services<'_>,
  bot: &ReplyBot,
  input: &str,
  is_approved: bool,
) -> ResponseResult<()> {
  let usage = if is_approved { "/approve <id>" } else { "/pending <id>" };
  let result = match parse_id(input, usage) {
    Ok(id) => sv.designer.set_approval(&id, is_approved).await.map(|_| id),
    Err(e) => Err(e),
  };

  match result {
    Ok(id) => {
      info!("Designer {} approval set to {}", id, is_approved);
      let text = if is_approved {
        "✅ Designer approved"
      } else {
        "⏳ Designer set to pending"
      };
      bot.reply_html(text).await?;
      dashboard::refresh_card(app, bot, &id).await
    }
    Err(e) => {
      error!("Error updating designer status: {}", e);
      bot.reply_html(error_text(&e)).await
    }
  }
}
