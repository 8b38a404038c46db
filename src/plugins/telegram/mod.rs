mod callback;
mod command;
mod dashboard;

use std::{collections::HashSet, sync::Arc};

use command::Command;
use teloxide::{
  Bot,
  dispatching::{Dispatcher, HandlerExt, UpdateFilterExt},
  net::Download,
  prelude::*,
  types::{
    BotCommandScope, CallbackQuery, ChatId, FileMeta, InlineKeyboardMarkup,
    Message, MessageId, ParseMode, Update,
  },
  utils::command::BotCommands,
};

use crate::{
  prelude::*,
  state::AppState,
  sv::ImageFile,
  ui::{Notice, designer_detail::MAX_STAGED},
  utils,
};

pub struct Plugin;

#[async_trait::async_trait]
impl super::Plugin for Plugin {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    run_bot(app).await;
    Ok(())
  }
}

/// Command hints are only shown in admin chats.
async fn setup_commands(bot: &Bot, admins: &HashSet<i64>) {
  for &admin_id in admins {
    if let Err(e) = bot
      .set_my_commands(Command::bot_commands())
      .scope(BotCommandScope::Chat { chat_id: ChatId(admin_id).into() })
      .await
    {
      warn!("Failed to set admin commands for {}: {}", admin_id, e);
    }
  }

  info!(
    "Command hints configured for {} admin(s): {} commands",
    admins.len(),
    Command::bot_commands().len()
  );
}

pub async fn run_bot(app: Arc<AppState>) {
  info!("Starting Telegram bot...");

  let bot = app.bot.clone();

  setup_commands(&bot, &app.admins).await;

  let handler = teloxide::dptree::entry()
    .branch(Update::filter_message().filter_command::<Command>().endpoint({
      let app = app.clone();
      move |bot: Bot, msg: Message, cmd: Command| {
        let app = app.clone();
        let bot = ReplyBot::new(bot, msg.chat.id.0, msg.chat.id, msg.id);
        command::handle(app, bot, cmd)
      }
    }))
    .branch(
      Update::filter_message()
        .filter(|msg: Message| msg.photo().is_some() || msg.document().is_some())
        .endpoint({
          let app = app.clone();
          move |bot: Bot, msg: Message| {
            let app = app.clone();
            stage_handle(app, bot, msg)
          }
        }),
    )
    .branch(Update::filter_callback_query().endpoint({
      let app = app.clone();
      move |bot: Bot, query: CallbackQuery| {
        let app = app.clone();
        callback_handle(app, bot, query)
      }
    }));

  Dispatcher::builder(bot, handler).build().dispatch().await;
}

async fn callback_handle(
  app: Arc<AppState>,
  bot: Bot,
  query: CallbackQuery,
) -> ResponseResult<()> {
  if let Some(data) = query.data
    && let Some(msg) = query.message.as_ref()
  {
    let bot =
      ReplyBot::new(bot, query.from.id.0 as i64, msg.chat().id, msg.id());

    // answer callback to remove loading state
    bot.inner.answer_callback_query(query.id.clone()).await?;

    callback::handle(app, bot, &data).await
  } else {
    Ok(())
  }
}

/// A photo, or a document with an image type, sent to stage on the card.
struct Incoming<'a> {
  file: &'a FileMeta,
  name: String,
  content_type: String,
}

fn incoming_image(msg: &Message) -> Option<Incoming<'_>> {
  if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
    return Some(Incoming {
      file: &photo.file,
      name: format!("photo_{}.jpg", msg.id.0),
      content_type: "image/jpeg".into(),
    });
  }

  let document = msg.document()?;
  let mime = document.mime_type.as_ref()?;
  if !mime.essence_str().starts_with("image/") {
    return None;
  }
  Some(Incoming {
    file: &document.file,
    name: document
      .file_name
      .clone()
      .unwrap_or_else(|| format!("image_{}", msg.id.0)),
    content_type: mime.essence_str().to_string(),
  })
}

async fn stage_handle(
  app: Arc<AppState>,
  bot: Bot,
  msg: Message,
) -> ResponseResult<()> {
  let bot = ReplyBot::new(bot, msg.chat.id.0, msg.chat.id, msg.id);
  if !app.admins.contains(&bot.user_id) {
    return Ok(());
  }

  let Some(incoming) = incoming_image(&msg) else {
    return bot.reply_html("❌ Only images can be staged").await;
  };

  let session = app.session(bot.chat_id.0);
  let (is_open, has_room) = {
    let session = session.lock().await;
    (session.detail.is_open(), session.detail.can_stage_more())
  };
  if !is_open {
    return bot.notify(&Notice::from_error(&Error::CardClosed, "")).await;
  }
  if !has_room {
    let notice = Notice::warning(format!("Max {MAX_STAGED} images"));
    return bot.notify(&notice).await;
  }

  let bytes = match bot.download(incoming.file).await {
    Ok(bytes) => bytes,
    Err(err) => {
      error!("Failed to download {}: {}", incoming.name, err);
      return bot.notify(&Notice::from_error(&err, "")).await;
    }
  };
  let file = ImageFile::new(&incoming.name, &incoming.content_type, bytes);

  let staged = {
    let mut session = session.lock().await;
    session
      .detail
      .add_staged(file)
      .map(|notice| (notice, session.detail.staged().len()))
  };

  match staged {
    Ok((notice, count)) => {
      if let Some(notice) = notice {
        bot.notify(&notice).await?;
      }
      bot
        .reply_html(format!(
          "📎 Staged <b>{}</b> ({}/{}). Send /upload when ready.",
          dashboard::escape(&incoming.name),
          count,
          MAX_STAGED
        ))
        .await
    }
    Err(err) => bot.notify(&Notice::from_error(&err, "")).await,
  }
}

#[derive(Debug, Clone)]
struct ReplyBot {
  inner: Bot,
  pub user_id: i64,
  pub chat_id: ChatId,
  pub message_id: MessageId,
}

impl ReplyBot {
  pub fn new(
    inner: Bot,
    user_id: i64,
    chat_id: ChatId,
    message_id: MessageId,
  ) -> Self {
    Self { inner, user_id, chat_id, message_id }
  }

  async fn reply_html(&self, text: impl Into<String>) -> ResponseResult<()> {
    self
      .inner
      .send_message(self.chat_id, text.into())
      .parse_mode(ParseMode::Html)
      .await?;
    Ok(())
  }

  /// Send a potentially long message split into chunks. The keyboard is
  /// attached to the last one.
  async fn reply_html_chunked(
    &self,
    text: impl Into<String>,
    keyboard: Option<InlineKeyboardMarkup>,
  ) -> ResponseResult<()> {
    let mut chunks = utils::chunk_message(&text.into(), 0);
    let last = chunks.pop().unwrap_or_default();

    for chunk in chunks {
      self
        .inner
        .send_message(self.chat_id, chunk)
        .parse_mode(ParseMode::Html)
        .await?;
    }

    let mut request =
      self.inner.send_message(self.chat_id, last).parse_mode(ParseMode::Html);
    if let Some(keyboard) = keyboard {
      request = request.reply_markup(keyboard);
    }
    request.await?;
    Ok(())
  }

  async fn reply_with_keyboard(
    &self,
    text: impl Into<String>,
    keyboard: InlineKeyboardMarkup,
  ) -> ResponseResult<()> {
    self
      .inner
      .send_message(self.chat_id, text.into())
      .parse_mode(ParseMode::Html)
      .reply_markup(keyboard)
      .await?;
    Ok(())
  }

  pub async fn edit_html(&self, text: impl Into<String>) -> ResponseResult<()> {
    self
      .inner
      .edit_message_text(self.chat_id, self.message_id, text.into())
      .parse_mode(ParseMode::Html)
      .await?;
    Ok(())
  }

  pub async fn edit_with_keyboard(
    &self,
    text: impl Into<String>,
    keyboard: InlineKeyboardMarkup,
  ) -> ResponseResult<()> {
    self
      .inner
      .edit_message_text(self.chat_id, self.message_id, text.into())
      .parse_mode(ParseMode::Html)
      .reply_markup(keyboard)
      .await?;
    Ok(())
  }

  async fn notify(&self, notice: &Notice) -> ResponseResult<()> {
    self.reply_html(dashboard::notice_html(notice)).await
  }

  async fn download(&self, file: &FileMeta) -> Result<Vec<u8>> {
    let file = self
      .inner
      .get_file(file.id.clone())
      .await
      .map_err(|e| Error::Transport(e.to_string()))?;

    let mut bytes = Vec::with_capacity(file.size as usize);
    self
      .inner
      .download_file(&file.path, &mut bytes)
      .await
      .map_err(|e| Error::Transport(e.to_string()))?;
    Ok(bytes)
  }
}
