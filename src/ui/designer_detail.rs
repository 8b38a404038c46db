//! Designer detail card: profile display, product-sample staging, upload and
//! deletion.
//!
//! The card is `Closed`, `Loading` or `Open`; staged files, the upload phase
//! and the deletion-in-flight set only exist while it is open. Network work
//! is split into `begin_*` (mutates state, returns a ticket), the ticket's
//! `run` (no access to the card, so the caller can release its lock) and
//! `finish_*` (applies the outcome). Tickets carry the card generation, so a
//! completion arriving after the card was closed or reopened leaves the new
//! state alone.

use super::Notice;
use crate::{
  entity::{designer, is_truthy},
  prelude::*,
  sv::{self, ImageFile, ImageStore},
  utils,
};

pub const MAX_STAGED: usize = 8;
pub const PLACEHOLDER: &str = "Not provided";

/// Parent of the card. `images_changed` lets it refresh its snapshot;
/// `reload` asks for a full reload after a deletion.
pub trait DetailHost: Send + Sync {
  fn images_changed(&self);
  fn reload(&self);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UploadPhase {
  #[default]
  Idle,
  Uploading,
}

#[derive(Debug)]
pub struct OpenCard {
  designer: designer::Model,
  staged: Vec<ImageFile>,
  phase: UploadPhase,
  deleting: BTreeSet<usize>,
}

#[derive(Debug, Default)]
enum CardState {
  #[default]
  Closed,
  Loading,
  Open(OpenCard),
}

#[derive(Debug, Default)]
pub struct DesignerDetail {
  state: CardState,
  generation: u64,
}

/// Staged files handed to the image store, in staging order.
#[derive(Debug)]
pub struct UploadBatch {
  generation: u64,
  pub designer_id: String,
  pub files: Vec<ImageFile>,
  pub folder: String,
}

#[derive(Debug)]
pub struct PendingDelete {
  generation: u64,
  pub designer_id: String,
  pub positions: Vec<usize>,
}

impl DesignerDetail {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_open(&self) -> bool {
    matches!(self.state, CardState::Open(_))
  }

  pub fn is_loading(&self) -> bool {
    matches!(self.state, CardState::Loading)
  }

  fn card(&self) -> Option<&OpenCard> {
    match &self.state {
      CardState::Open(card) => Some(card),
      _ => None,
    }
  }

  fn card_mut(&mut self) -> Result<&mut OpenCard> {
    match &mut self.state {
      CardState::Open(card) => Ok(card),
      _ => Err(Error::CardClosed),
    }
  }

  /// Card of the current generation, if the ticket still belongs to it.
  fn card_for(&mut self, generation: u64) -> Option<&mut OpenCard> {
    if generation != self.generation {
      return None;
    }
    self.card_mut().ok()
  }

  pub fn designer(&self) -> Option<&designer::Model> {
    self.card().map(|card| &card.designer)
  }

  pub fn staged(&self) -> &[ImageFile] {
    self.card().map(|card| card.staged.as_slice()).unwrap_or_default()
  }

  pub fn phase(&self) -> UploadPhase {
    self.card().map(|card| card.phase).unwrap_or_default()
  }

  pub fn deleting(&self) -> BTreeSet<usize> {
    self.card().map(|card| card.deleting.clone()).unwrap_or_default()
  }

  pub fn open_loading(&mut self) {
    self.generation += 1;
    self.state = CardState::Loading;
  }

  pub fn open(&mut self, designer: designer::Model) {
    if !self.is_loading() {
      self.generation += 1;
    }
    self.state = CardState::Open(OpenCard {
      designer,
      staged: Vec::new(),
      phase: UploadPhase::Idle,
      deleting: BTreeSet::new(),
    });
  }

  /// Loading failed; nothing to show.
  pub fn fail_loading(&mut self) {
    if self.is_loading() {
      self.state = CardState::Closed;
    }
  }

  /// Replace the snapshot of the open designer, keeping staged files.
  pub fn refresh(&mut self, designer: designer::Model) {
    if let CardState::Open(card) = &mut self.state
      && card.designer.id == designer.id
    {
      card.designer = designer;
    }
  }

  /// Drop staged files and the upload phase. In-flight requests keep
  /// running; their completions are ignored.
  pub fn close(&mut self) {
    self.state = CardState::Closed;
  }

  pub fn can_stage_more(&self) -> bool {
    self.card().is_some_and(|card| card.staged.len() < MAX_STAGED)
  }

  /// Replace the staged selection. Anything past [`MAX_STAGED`] is dropped.
  pub fn stage(&mut self, mut files: Vec<ImageFile>) -> Result<Option<Notice>> {
    let card = self.card_mut()?;

    let notice = if files.len() > MAX_STAGED {
      let dropped = files.len() - MAX_STAGED;
      files.truncate(MAX_STAGED);
      Some(Notice::warning(format!(
        "Max {MAX_STAGED} images, {dropped} file(s) ignored"
      )))
    } else {
      None
    };

    card.staged = files;
    Ok(notice)
  }

  pub fn add_staged(&mut self, file: ImageFile) -> Result<Option<Notice>> {
    let mut files = self.card_mut()?.staged.clone();
    files.push(file);
    self.stage(files)
  }

  pub fn unstage(&mut self, index: usize) -> Result<ImageFile> {
    let card = self.card_mut()?;
    if index >= card.staged.len() {
      return Err(Error::InvalidArgs(format!(
        "There is no staged file #{}",
        index + 1
      )));
    }
    Ok(card.staged.remove(index))
  }

  /// Start uploading the staged files.
  pub fn begin_upload(&mut self, folder: &str) -> Result<UploadBatch> {
    let generation = self.generation;
    let card = self.card_mut()?;

    if card.phase == UploadPhase::Uploading {
      return Err(Error::UploadInProgress);
    }
    if card.staged.is_empty() {
      return Err(Error::NothingStaged);
    }

    card.phase = UploadPhase::Uploading;
    Ok(UploadBatch {
      generation,
      designer_id: card.designer.id.clone(),
      files: card.staged.clone(),
      folder: folder.to_string(),
    })
  }

  pub fn finish_upload(
    &mut self,
    batch: UploadBatch,
    result: Result<Vec<String>>,
    host: &dyn DetailHost,
  ) -> Notice {
    let card = self.card_for(batch.generation);

    match result {
      Ok(urls) => {
        if let Some(card) = card {
          card.phase = UploadPhase::Idle;
          card.staged.clear();
        }
        host.images_changed();
        Notice::success(format!("Successfully uploaded {} image(s)", urls.len()))
      }
      Err(err) => {
        if let Some(card) = card {
          card.phase = UploadPhase::Idle;
        }
        error!("Error uploading images for {}: {}", batch.designer_id, err);
        Notice::from_error(&err, "Failed to upload images")
      }
    }
  }

  /// Mark `position` as being deleted.
  pub fn begin_delete(&mut self, position: usize) -> Result<PendingDelete> {
    let generation = self.generation;
    let card = self.card_mut()?;

    if position >= card.designer.sample_images().len() {
      return Err(Error::ImageOutOfRange(position));
    }
    if !card.deleting.insert(position) {
      return Err(Error::AlreadyDeleting(position));
    }

    Ok(PendingDelete {
      generation,
      designer_id: card.designer.id.clone(),
      positions: vec![position],
    })
  }

  pub fn finish_delete(
    &mut self,
    pending: PendingDelete,
    result: Result<()>,
    host: &dyn DetailHost,
  ) -> Notice {
    if let Some(card) = self.card_for(pending.generation) {
      for position in &pending.positions {
        card.deleting.remove(position);
      }
    }

    match result {
      Ok(()) => {
        host.images_changed();
        host.reload();
        Notice::success(format!("Removed {} image(s)", pending.positions.len()))
      }
      Err(err) => {
        error!("Error deleting images of {}: {}", pending.designer_id, err);
        Notice::from_error(&err, "Failed to delete images")
      }
    }
  }

  pub fn view(&self) -> Option<DetailView> {
    match &self.state {
      CardState::Closed => None,
      CardState::Loading => Some(DetailView::Loading),
      CardState::Open(card) => Some(DetailView::Card(Box::new(card.view()))),
    }
  }
}

impl UploadBatch {
  /// Upload every file in order, then register the URLs in one call. The
  /// first failing upload aborts the rest and nothing is registered; files
  /// stored before it stay orphaned in the image store.
  pub async fn run(
    &self,
    store: &dyn ImageStore,
    api: &sv::Designer<'_>,
  ) -> Result<Vec<String>> {
    let mut urls = Vec::with_capacity(self.files.len());

    for file in &self.files {
      info!("Uploading {} to image store", file.name);
      match store.upload(file, &self.folder).await {
        Ok(url) => {
          debug!("Image uploaded: {}", url);
          urls.push(url);
        }
        Err(err) => {
          if !urls.is_empty() {
            warn!(
              "{} stored image(s) left unregistered for {}",
              urls.len(),
              self.designer_id
            );
          }
          return Err(err);
        }
      }
    }

    info!("Registering {} image(s) for {}", urls.len(), self.designer_id);
    api.upload_sample_images(&self.designer_id, urls.clone()).await?;
    Ok(urls)
  }
}

impl PendingDelete {
  pub async fn run(&self, api: &sv::Designer<'_>) -> Result<()> {
    api.delete_sample_images(&self.designer_id, self.positions.clone()).await?;
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailView {
  Loading,
  Card(Box<DesignerCard>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleImage {
  pub position: usize,
  pub url: String,
  pub deleting: bool,
}

/// Everything the card shows, already formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignerCard {
  pub id: String,
  pub title: String,
  pub email: String,
  pub phone: String,
  pub joined: String,
  pub approved: bool,
  pub status: &'static str,
  pub address: String,
  pub city: String,
  pub state: String,
  pub pincode: String,
  pub about: String,
  pub logo: Option<String>,
  pub cover: Option<String>,
  pub samples: Vec<SampleImage>,
  pub staged: Vec<String>,
  pub can_stage_more: bool,
  pub uploading: bool,
  pub upload_label: Option<String>,
}

impl OpenCard {
  fn view(&self) -> DesignerCard {
    let designer = &self.designer;
    let user = &designer.user;
    let present = |url: &Option<String>| url.clone().filter(|u| !u.is_empty());

    DesignerCard {
      id: designer.id.clone(),
      title: field_value(&user.display_name),
      email: field_value(&user.email),
      phone: field_value(&user.phone_number),
      joined: format_date(designer.created_time.as_deref()),
      approved: designer.is_approved,
      status: if designer.is_approved { "Approved" } else { "Pending" },
      address: address_info(&user.address),
      city: field_value(&user.city),
      state: field_value(&user.state),
      pincode: field_value(&user.pincode),
      about: field_value(&designer.short_description),
      logo: present(&designer.logo_url),
      cover: present(&designer.background_image),
      samples: designer
        .sample_images()
        .iter()
        .enumerate()
        .map(|(position, url)| SampleImage {
          position,
          url: url.clone(),
          deleting: self.deleting.contains(&position),
        })
        .collect(),
      staged: self.staged.iter().map(|f| f.name.clone()).collect(),
      can_stage_more: self.staged.len() < MAX_STAGED,
      uploading: self.phase == UploadPhase::Uploading,
      upload_label: (!self.staged.is_empty())
        .then(|| format!("Upload {}", utils::plural(self.staged.len(), "Image"))),
    }
  }
}

/// Display text of a scalar profile field.
pub fn field_value(value: &json::Value) -> String {
  match value {
    json::Value::Null => PLACEHOLDER.to_string(),
    json::Value::String(s) => s.clone(),
    json::Value::Bool(b) => b.to_string(),
    json::Value::Number(n) => n.to_string(),
    other => other.to_string(),
  }
}

/// Address as one line: free text verbatim, structured parts comma-joined.
pub fn address_info(value: &json::Value) -> String {
  match value {
    json::Value::String(s) if !s.is_empty() => s.clone(),
    json::Value::Object(map) => {
      let parts: Vec<String> = ["street_details", "city", "state", "pincode"]
        .iter()
        .filter_map(|key| map.get(*key))
        .filter(|part| is_truthy(part))
        .map(field_value)
        .collect();

      if parts.is_empty() { PLACEHOLDER.to_string() } else { parts.join(", ") }
    }
    _ => PLACEHOLDER.to_string(),
  }
}

/// `October 19, 2026` in local time.
pub fn format_date(value: Option<&str>) -> String {
  let Some(raw) = value.filter(|raw| !raw.is_empty()) else {
    return PLACEHOLDER.to_string();
  };

  if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
    return utils::format_long_date(date.with_timezone(&Local).date_naive());
  }
  match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
    Ok(date) => utils::format_long_date(date),
    Err(_) => "Invalid Date".to_string(),
  }
}

#[cfg(test)]
mod tests {
  use reqwest::Method;

  use super::*;
  use crate::{
    sv::test_utils::{FakeImageStore, FakeTransport, RecordingHost, image},
    ui::Level,
  };

  const SAMPLES: &str = "/designer/d1/product-sample-images";

  fn designer(images: usize) -> designer::Model {
    designer::Model {
      id: "d1".into(),
      product_sample_images: Some(
        (0..images).map(|i| format!("https://cdn.test/s{i}.png")).collect(),
      ),
      ..Default::default()
    }
  }

  fn open_card(images: usize) -> DesignerDetail {
    let mut detail = DesignerDetail::new();
    detail.open(designer(images));
    detail
  }

  async fn upload(
    detail: &mut DesignerDetail,
    store: &dyn ImageStore,
    api: &dyn sv::Transport,
    host: &dyn DetailHost,
  ) -> Notice {
    let batch = detail.begin_upload("designer-product-samples").unwrap();
    let result = batch.run(store, &sv::Designer::new(api)).await;
    detail.finish_upload(batch, result, host)
  }

  #[test]
  fn test_address_info() {
    let full = json::json!({
      "street_details": "12 MG Road",
      "city": "Pune",
      "state": "MH",
      "pincode": 411001
    });
    assert_eq!(address_info(&full), "12 MG Road, Pune, MH, 411001");

    let partial = json::json!({"city": "Pune", "state": "", "pincode": null});
    assert_eq!(address_info(&partial), "Pune");

    assert_eq!(address_info(&json::json!({})), PLACEHOLDER);
    assert_eq!(address_info(&json::Value::Null), PLACEHOLDER);
    assert_eq!(address_info(&json::json!("Near lake")), "Near lake");
    assert_eq!(address_info(&json::json!("")), PLACEHOLDER);
    assert_eq!(address_info(&json::json!(42)), PLACEHOLDER);
  }

  #[test]
  fn test_field_value() {
    assert_eq!(field_value(&json::Value::Null), PLACEHOLDER);
    assert_eq!(field_value(&designer::Profile::default().city), PLACEHOLDER);
    assert_eq!(field_value(&json::json!(42)), "42");
    assert_eq!(field_value(&json::json!("Pune")), "Pune");
    assert_eq!(field_value(&json::json!({"a": 1})), r#"{"a":1}"#);
    assert_eq!(field_value(&json::json!([1, 2])), "[1,2]");
  }

  #[test]
  fn test_format_date() {
    assert_eq!(format_date(Some("2026-01-05T12:00:00.000Z")), "January 5, 2026");
    assert_eq!(format_date(Some("2026-01-05")), "January 5, 2026");
    assert_eq!(format_date(Some("yesterday")), "Invalid Date");
    assert_eq!(format_date(None), PLACEHOLDER);
  }

  #[test]
  fn test_closed_card_renders_nothing() {
    let mut detail = DesignerDetail::new();
    assert!(detail.view().is_none());
    assert!(matches!(detail.stage(vec![image("a")]), Err(Error::CardClosed)));

    detail.open_loading();
    assert_eq!(detail.view(), Some(DetailView::Loading));

    detail.fail_loading();
    assert!(detail.view().is_none());
  }

  #[test]
  fn test_card_view() {
    let mut model = designer(2);
    model.user.display_name = json::json!("Asha");
    model.logo_url = Some("https://cdn.test/logo.png".into());
    model.background_image = Some(String::new());

    let mut detail = DesignerDetail::new();
    detail.open(model);
    detail.stage(vec![image("a"), image("b")]).unwrap();
    detail.begin_delete(1).unwrap();

    let Some(DetailView::Card(card)) = detail.view() else {
      panic!("card should be open");
    };
    assert_eq!(card.title, "Asha");
    assert_eq!(card.status, "Pending");
    assert_eq!(card.email, PLACEHOLDER);
    assert_eq!(card.logo.as_deref(), Some("https://cdn.test/logo.png"));
    assert_eq!(card.cover, None);
    assert!(!card.samples[0].deleting);
    assert!(card.samples[1].deleting);
    assert_eq!(card.upload_label.as_deref(), Some("Upload 2 Images"));
    assert!(card.can_stage_more);
  }

  #[test]
  fn test_staging_caps_and_replaces() {
    let mut detail = open_card(0);

    let files: Vec<_> = (0..10).map(|i| image(&format!("f{i}"))).collect();
    let notice = detail.stage(files).unwrap().unwrap();
    assert_eq!(notice.level, Level::Warning);
    assert_eq!(detail.staged().len(), MAX_STAGED);
    assert!(!detail.can_stage_more());

    detail.stage(vec![image("only")]).unwrap();
    assert_eq!(detail.staged().len(), 1);

    detail.add_staged(image("second")).unwrap();
    assert_eq!(detail.unstage(0).unwrap().name, "only");
    assert_eq!(detail.staged()[0].name, "second");
    assert!(detail.unstage(3).is_err());
  }

  #[test]
  fn test_close_drops_staged_files() {
    let mut detail = open_card(0);
    detail.stage(vec![image("a")]).unwrap();
    detail.close();

    detail.open(designer(0));
    assert!(detail.staged().is_empty());
    assert_eq!(detail.phase(), UploadPhase::Idle);
  }

  #[test]
  fn test_upload_requires_staged_files() {
    let mut detail = open_card(0);
    assert!(matches!(
      detail.begin_upload("x"),
      Err(Error::NothingStaged)
    ));
    assert_eq!(
      Error::NothingStaged.user_message(),
      "Please select at least one image to upload"
    );
  }

  #[tokio::test]
  async fn test_upload_success_registers_once() {
    let api = FakeTransport::new().on(Method::POST, SAMPLES, json::Value::Null);
    let store = FakeImageStore::new();
    let host = RecordingHost::default();
    let mut detail = open_card(0);
    detail.stage(vec![image("a.png"), image("b.png")]).unwrap();

    let notice = upload(&mut detail, &store, &api, &host).await;

    assert_eq!(notice, Notice::success("Successfully uploaded 2 image(s)"));
    let registrations = api.calls_to(Method::POST, SAMPLES);
    assert_eq!(registrations.len(), 1);
    assert_eq!(
      registrations[0].body,
      Some(json::json!({"imageUrls": [
        "https://cdn.test/designer-product-samples/a.png",
        "https://cdn.test/designer-product-samples/b.png"
      ]}))
    );
    assert!(detail.staged().is_empty());
    assert_eq!(detail.phase(), UploadPhase::Idle);
    assert_eq!(host.changed(), 1);
  }

  #[tokio::test]
  async fn test_upload_stops_at_first_failure() {
    let api = FakeTransport::new().on(Method::POST, SAMPLES, json::Value::Null);
    let store = FakeImageStore::failing_on(1);
    let host = RecordingHost::default();
    let mut detail = open_card(0);
    detail.stage(vec![image("1"), image("2"), image("3")]).unwrap();

    let notice = upload(&mut detail, &store, &api, &host).await;

    assert!(notice.is_error());
    assert_eq!(notice.text, "Quota exceeded for 2");
    assert_eq!(store.attempts(), vec!["1", "2"]);
    assert!(api.calls().is_empty());
    assert_eq!(host.changed(), 0);
    // kept for retry
    assert_eq!(detail.staged().len(), 3);
    assert_eq!(detail.phase(), UploadPhase::Idle);
  }

  #[tokio::test]
  async fn test_registration_failure_keeps_staged() {
    let api = FakeTransport::new().fail(Method::POST, SAMPLES, 500, "");
    let store = FakeImageStore::new();
    let host = RecordingHost::default();
    let mut detail = open_card(0);
    detail.stage(vec![image("a")]).unwrap();

    let notice = upload(&mut detail, &store, &api, &host).await;

    assert_eq!(notice, Notice::error("Failed to upload images"));
    assert_eq!(detail.staged().len(), 1);
    assert_eq!(host.changed(), 0);
  }

  #[tokio::test]
  async fn test_second_upload_rejected_while_running() {
    let mut detail = open_card(0);
    detail.stage(vec![image("a")]).unwrap();

    let _batch = detail.begin_upload("x").unwrap();
    assert_eq!(detail.phase(), UploadPhase::Uploading);
    assert!(matches!(detail.begin_upload("x"), Err(Error::UploadInProgress)));
  }

  #[tokio::test]
  async fn test_delete_success_reloads() {
    let api =
      FakeTransport::new().on(Method::DELETE, SAMPLES, json::Value::Null);
    let host = RecordingHost::default();
    let mut detail = open_card(5);

    let pending = detail.begin_delete(2).unwrap();
    assert_eq!(detail.deleting(), BTreeSet::from([2]));

    let result = pending.run(&sv::Designer::new(&api)).await;
    let notice = detail.finish_delete(pending, result, &host);

    assert_eq!(notice, Notice::success("Removed 1 image(s)"));
    assert_eq!(
      api.calls()[0].body,
      Some(json::json!({"imageIndexes": [2]}))
    );
    assert!(detail.deleting().is_empty());
    assert_eq!(host.changed(), 1);
    assert_eq!(host.reloads(), 1);
  }

  #[tokio::test]
  async fn test_delete_failure_clears_mark_without_reload() {
    let api =
      FakeTransport::new().fail(Method::DELETE, SAMPLES, 400, "Bad index");
    let host = RecordingHost::default();
    let mut detail = open_card(5);

    let pending = detail.begin_delete(2).unwrap();
    let result = pending.run(&sv::Designer::new(&api)).await;
    let notice = detail.finish_delete(pending, result, &host);

    assert_eq!(notice, Notice::error("Bad index"));
    assert!(detail.deleting().is_empty());
    assert_eq!(host.reloads(), 0);
    assert_eq!(host.changed(), 0);
  }

  #[test]
  fn test_concurrent_deletes_tracked_per_position() {
    let host = RecordingHost::default();
    let mut detail = open_card(5);

    let first = detail.begin_delete(1).unwrap();
    let second = detail.begin_delete(3).unwrap();
    assert!(matches!(detail.begin_delete(3), Err(Error::AlreadyDeleting(3))));
    assert!(matches!(detail.begin_delete(5), Err(Error::ImageOutOfRange(5))));
    assert_eq!(detail.deleting(), BTreeSet::from([1, 3]));

    detail.finish_delete(first, Err(Error::Transport("down".into())), &host);
    assert_eq!(detail.deleting(), BTreeSet::from([3]));

    detail.finish_delete(second, Ok(()), &host);
    assert!(detail.deleting().is_empty());
  }

  #[test]
  fn test_late_completion_after_close_is_ignored() {
    let host = RecordingHost::default();
    let mut detail = open_card(3);

    let pending = detail.begin_delete(0).unwrap();
    detail.close();
    detail.open(designer(3));
    let other = detail.begin_delete(0).unwrap();

    detail.finish_delete(pending, Err(Error::Transport("x".into())), &host);
    assert_eq!(detail.deleting(), BTreeSet::from([0]));

    detail.finish_delete(other, Ok(()), &host);
    assert!(detail.deleting().is_empty());
  }

  #[test]
  fn test_refresh_ignored_while_loading() {
    let mut detail = DesignerDetail::new();
    detail.open_loading();

    detail.refresh(designer(1));
    assert!(detail.is_loading());
    assert!(detail.designer().is_none());
  }

  #[test]
  fn test_refresh_keeps_staged_files() {
    let mut detail = open_card(1);
    detail.stage(vec![image("a")]).unwrap();

    detail.refresh(designer(2));
    assert_eq!(detail.designer().unwrap().sample_images().len(), 2);
    assert_eq!(detail.staged().len(), 1);
  }
}
