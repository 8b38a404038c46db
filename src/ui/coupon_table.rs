//! Coupon listing with search, sort, active filter, pagination and the two
//! creation forms.

use std::{cmp::Ordering, str::FromStr};

use super::{
  Notice,
  coupon_form::{PromotionForm, UserCouponForm},
};
use crate::{
  entity::{CouponKind, coupon},
  prelude::*,
  sv,
  utils,
};

pub const PAGE_SIZE_OPTIONS: [usize; 4] = [5, 10, 20, 50];
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
  #[default]
  Code,
  Amount,
  Type,
}

impl SearchMode {
  pub fn name(self) -> &'static str {
    match self {
      SearchMode::Code => "code",
      SearchMode::Amount => "amount",
      SearchMode::Type => "type",
    }
  }

  fn matches(self, coupon: &coupon::Model, term: &str) -> bool {
    match self {
      SearchMode::Code => {
        coupon.code.to_lowercase().contains(&term.to_lowercase())
      }
      SearchMode::Amount => coupon.amount.to_string().contains(term),
      SearchMode::Type => coupon.kind().label().contains(&term.to_lowercase()),
    }
  }
}

impl FromStr for SearchMode {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_lowercase().as_str() {
      "code" => Ok(SearchMode::Code),
      "amount" => Ok(SearchMode::Amount),
      "type" => Ok(SearchMode::Type),
      _ => Err(Error::InvalidArgs(format!(
        "Unknown search mode `{s}`, use code, amount or type"
      ))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
  Code,
  Amount,
  Type,
  Active,
  Expiry,
}

impl Column {
  fn compare(self, a: &coupon::Model, b: &coupon::Model) -> Ordering {
    match self {
      Column::Code => a
        .code
        .to_lowercase()
        .cmp(&b.code.to_lowercase())
        .then_with(|| a.code.cmp(&b.code)),
      Column::Amount => a.amount.total_cmp(&b.amount),
      Column::Type => a.kind().cmp(&b.kind()),
      Column::Active => a.is_active.cmp(&b.is_active),
      Column::Expiry => a.expiry().cmp(&b.expiry()),
    }
  }
}

impl FromStr for Column {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_lowercase().as_str() {
      "code" => Ok(Column::Code),
      "amount" => Ok(Column::Amount),
      "type" => Ok(Column::Type),
      "active" => Ok(Column::Active),
      "expiry" => Ok(Column::Expiry),
      _ => Err(Error::InvalidArgs(format!(
        "Unknown column `{s}`, use code, amount, type, active or expiry"
      ))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
  #[default]
  Asc,
  Desc,
}

impl FromStr for Direction {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_lowercase().as_str() {
      "asc" => Ok(Direction::Asc),
      "desc" => Ok(Direction::Desc),
      _ => Err(Error::InvalidArgs(format!(
        "Unknown direction `{s}`, use asc or desc"
      ))),
    }
  }
}

/// Which coupons the `Active` column lets through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveFilter {
  #[default]
  All,
  Active,
  Inactive,
}

impl ActiveFilter {
  fn allows(self, coupon: &coupon::Model) -> bool {
    match self {
      ActiveFilter::All => true,
      ActiveFilter::Active => coupon.is_active,
      ActiveFilter::Inactive => !coupon.is_active,
    }
  }
}

impl FromStr for ActiveFilter {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_lowercase().as_str() {
      "all" => Ok(ActiveFilter::All),
      "active" => Ok(ActiveFilter::Active),
      "inactive" => Ok(ActiveFilter::Inactive),
      _ => Err(Error::InvalidArgs(format!(
        "Unknown filter `{s}`, use active, inactive or all"
      ))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
  /// Never fetched.
  Idle,
  Loading,
  Loaded,
  Failed,
}

/// A creation form and whether its dialog is showing. Cancelling hides the
/// dialog but keeps what was typed.
#[derive(Debug, Clone, Default)]
pub struct FormDialog<F> {
  pub visible: bool,
  pub form: F,
}

impl<F: Default> FormDialog<F> {
  fn open(&mut self) -> &mut F {
    self.visible = true;
    &mut self.form
  }

  fn done(&mut self) {
    *self = Self { visible: false, form: F::default() };
  }
}

/// One table row as shown to the operator.
#[derive(Debug, Clone, PartialEq)]
pub struct CouponRow {
  pub id: String,
  pub code: String,
  pub amount: String,
  pub kind: CouponKind,
  pub active: bool,
  pub expiry: String,
}

impl CouponRow {
  fn new(coupon: &coupon::Model) -> Self {
    let expiry = coupon
      .expiry()
      .map(|date| date.with_timezone(&Local).date_naive())
      .map(utils::format_short_date)
      .unwrap_or_else(|| "Invalid date".into());

    Self {
      id: coupon.id.clone(),
      code: coupon.code.clone(),
      amount: coupon.amount.to_string(),
      kind: coupon.kind(),
      active: coupon.is_active,
      expiry,
    }
  }

  pub fn active_label(&self) -> &'static str {
    if self.active { "Active" } else { "Inactive" }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TablePage {
  pub rows: Vec<CouponRow>,
  pub page: usize,
  pub page_count: usize,
  pub page_size: usize,
  pub total: usize,
  pub loading: bool,
}

impl TablePage {
  /// `a-b of N coupons`
  pub fn total_label(&self) -> String {
    let (from, to) = if self.rows.is_empty() {
      (0, 0)
    } else {
      let from = (self.page - 1) * self.page_size + 1;
      (from, from + self.rows.len() - 1)
    };
    format!("{from}-{to} of {} coupons", self.total)
  }
}

#[derive(Debug, Clone)]
pub struct CouponTable {
  phase: LoadPhase,
  coupons: Vec<coupon::Model>,
  search_mode: SearchMode,
  search_term: String,
  sort: Option<(Column, Direction)>,
  filter: ActiveFilter,
  page: usize,
  page_size: usize,
  pub promotion: FormDialog<PromotionForm>,
  pub user_coupon: FormDialog<UserCouponForm>,
}

impl Default for CouponTable {
  fn default() -> Self {
    Self::new(DEFAULT_PAGE_SIZE)
  }
}

impl CouponTable {
  /// `page_size` outside of [`PAGE_SIZE_OPTIONS`] falls back to the default.
  pub fn new(page_size: usize) -> Self {
    let page_size = if PAGE_SIZE_OPTIONS.contains(&page_size) {
      page_size
    } else {
      DEFAULT_PAGE_SIZE
    };

    Self {
      phase: LoadPhase::Idle,
      coupons: Vec::new(),
      search_mode: SearchMode::default(),
      search_term: String::new(),
      sort: None,
      filter: ActiveFilter::default(),
      page: 1,
      page_size,
      promotion: FormDialog::default(),
      user_coupon: FormDialog::default(),
    }
  }

  pub fn phase(&self) -> LoadPhase {
    self.phase
  }

  /// Fetch the full list. Failure keeps whatever was shown before.
  pub async fn load(&mut self, api: &sv::Coupon<'_>) -> Option<Notice> {
    self.phase = LoadPhase::Loading;
    match api.all().await {
      Ok(coupons) => {
        debug!("Loaded {} coupons", coupons.len());
        self.coupons = coupons;
        self.phase = LoadPhase::Loaded;
        None
      }
      Err(err) => {
        error!("Error fetching coupons: {}", err);
        self.phase = LoadPhase::Failed;
        Some(Notice::error("Failed to fetch coupons"))
      }
    }
  }

  /// Load on first use, and again after a failed attempt.
  pub async fn ensure_loaded(&mut self, api: &sv::Coupon<'_>) -> Option<Notice> {
    if matches!(self.phase, LoadPhase::Idle | LoadPhase::Failed) {
      self.load(api).await
    } else {
      None
    }
  }

  pub fn search(&self) -> (SearchMode, &str) {
    (self.search_mode, &self.search_term)
  }

  pub fn set_search_mode(&mut self, mode: SearchMode) {
    self.search_mode = mode;
  }

  pub fn set_search_term(&mut self, term: impl Into<String>) {
    self.search_term = term.into();
  }

  pub fn placeholder(&self) -> String {
    format!("Search by {}", self.search_mode.name())
  }

  pub fn sort(&self) -> Option<(Column, Direction)> {
    self.sort
  }

  /// `None` restores the fetched order.
  pub fn set_sort(&mut self, sort: Option<(Column, Direction)>) {
    self.sort = sort;
  }

  pub fn filter(&self) -> ActiveFilter {
    self.filter
  }

  pub fn set_filter(&mut self, filter: ActiveFilter) {
    self.filter = filter;
    self.page = 1;
  }

  /// Coupons passing search and filter, in display order.
  pub fn visible(&self) -> Vec<&coupon::Model> {
    let term = self.search_term.as_str();
    let mut rows: Vec<_> = self
      .coupons
      .iter()
      .filter(|c| term.trim().is_empty() || self.search_mode.matches(c, term))
      .filter(|c| self.filter.allows(c))
      .collect();

    if let Some((column, direction)) = self.sort {
      rows.sort_by(|a, b| match direction {
        Direction::Asc => column.compare(a, b),
        Direction::Desc => column.compare(b, a),
      });
    }
    rows
  }

  fn page_count(&self, total: usize) -> usize {
    total.div_ceil(self.page_size).max(1)
  }

  pub fn set_page_size(&mut self, size: usize) -> Result<()> {
    if !PAGE_SIZE_OPTIONS.contains(&size) {
      return Err(Error::InvalidArgs(format!(
        "Page size must be one of {PAGE_SIZE_OPTIONS:?}"
      )));
    }
    self.page_size = size;
    self.page = 1;
    Ok(())
  }

  /// Jump to `page`, clamped to the existing pages.
  pub fn goto_page(&mut self, page: usize) -> usize {
    let count = self.page_count(self.visible().len());
    self.page = page.clamp(1, count);
    self.page
  }

  pub fn page(&self) -> TablePage {
    let visible = self.visible();
    let total = visible.len();
    let page_count = self.page_count(total);
    let page = self.page.clamp(1, page_count);

    let rows = visible
      .into_iter()
      .skip((page - 1) * self.page_size)
      .take(self.page_size)
      .map(CouponRow::new)
      .collect();

    TablePage {
      rows,
      page,
      page_count,
      page_size: self.page_size,
      total,
      loading: self.phase == LoadPhase::Loading,
    }
  }

  pub async fn delete(&mut self, api: &sv::Coupon<'_>, id: &str) -> Notice {
    match api.delete(id).await {
      Ok(()) => {
        info!("Coupon {} deleted", id);
        self.coupons.retain(|c| c.id != id);
        Notice::success("Coupon deleted successfully")
      }
      Err(err) => {
        error!("Error deleting coupon {}: {}", id, err);
        Notice::error("Failed to delete coupon")
      }
    }
  }

  pub fn open_promotion_form(&mut self) -> &mut PromotionForm {
    self.promotion.open()
  }

  pub fn cancel_promotion_form(&mut self) {
    self.promotion.visible = false;
  }

  pub fn open_user_form(&mut self) -> &mut UserCouponForm {
    self.user_coupon.open()
  }

  pub fn cancel_user_form(&mut self) {
    self.user_coupon.visible = false;
  }

  /// Validate and create. Invalid input never reaches the backend; a failed
  /// call leaves the dialog open with its values.
  pub async fn submit_promotion<Tz: TimeZone + Sync>(
    &mut self,
    api: &sv::Coupon<'_>,
    today: NaiveDate,
    tz: &Tz,
  ) -> Notice {
    let payload = match self.promotion.form.validate(today, tz) {
      Ok(payload) => payload,
      Err(err) => return Notice::from_error(&err, "Please check the form"),
    };

    match api.create_promotion(&payload).await {
      Ok(created) => {
        info!("Promotion coupon {} created", created.code);
        self.coupons.push(created);
        self.promotion.done();
        Notice::success("Promotion coupon created successfully")
      }
      Err(err) => {
        error!("Error creating promotion coupon: {}", err);
        Notice::from_error(&err, "Error creating promotion coupon")
      }
    }
  }

  pub async fn submit_user_coupon<Tz: TimeZone + Sync>(
    &mut self,
    api: &sv::Coupon<'_>,
    today: NaiveDate,
    tz: &Tz,
  ) -> Notice {
    let payload = match self.user_coupon.form.validate(today, tz) {
      Ok(payload) => payload,
      Err(err) => return Notice::from_error(&err, "Please check the form"),
    };

    match api.create_for_user(&payload).await {
      Ok(created) => {
        info!("User coupon {} created for {}", created.code, payload.user_id);
        self.coupons.push(created);
        self.user_coupon.done();
        Notice::success("User-specific coupon created successfully")
      }
      Err(err) => {
        error!("Error creating user coupon: {}", err);
        Notice::from_error(&err, "Error creating user coupon")
      }
    }
  }
}
