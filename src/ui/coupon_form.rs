//! The two coupon creation forms and the user picker of the user coupon form.

use chrono::{NaiveTime, SecondsFormat};

use super::Notice;
use crate::{
  entity::coupon::{NewPromotionCoupon, NewUserCoupon, UserOption},
  prelude::*,
  sv,
};

/// Past days can't be picked as an expiry date.
pub fn is_date_disabled(date: NaiveDate, today: NaiveDate) -> bool {
  date < today
}

/// Start of `date` in `tz`, as a UTC timestamp with milliseconds:
/// `2026-10-19T18:30:00.000Z`.
pub fn expiry_timestamp<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> String {
  let midnight = date.and_time(NaiveTime::MIN);
  let start = tz
    .from_local_datetime(&midnight)
    .earliest()
    .map(|start| start.with_timezone(&Utc))
    .unwrap_or_else(|| Utc.from_utc_datetime(&midnight));

  start.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn check_code(code: &str, errors: &mut Vec<FieldError>) {
  if code.trim().is_empty() {
    errors.push(FieldError::new("couponCode", "Please enter coupon code"));
  }
}

fn check_amount(amount: Option<f64>, errors: &mut Vec<FieldError>) {
  match amount {
    Some(amount) if !amount.is_finite() => {
      errors.push(FieldError::new("couponAmount", "Please enter amount"))
    }
    Some(amount) if amount < 0.0 => errors
      .push(FieldError::new("couponAmount", "Amount cannot be negative")),
    Some(_) => {}
    None => errors.push(FieldError::new("couponAmount", "Please enter amount")),
  }
}

fn check_expiry(
  expiry: Option<NaiveDate>,
  today: NaiveDate,
  errors: &mut Vec<FieldError>,
) {
  match expiry {
    Some(date) if is_date_disabled(date, today) => errors.push(
      FieldError::new("expiryDate", "Expiry date cannot be in the past"),
    ),
    Some(_) => {}
    None => {
      errors.push(FieldError::new("expiryDate", "Please select expiry date"))
    }
  }
}

fn select_date(
  slot: &mut Option<NaiveDate>,
  date: NaiveDate,
  today: NaiveDate,
) -> Result<()> {
  if is_date_disabled(date, today) {
    return Err(Error::DateDisabled);
  }
  *slot = Some(date);
  Ok(())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromotionForm {
  pub code: String,
  pub amount: Option<f64>,
  pub max_usage: Option<i64>,
  expiry: Option<NaiveDate>,
}

impl PromotionForm {
  /// Pick an expiry date; disabled dates leave the current value untouched.
  pub fn select_expiry(&mut self, date: NaiveDate, today: NaiveDate) -> Result<()> {
    select_date(&mut self.expiry, date, today)
  }

  pub fn validate<Tz: TimeZone>(
    &self,
    today: NaiveDate,
    tz: &Tz,
  ) -> Result<NewPromotionCoupon> {
    let mut errors = Vec::new();
    check_code(&self.code, &mut errors);
    check_amount(self.amount, &mut errors);

    let max_usage = match self.max_usage {
      Some(n) if n > 0 => u32::try_from(n).ok(),
      Some(_) => {
        errors.push(FieldError::new("maxUsage", "Must be at least 1"));
        None
      }
      None => {
        errors.push(FieldError::new("maxUsage", "Please enter max usage count"));
        None
      }
    };
    if self.max_usage.is_some_and(|n| n > 0) && max_usage.is_none() {
      errors.push(FieldError::new("maxUsage", "Max usage is too large"));
    }

    check_expiry(self.expiry, today, &mut errors);

    match (errors.is_empty(), max_usage, self.amount, self.expiry) {
      (true, Some(max_usage), Some(amount), Some(expiry)) => {
        Ok(NewPromotionCoupon {
          coupon_code: self.code.trim().to_string(),
          coupon_amount: amount,
          max_usage,
          expiry_date: expiry_timestamp(expiry, tz),
        })
      }
      _ => Err(Error::Validation(errors)),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserCouponForm {
  pub code: String,
  pub amount: Option<f64>,
  expiry: Option<NaiveDate>,
  pub picker: UserPicker,
}

impl UserCouponForm {
  pub fn select_expiry(&mut self, date: NaiveDate, today: NaiveDate) -> Result<()> {
    select_date(&mut self.expiry, date, today)
  }

  pub fn user(&self) -> Option<&UserOption> {
    self.picker.selected()
  }

  pub fn validate<Tz: TimeZone>(
    &self,
    today: NaiveDate,
    tz: &Tz,
  ) -> Result<NewUserCoupon> {
    let mut errors = Vec::new();
    if self.user().is_none() {
      errors.push(FieldError::new("userId", "Please select a user"));
    }
    check_code(&self.code, &mut errors);
    check_amount(self.amount, &mut errors);
    check_expiry(self.expiry, today, &mut errors);

    match (errors.is_empty(), self.user(), self.amount, self.expiry) {
      (true, Some(user), Some(amount), Some(expiry)) => Ok(NewUserCoupon {
        coupon_code: self.code.trim().to_string(),
        coupon_amount: amount,
        expiry_date: expiry_timestamp(expiry, tz),
        user_id: user.id.clone(),
      }),
      _ => Err(Error::Validation(errors)),
    }
  }
}

/// Search-as-you-type lookup for the target user. Nothing is cached: every
/// non-empty query goes to the backend and replaces the options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPicker {
  pub options: Vec<UserOption>,
  pub loading: bool,
  selected: Option<UserOption>,
}

impl UserPicker {
  pub fn selected(&self) -> Option<&UserOption> {
    self.selected.as_ref()
  }

  /// Pick one of the users offered by the last search.
  pub fn select(&mut self, user_id: &str) -> Result<&UserOption> {
    let user = self
      .options
      .iter()
      .find(|user| user.id == user_id)
      .cloned()
      .ok_or_else(|| {
        Error::InvalidArgs("Search for the user first: /users <name>".into())
      })?;
    Ok(self.selected.insert(user))
  }

  pub async fn search(
    &mut self,
    api: &sv::Coupon<'_>,
    text: &str,
  ) -> Option<Notice> {
    if text.is_empty() {
      self.options.clear();
      return None;
    }

    self.loading = true;
    let result = api.search_users(text).await;
    self.loading = false;

    match result {
      Ok(users) => {
        self.options = users;
        None
      }
      Err(err) => {
        error!("Error searching users: {}", err);
        Some(Notice::error("Error searching users"))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use reqwest::Method;
  use tokio_test::{assert_err, assert_ok};

  use super::*;
  use crate::sv::test_utils::FakeTransport;

  fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn today() -> NaiveDate {
    day(2026, 10, 19)
  }

  fn filled_promotion() -> PromotionForm {
    let mut form = PromotionForm {
      code: "SAVE10".into(),
      amount: Some(10.0),
      max_usage: Some(100),
      ..Default::default()
    };
    form.select_expiry(day(2026, 12, 31), today()).unwrap();
    form
  }

  fn messages(err: Error) -> Vec<&'static str> {
    match err {
      Error::Validation(errors) => errors.iter().map(|e| e.message).collect(),
      other => panic!("expected validation error, got {other:?}"),
    }
  }

  #[test]
  fn test_past_dates_are_unselectable() {
    assert!(is_date_disabled(day(2026, 10, 18), today()));
    assert!(!is_date_disabled(today(), today()));

    let mut promo = PromotionForm::default();
    assert_ok!(promo.select_expiry(today(), today()));
    assert!(matches!(
      promo.select_expiry(day(2026, 1, 1), today()),
      Err(Error::DateDisabled)
    ));
    assert_eq!(promo.expiry, Some(today()));

    let mut user = UserCouponForm::default();
    assert_err!(user.select_expiry(day(2025, 12, 31), today()));
    assert_eq!(user.expiry, None);
  }

  #[test]
  fn test_expiry_timestamp() {
    assert_eq!(
      expiry_timestamp(day(2026, 12, 31), &Utc),
      "2026-12-31T00:00:00.000Z"
    );

    let ist = chrono::FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
    assert_eq!(
      expiry_timestamp(day(2026, 12, 31), &ist),
      "2026-12-30T18:30:00.000Z"
    );
  }

  #[test]
  fn test_promotion_payload() {
    let coupon = filled_promotion().validate(today(), &Utc).unwrap();
    assert_eq!(
      coupon,
      NewPromotionCoupon {
        coupon_code: "SAVE10".into(),
        coupon_amount: 10.0,
        max_usage: 100,
        expiry_date: "2026-12-31T00:00:00.000Z".into(),
      }
    );
  }

  #[test]
  fn test_promotion_rules() {
    let mut form = filled_promotion();
    form.amount = Some(-1.0);
    assert_eq!(
      messages(form.validate(today(), &Utc).unwrap_err()),
      vec!["Amount cannot be negative"]
    );

    let mut form = filled_promotion();
    form.max_usage = Some(0);
    assert_eq!(
      messages(form.validate(today(), &Utc).unwrap_err()),
      vec!["Must be at least 1"]
    );

    let mut form = filled_promotion();
    form.amount = Some(0.0);
    assert_ok!(form.validate(today(), &Utc));

    let empty = PromotionForm::default();
    assert_eq!(
      messages(empty.validate(today(), &Utc).unwrap_err()),
      vec![
        "Please enter coupon code",
        "Please enter amount",
        "Please enter max usage count",
        "Please select expiry date",
      ]
    );
  }

  #[test]
  fn test_expiry_rechecked_on_submit() {
    let form = filled_promotion();
    let later = day(2027, 1, 1);
    assert_eq!(
      messages(form.validate(later, &Utc).unwrap_err()),
      vec!["Expiry date cannot be in the past"]
    );
  }

  #[tokio::test]
  async fn test_user_form_requires_picked_user() {
    let api = FakeTransport::new().on(
      Method::GET,
      "/user/searchUsers",
      json::json!({"data": [{"_id": "u1", "name": "Ravi", "email": "r@x.io"}]}),
    );
    let mut form = UserCouponForm {
      code: "VIP5".into(),
      amount: Some(5.0),
      ..Default::default()
    };
    form.select_expiry(today(), today()).unwrap();

    assert_eq!(
      messages(form.validate(today(), &Utc).unwrap_err()),
      vec!["Please select a user"]
    );
    assert_err!(form.picker.select("u1"));

    form.picker.search(&sv::Coupon::new(&api), "rav").await;
    assert_eq!(form.picker.select("u1").unwrap().label(), "Ravi (r@x.io)");
    form.picker.search(&sv::Coupon::new(&api), "").await;
    assert_eq!(form.user().map(|u| u.id.as_str()), Some("u1"));

    let coupon = form.validate(today(), &Utc).unwrap();
    assert_eq!(coupon.user_id, "u1");
    assert_eq!(coupon.expiry_date, "2026-10-19T00:00:00.000Z");
  }

  #[tokio::test]
  async fn test_picker_queries_every_keystroke() {
    let api = FakeTransport::new()
      .on(
        Method::GET,
        "/user/searchUsers",
        json::json!({"data": [{"_id": "u1", "name": "Ravi", "email": "r@x.io"}]}),
      )
      .on(Method::GET, "/user/searchUsers", json::json!({"data": []}));
    let sv = sv::Coupon::new(&api);
    let mut picker = UserPicker::default();

    assert!(picker.search(&sv, "r").await.is_none());
    assert_eq!(picker.options.len(), 1);

    picker.search(&sv, "ra").await;
    assert!(picker.options.is_empty());
    assert!(!picker.loading);

    picker.options.push(UserOption {
      id: "x".into(),
      name: "X".into(),
      email: "x@x".into(),
    });
    picker.search(&sv, "").await;
    assert!(picker.options.is_empty());

    assert_eq!(api.calls().len(), 2);
    assert_eq!(api.calls()[1].query[0].1, "ra");
  }

  #[tokio::test]
  async fn test_picker_failure_keeps_options() {
    let api =
      FakeTransport::new().fail(Method::GET, "/user/searchUsers", 500, "down");
    let mut picker = UserPicker {
      options: vec![UserOption {
        id: "u1".into(),
        name: "Ravi".into(),
        email: "r@x.io".into(),
      }],
      ..Default::default()
    };

    let notice = picker.search(&sv::Coupon::new(&api), "ra").await.unwrap();
    assert_eq!(notice, Notice::error("Error searching users"));
    assert_eq!(picker.options.len(), 1);
  }
}
