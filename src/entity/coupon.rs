use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{is_truthy, nullable};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Model {
  #[serde(rename = "_id")]
  pub id: String,
  #[serde(rename = "couponCode")]
  pub code: String,
  #[serde(rename = "couponAmount")]
  pub amount: f64,
  /// Target user reference; present only on user-specific coupons.
  #[serde(default)]
  pub created_for: Option<json::Value>,
  #[serde(default, deserialize_with = "nullable")]
  pub is_active: bool,
  #[serde(rename = "maxUsage", default)]
  pub max_usage: Option<i64>,
  #[serde(rename = "expiryDate", default, deserialize_with = "nullable")]
  pub expiry_date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CouponKind {
  Promotion,
  UserSpecific,
}

impl CouponKind {
  /// Lower-case label matched by the type search.
  pub fn label(self) -> &'static str {
    match self {
      CouponKind::Promotion => "promotion",
      CouponKind::UserSpecific => "user-specific",
    }
  }

  pub fn title(self) -> &'static str {
    match self {
      CouponKind::Promotion => "Promotion",
      CouponKind::UserSpecific => "User-specific",
    }
  }
}

impl Model {
  pub fn kind(&self) -> CouponKind {
    match &self.created_for {
      Some(target) if is_truthy(target) => CouponKind::UserSpecific,
      _ => CouponKind::Promotion,
    }
  }

  pub fn expiry(&self) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&self.expiry_date)
      .ok()
      .map(|date| date.with_timezone(&Utc))
  }
}

/// Envelope of the coupon listing and user search endpoints.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct DataList<T> {
  #[serde(default = "Vec::new", deserialize_with = "nullable")]
  pub data: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPromotionCoupon {
  pub coupon_code: String,
  pub coupon_amount: f64,
  pub max_usage: u32,
  pub expiry_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserCoupon {
  pub coupon_code: String,
  pub coupon_amount: f64,
  pub expiry_date: String,
  pub user_id: String,
}

/// Result row of the user search used by the user-coupon form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserOption {
  #[serde(rename = "_id")]
  pub id: String,
  #[serde(default, deserialize_with = "nullable")]
  pub name: String,
  #[serde(default, deserialize_with = "nullable")]
  pub email: String,
}

impl UserOption {
  pub fn label(&self) -> String {
    format!("{} ({})", self.name, self.email)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_kind_follows_target_user() {
    let raw = r#"[
      {"_id": "1", "couponCode": "SAVE10", "couponAmount": 10, "created_for": null,
       "is_active": true, "maxUsage": 100, "expiryDate": "2026-12-31T00:00:00.000Z"},
      {"_id": "2", "couponCode": "VIP5", "couponAmount": 5.5, "created_for": "u1"},
      {"_id": "3", "couponCode": "POP", "couponAmount": 1,
       "created_for": {"_id": "u2", "name": "Ravi"}}
    ]"#;

    let coupons: Vec<Model> = json::from_str(raw).unwrap();
    assert_eq!(coupons[0].kind(), CouponKind::Promotion);
    assert_eq!(coupons[1].kind(), CouponKind::UserSpecific);
    assert_eq!(coupons[2].kind(), CouponKind::UserSpecific);
    assert!(!coupons[1].is_active);
    assert_eq!(coupons[1].amount, 5.5);
    assert_eq!(
      coupons[0].expiry().unwrap().date_naive().to_string(),
      "2026-12-31"
    );
    assert!(coupons[1].expiry().is_none());
  }

  #[test]
  fn test_data_list_envelope() {
    let list: DataList<UserOption> = json::from_str(
      r#"{"data": [{"_id": "u1", "name": "Ravi", "email": null}]}"#,
    )
    .unwrap();
    assert_eq!(list.data.len(), 1);
    assert_eq!(list.data[0].email, "");

    let empty: DataList<Model> = json::from_str(r#"{"data": null}"#).unwrap();
    assert!(empty.data.is_empty());
    let missing: DataList<Model> = json::from_str("{}").unwrap();
    assert!(missing.data.is_empty());
  }

  #[test]
  fn test_new_coupon_body() {
    let body = json::to_value(NewUserCoupon {
      coupon_code: "VIP5".into(),
      coupon_amount: 5.0,
      expiry_date: "2026-12-31T00:00:00.000Z".into(),
      user_id: "u1".into(),
    })
    .unwrap();

    assert_eq!(
      body,
      json::json!({
        "couponCode": "VIP5",
        "couponAmount": 5.0,
        "expiryDate": "2026-12-31T00:00:00.000Z",
        "userId": "u1"
      })
    );
  }

  #[test]
  fn test_user_option_label() {
    let user: UserOption =
      json::from_str(r#"{"_id": "u1", "name": "Ravi", "email": "r@x.io"}"#)
        .unwrap();
    assert_eq!(user.label(), "Ravi (r@x.io)");
  }
}
