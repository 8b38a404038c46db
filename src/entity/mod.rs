pub mod coupon;
pub mod designer;

use serde::{Deserialize, Deserializer};

pub use coupon::CouponKind;

/// Loose truthiness of a backend value: null, `false`, `0` and `""` are
/// treated as absent.
pub fn is_truthy(value: &json::Value) -> bool {
  match value {
    json::Value::Null => false,
    json::Value::Bool(b) => *b,
    json::Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
    json::Value::String(s) => !s.is_empty(),
    json::Value::Array(_) | json::Value::Object(_) => true,
  }
}

/// Treats an explicit `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de> + Default,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
