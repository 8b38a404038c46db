//! Headless UI components. Each component is a state record driven by
//! operator events; the shells under `plugins` only render what `view`/`page`
//! return and forward events.

pub mod coupon_form;
pub mod coupon_table;
pub mod designer_detail;

use std::fmt;

use crate::prelude::*;

pub use coupon_table::CouponTable;
pub use designer_detail::DesignerDetail;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Success,
  Info,
  Warning,
  Error,
}

/// Transient notification for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub level: Level,
  pub text: String,
}

impl Notice {
  pub fn new(level: Level, text: impl Into<String>) -> Self {
    Self { level, text: text.into() }
  }

  pub fn success(text: impl Into<String>) -> Self {
    Self::new(Level::Success, text)
  }

  pub fn info(text: impl Into<String>) -> Self {
    Self::new(Level::Info, text)
  }

  pub fn warning(text: impl Into<String>) -> Self {
    Self::new(Level::Warning, text)
  }

  pub fn error(text: impl Into<String>) -> Self {
    Self::new(Level::Error, text)
  }

  /// Error notice carrying the error's own message, or `fallback` when it
  /// has none.
  pub fn from_error(err: &Error, fallback: &str) -> Self {
    let text = err.user_message();
    if text.trim().is_empty() {
      Self::error(fallback)
    } else {
      Self::error(text)
    }
  }

  pub fn is_error(&self) -> bool {
    self.level == Level::Error
  }

  pub fn icon(&self) -> &'static str {
    match self.level {
      Level::Success => "✅",
      Level::Info => "ℹ️",
      Level::Warning => "⚠️",
      Level::Error => "❌",
    }
  }
}

impl fmt::Display for Notice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.icon(), self.text)
  }
}
