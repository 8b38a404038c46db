use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A single failed form rule, keyed by the form field it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
  pub field: &'static str,
  pub message: &'static str,
}

impl FieldError {
  pub const fn new(field: &'static str, message: &'static str) -> Self {
    Self { field, message }
  }
}

impl fmt::Display for FieldError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.field, self.message)
  }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("API error ({status}): {message}")]
  Api { status: u16, message: String },
  #[error("Transport error: {0}")]
  Transport(String),
  #[error("Failed to decode response: {0}")]
  Decode(String),
  #[error("Image store error: {0}")]
  Storage(String),
  #[error("Validation failed: {}", join_fields(.0))]
  Validation(Vec<FieldError>),
  #[error("Invalid arguments: {0}")]
  InvalidArgs(String),
  #[error("Date is in the past")]
  DateDisabled,
  #[error("Nothing staged for upload")]
  NothingStaged,
  #[error("Upload already in progress")]
  UploadInProgress,
  #[error("Image #{0} is already being deleted")]
  AlreadyDeleting(usize),
  #[error("Image #{0} does not exist")]
  ImageOutOfRange(usize),
  #[error("No designer card is open")]
  CardClosed,
  #[error("Configuration error: {0}")]
  Config(String),
}

fn join_fields(errors: &[FieldError]) -> String {
  errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}

impl Error {
  /// Text shown to the operator in a notice.
  pub fn user_message(&self) -> String {
    match self {
      Error::Api { message, .. } => message.clone(),
      Error::Transport(_) => "Network error, please retry".into(),
      Error::Decode(_) => "Unexpected response from server".into(),
      Error::Storage(message) => message.clone(),
      Error::Validation(errors) => errors
        .iter()
        .map(|e| e.message)
        .collect::<Vec<_>>()
        .join("\n"),
      Error::InvalidArgs(message) => message.clone(),
      Error::DateDisabled => "Past dates cannot be selected".into(),
      Error::NothingStaged => {
        "Please select at least one image to upload".into()
      }
      Error::UploadInProgress => "An upload is already running".into(),
      Error::AlreadyDeleting(i) => {
        format!("Image #{} is already being removed", i + 1)
      }
      Error::ImageOutOfRange(i) => format!("There is no image #{}", i + 1),
      Error::CardClosed => {
        "Open a designer first: /designer <id>".into()
      }
      Error::Config(message) => message.clone(),
    }
  }
}

impl From<reqwest::Error> for Error {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      Error::Decode(err.to_string())
    } else {
      Error::Transport(err.to_string())
    }
  }
}

impl From<json::Error> for Error {
  fn from(err: json::Error) -> Self {
    Error::Decode(err.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_validation_message_lists_every_rule() {
    let err = Error::Validation(vec![
      FieldError::new("couponAmount", "Amount cannot be negative"),
      FieldError::new("maxUsage", "Must be at least 1"),
    ]);

    assert_eq!(
      err.user_message(),
      "Amount cannot be negative\nMust be at least 1"
    );
    assert_eq!(
      err.to_string(),
      "Validation failed: couponAmount: Amount cannot be negative; \
       maxUsage: Must be at least 1"
    );
  }

  #[test]
  fn test_api_error_surfaces_backend_message() {
    let err = Error::Api { status: 409, message: "Coupon exists".into() };
    assert_eq!(err.user_message(), "Coupon exists");
  }
}
