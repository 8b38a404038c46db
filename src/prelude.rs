pub use std::{
  collections::{BTreeSet, HashMap, HashSet},
  sync::Arc,
  time::Duration,
};

pub use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
pub use dashmap::DashMap;
pub use tracing::{debug, error, info, trace, warn};

pub use crate::error::{Error, FieldError, Result};
