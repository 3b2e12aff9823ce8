//! Injectable time source.
//!
//! Token creation and validation read the current time through a [`Clock`]
//! so tests can pin it to a fixed instant.

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A shareable function returning the current time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Returns a clock backed by the system time.
#[must_use]
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Returns a clock that always reports `instant`.
#[must_use]
pub fn fixed_clock(instant: DateTime<Utc>) -> Clock {
    Arc::new(move || instant)
}
