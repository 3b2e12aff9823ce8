//! Core domain types and utilities for the vantage dashboard backend.
//!
//! This crate provides the foundational identifiers, the injectable clock
//! and the error handling alias shared by every other vantage crate.

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, fixed_clock, system_clock};
pub use error::Result;
pub use id::{MappingId, OrganizationId, ParseIdError, UserId};
