//! Error handling foundation for vantage.
//!
//! Only the `Result` alias lives here. Domain crates define their own error
//! enums (authentication, authorization, store, exchange) and carry them in a
//! rootcause `Report`, attaching context as the error crosses a layer.

use rootcause::Report;

/// Result carrying a rootcause [`Report`] whose context is `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
