//! Format validators: leaf grammars shared by every rule
//!
//! Pure functions over `&str`. The grammars are compiled once, on first use, into
//! process-wide immutable statics; no call rebuilds them.
//!
//! | Function | Rule type | Result |
//! |----------|-----------|--------|
//! | [`is_email`] | `email` | anchored strict grammar |
//! | [`is_email_loose`] | `email_loose` | anchored, consecutive/trailing dots allowed |
//! | [`parse_url`] / [`match_url`] | `url` | **unanchored** search, then structural checks |
//! | [`parse_date`] | `date` | milliseconds since the Unix epoch |

mod date;
mod email;
mod url;

pub use date::parse_date;
pub use email::{is_email, is_email_loose};
pub use url::{is_url, match_url, parse_url, UrlParts};
