//! Check status codes.
//!
//! The numeric values mirror HTTP status semantics but are purely an internal
//! classification. Callers branch on them, so they never change.

use std::fmt;

/// Outcome classification of a single check.
///
/// ```
/// use auditor::Status;
///
/// assert_eq!(Status::NotAcceptable.code(), 406);
/// assert_eq!(Status::NotAcceptable.name(), "NOT_ACCEPTABLE");
/// assert_eq!(Status::from_code(204), Some(Status::NoContent));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum Status {
    /// The value was accepted.
    Ok = 0,
    /// No value was submitted (or nothing was left after normalization).
    NoContent = 204,
    /// The value has the wrong kind for the rule (e.g. a boolean for a number).
    BadRequest = 400,
    /// The value has the right kind but fails a bound, pattern, format or transform.
    NotAcceptable = 406,
    /// The rule itself is unusable.
    PreconditionFailed = 412,
}

impl Status {
    /// Every status, in code order.
    pub const ALL: [Status; 5] = [
        Self::Ok,
        Self::NoContent,
        Self::BadRequest,
        Self::NotAcceptable,
        Self::PreconditionFailed,
    ];

    /// The stable numeric code (`errno`).
    #[must_use]
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Look up a status by numeric code.
    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    /// Symbolic name (`ename`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NoContent => "NO_CONTENT",
            Self::BadRequest => "BAD_REQUEST",
            Self::NotAcceptable => "NOT_ACCEPTABLE",
            Self::PreconditionFailed => "PRECONDITION_FAILED",
        }
    }

    /// Human-readable message (`errstr`), `None` for [`Status::Ok`].
    #[must_use]
    pub const fn message(self) -> Option<&'static str> {
        match self {
            Self::Ok => None,
            Self::NoContent => Some("field val undefined"),
            Self::BadRequest => Some("invalid field type"),
            Self::NotAcceptable => Some("invalid field val"),
            Self::PreconditionFailed => Some("unknown field type"),
        }
    }

    /// Returns `true` for [`Status::Ok`].
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.name())
    }
}
