use std::fmt;

use chrono::NaiveDate;

/// Errors raised while walking an account's held lots forward through
/// corporate-action events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpActionError {
    /// The cursor is already past the date being advanced to; the caller
    /// violated the `xdxr_cursor <= order_time.date()` invariant.
    CursorAheadOfTarget { cursor: NaiveDate, through: NaiveDate },
    /// The Feed Adapter returned an error while looking up dividends or an
    /// adjustment factor.
    Feed(String),
}

impl fmt::Display for CorpActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorpActionError::CursorAheadOfTarget { cursor, through } => write!(
                f,
                "xdxr_cursor {cursor} is ahead of the target date {through}"
            ),
            CorpActionError::Feed(detail) => write!(f, "feed error: {detail}"),
        }
    }
}

impl std::error::Error for CorpActionError {}
