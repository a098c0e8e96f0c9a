use std::fmt;

/// Invariant violations caught at the ledger's append boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    NonPositiveShares,
    NonPositivePrice,
    NegativeFee,
    EmptySymbol,
    /// Attempted to sell more (unadjusted) shares than the FIFO lots hold.
    InsufficientShares { requested_micros: i64, held_micros: i64 },
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::NonPositiveShares => write!(f, "shares must be positive"),
            LedgerError::NonPositivePrice => write!(f, "price must be positive"),
            LedgerError::NegativeFee => write!(f, "fee must not be negative"),
            LedgerError::EmptySymbol => write!(f, "symbol must not be empty"),
            LedgerError::InsufficientShares {
                requested_micros,
                held_micros,
            } => write!(
                f,
                "requested {requested_micros} shares-micros but only {held_micros} held"
            ),
        }
    }
}

impl std::error::Error for LedgerError {}
