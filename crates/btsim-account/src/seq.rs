//! Process-wide monotonic sequence number generator for `Entrust`/`Trade`
//! (see `btsim-schemas::Entrust::seq_no`). The counter hands out the next
//! value rather than validating a caller-supplied one.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Returns a value strictly greater than every value previously returned by
/// this process, across every account.
pub fn next_seq_no() -> u64 {
    NEXT_SEQ.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_strictly_increases() {
        let a = next_seq_no();
        let b = next_seq_no();
        assert!(b > a);
    }
}
