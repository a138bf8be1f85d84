//! Outstanding-send credit accounting for the transmit loop

use std::sync::atomic::{AtomicU32, Ordering};

/// Counts datagrams issued but not yet completion-confirmed.
///
/// `try_acquire` never lets the count pass the limit. `release` is called
/// exactly once per completion notification, success and failure alike, and
/// saturates at zero should completions ever outnumber issues.
#[derive(Debug)]
pub struct SendCredit {
    outstanding: AtomicU32,
    limit: u32,
}

impl SendCredit {
    pub fn new(limit: u32) -> Self {
        Self {
            outstanding: AtomicU32::new(0),
            limit,
        }
    }

    /// Reserve one credit. Returns false while the window is full.
    pub fn try_acquire(&self) -> bool {
        self.outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.limit).then_some(n + 1)
            })
            .is_ok()
    }

    /// Return one credit on completion notification.
    pub fn release(&self) {
        let _ = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    pub fn outstanding(&self) -> u32 {
        self.outstanding.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_limit_bounds_acquisitions() {
        let credit = SendCredit::new(8);
        let issued = (0..20).filter(|_| credit.try_acquire()).count();
        assert_eq!(issued, 8);
        assert_eq!(credit.outstanding(), 8);
    }

    #[test]
    fn test_release_reopens_window() {
        let credit = SendCredit::new(2);
        assert!(credit.try_acquire());
        assert!(credit.try_acquire());
        assert!(!credit.try_acquire());

        credit.release();
        assert_eq!(credit.outstanding(), 1);
        assert!(credit.try_acquire());
        assert!(!credit.try_acquire());
    }

    #[test]
    fn test_release_saturates_at_zero() {
        let credit = SendCredit::new(4);
        credit.release();
        assert_eq!(credit.outstanding(), 0);
        assert!(credit.try_acquire());
    }

    #[test]
    fn test_bound_holds_under_interleaving() {
        let credit = SendCredit::new(3);
        for round in 0..100 {
            if credit.try_acquire() {
                assert!(credit.outstanding() <= 3);
            }
            if round % 2 == 0 {
                credit.release();
            }
            assert!(credit.outstanding() <= 3);
        }
    }
}
