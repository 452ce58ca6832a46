use core::fmt;

/// Errors reported by fallible table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The requested number of slots cannot be represented.
    CapacityOverflow,
    /// The allocator could not provide a slot array of the given length. The
    /// table is left exactly as it was before the call.
    AllocationFailure {
        /// Number of slots that were requested.
        slots: usize,
    },
    /// A strict lookup found no entry for the key.
    KeyNotFound,
    /// A structural check failed. This means the table has a bug, or a key's
    /// `Hash` and `Eq` implementations disagree.
    InvariantViolation {
        /// Index of the slot where the check failed.
        slot: usize,
        /// The property that did not hold.
        reason: &'static str,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::CapacityOverflow => f.write_str("capacity overflow"),
            Error::AllocationFailure { slots } => {
                write!(f, "failed to allocate a table of {slots} slots")
            }
            Error::KeyNotFound => f.write_str("key not found"),
            Error::InvariantViolation { slot, reason } => {
                write!(f, "table invariant violated at slot {slot}: {reason}")
            }
        }
    }
}

impl core::error::Error for Error {}
