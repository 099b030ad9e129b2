//! Types needed in multiple modules

/// Enumeration of binary symbol values
#[derive(Clone, Eq, PartialEq, Debug, Copy, Default, Hash)]
pub enum Bit {
    /// Binary symbol `0`
    #[default]
    Zero = 0,
    /// Binary symbol `1`
    One = 1,
}

impl Bit {
    /// Returns the bit as `0` or `1`.
    #[must_use]
    pub fn value(self) -> u8 {
        self as u8
    }
}

impl std::ops::BitXor for Bit {
    type Output = Bit;

    fn bitxor(self, rhs: Bit) -> Bit {
        if self == rhs {
            Bit::Zero
        } else {
            Bit::One
        }
    }
}

impl std::ops::BitXorAssign for Bit {
    fn bitxor_assign(&mut self, rhs: Bit) {
        *self = *self ^ rhs;
    }
}

/// Custom error type
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Element types of a producer/consumer socket pair differ
    #[error("Cannot bind {consumer} ({found}) to {producer} ({expected}): element types differ")]
    TypeMismatch {
        /// Fully-qualified producer socket name
        producer: String,
        /// Fully-qualified consumer socket name
        consumer: String,
        /// Element type of the producer socket
        expected: String,
        /// Element type of the consumer socket
        found: String,
    },
    /// Element counts of a producer/consumer socket pair differ
    #[error(
        "Cannot bind {consumer} ({consumer_len} elements) to {producer} ({producer_len} \
         elements): element counts differ"
    )]
    SizeMismatch {
        /// Fully-qualified producer socket name
        producer: String,
        /// Fully-qualified consumer socket name
        consumer: String,
        /// Element count of the producer socket
        producer_len: usize,
        /// Element count of the consumer socket
        consumer_len: usize,
    },
    /// Input socket already has a producer
    #[error("Input socket {consumer} is already bound to {producer}")]
    AlreadyBound {
        /// Fully-qualified consumer socket name
        consumer: String,
        /// Fully-qualified name of the existing producer
        producer: String,
    },
    /// Input socket of a scheduled task has no producer
    #[error("Input socket {module}::{task}::{socket} must be bound before execution")]
    UnboundRequiredInput {
        /// Module name
        module: String,
        /// Task name
        task: String,
        /// Socket name
        socket: String,
    },
    /// Unknown socket, or socket used in the wrong direction
    #[error("{0}")]
    InvalidSocket(String),
    /// Consumer task scheduled before (or without) its producer task
    #[error("Task {consumer} is scheduled before its producer {producer}")]
    SequenceOrder {
        /// Fully-qualified producer task name
        producer: String,
        /// Fully-qualified consumer task name
        consumer: String,
    },
    /// Bindings form an execution cycle
    #[error("Binding graph has a cycle through {0}")]
    CycleDetected(String),
    /// Module needs a noise parameter set that was never provided
    #[error("Noise parameters not set for module {0}")]
    NoiseNotSet(String),
    /// Invalid input error
    #[error("{0}")]
    InvalidInput(String),
    /// File read/write error
    #[error("{0}")]
    FileReadWriteError(#[from] std::io::Error),
    /// Serde read/write error
    #[error("{0}")]
    SerdeReadWriteError(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests_of_bit {
    use super::*;
    use Bit::{One, Zero};

    #[test]
    fn test_bitxor() {
        assert_eq!(Zero ^ Zero, Zero);
        assert_eq!(Zero ^ One, One);
        assert_eq!(One ^ Zero, One);
        assert_eq!(One ^ One, Zero);
        let mut bit = One;
        bit ^= One;
        assert_eq!(bit, Zero);
    }

    #[test]
    fn test_value() {
        assert_eq!(Zero.value(), 0);
        assert_eq!(One.value(), 1);
    }
}
