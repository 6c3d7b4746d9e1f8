//! Error handling for the block and type layer

use thiserror::Error;

/// Main error type for block, builder and type operations
#[derive(Error, Debug)]
pub enum PrismError {
    /// A precondition on an argument was violated
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A builder was driven out of protocol (double open, close without open, ...)
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// The operation is not meaningful for this type or block
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// A position, offset or length addressed outside of a block
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    /// A type signature could not be resolved
    #[error("Type not found: {0}")]
    TypeNotFound(String),

    /// A map entry contains the same key twice while the builder is strict
    #[error("Duplicate map keys are not allowed: {0}")]
    DuplicateKey(String),

    /// A row entry was closed while a field did not receive exactly one value
    #[error("Field {field} has {actual} positions, expected {expected}")]
    FieldCountMismatch {
        field: usize,
        expected: usize,
        actual: usize,
    },

    /// A type without equality semantics was used where one is required
    #[error("Type is not comparable: {0}")]
    NotComparable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PrismError {
    fn from(err: serde_json::Error) -> Self {
        PrismError::Serialization(err.to_string())
    }
}

/// Result type alias for block and type operations
pub type PrismResult<T> = std::result::Result<T, PrismError>;

/// Macro for creating invalid argument errors
#[macro_export]
macro_rules! invalid_arg_err {
    ($msg:expr) => {
        $crate::common::error::PrismError::InvalidArgument($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::PrismError::InvalidArgument(format!($fmt, $($arg)*))
    };
}

/// Macro for creating illegal state errors
#[macro_export]
macro_rules! illegal_state_err {
    ($msg:expr) => {
        $crate::common::error::PrismError::IllegalState($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::PrismError::IllegalState(format!($fmt, $($arg)*))
    };
}

/// Macro for creating out of bounds errors
#[macro_export]
macro_rules! out_of_bounds_err {
    ($msg:expr) => {
        $crate::common::error::PrismError::OutOfBounds($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::PrismError::OutOfBounds(format!($fmt, $($arg)*))
    };
}

/// Macro for creating unsupported operation errors
#[macro_export]
macro_rules! unsupported_err {
    ($msg:expr) => {
        $crate::common::error::PrismError::Unsupported($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::PrismError::Unsupported(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = invalid_arg_err!("precision must be in range [0, {}]: {}", 12, 13);
        assert_eq!(
            err.to_string(),
            "Invalid argument: precision must be in range [0, 12]: 13"
        );

        let err = PrismError::FieldCountMismatch {
            field: 1,
            expected: 1,
            actual: 0,
        };
        assert_eq!(err.to_string(), "Field 1 has 0 positions, expected 1");
    }

    #[test]
    fn test_json_error_conversion() {
        let err: PrismError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, PrismError::Serialization(_)));
    }
}
