use crate::error::Error;

/// Result type alias used throughout pqv.
///
/// Shorthand for `std::result::Result<T, Error>`. Every fallible pqv
/// operation returns this type.
pub type Result<T> = std::result::Result<T, Error>;
