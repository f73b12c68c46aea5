//! Database error classification helpers
//!
//! Create commands rely on unique indexes rather than check-then-insert, so
//! constraint violations are part of their normal control flow.

use sqlx::Error as SqlxError;

/// Check if the error is a unique constraint violation
pub fn is_unique_violation(error: &SqlxError) -> bool {
    if let SqlxError::Database(db_err) = error {
        return db_err.is_unique_violation();
    }
    false
}

/// Map a unique violation to a domain error, wrapping anything else
pub fn map_unique_violation<E, F>(error: SqlxError, unique_error: E, default_wrapper: F) -> E
where
    F: FnOnce(SqlxError) -> E,
{
    if is_unique_violation(&error) {
        unique_error
    } else {
        default_wrapper(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_error_is_not_unique_violation() {
        assert!(!is_unique_violation(&SqlxError::RowNotFound));
    }

    #[test]
    fn test_map_unique_violation_wraps_other_errors() {
        #[derive(Debug, PartialEq)]
        enum TestError {
            Duplicate,
            Other,
        }

        let mapped = map_unique_violation(SqlxError::RowNotFound, TestError::Duplicate, |_| {
            TestError::Other
        });
        assert_eq!(mapped, TestError::Other);
    }
}
