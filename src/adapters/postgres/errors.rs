use crate::ports::StorageError;

/// Convert a sqlx error into the port-level StorageError
///
/// SQLSTATE classes used:
/// - 40001 serialization_failure, 40P01 deadlock_detected → Conflict (retryable)
/// - 23505 unique_violation → UniqueViolation
/// - 23514 check_violation → CheckViolation
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let classified = match &err {
        sqlx::Error::PoolTimedOut => Some(StorageError::Timeout),
        sqlx::Error::Database(db) => {
            let constraint = db.constraint().unwrap_or("unknown").to_string();
            match db.code().as_deref() {
                Some("40001") | Some("40P01") => Some(StorageError::Conflict(db.message().to_string())),
                Some("23505") => Some(StorageError::UniqueViolation { constraint }),
                Some("23514") => Some(StorageError::CheckViolation { constraint }),
                _ => None,
            }
        }
        _ => None,
    };

    classified.unwrap_or_else(|| StorageError::backend(err))
}

pub(crate) fn map_json_error(err: serde_json::Error) -> StorageError {
    StorageError::backend(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_retryable() {
        let err = map_sqlx_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StorageError::Timeout));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_row_not_found_is_backend_error() {
        let err = map_sqlx_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, StorageError::Backend(_)));
        assert!(!err.is_retryable());
    }
}
