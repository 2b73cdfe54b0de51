use thiserror::Error;

/// ストレージ層のエラー
///
/// アダプターはバックエンド固有のエラーをこの型に変換する。
/// アプリケーション層は`is_retryable()`で一時的な失敗かどうかを判定する。
#[derive(Debug, Error)]
pub enum StorageError {
    /// 同時更新の競合（シリアライズ失敗、デッドロック、楽観ロックの不一致）
    #[error("concurrent modification conflict: {0}")]
    Conflict(String),

    /// タイムアウト（コネクション取得など）
    #[error("storage operation timed out")]
    Timeout,

    /// 一意制約違反（ISBN、会員番号など）
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// CHECK制約違反（在庫の負数など）
    #[error("check constraint violated: {constraint}")]
    CheckViolation { constraint: String },

    /// 保存されているデータが不変条件を満たさない
    #[error("invalid stored data: {0}")]
    InvalidData(String),

    /// その他のバックエンドエラー（接続断など）
    #[error("storage backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StorageError {
    /// 操作全体を再試行すれば成功しうるエラーか
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Conflict(_) | StorageError::Timeout)
    }

    /// 不変条件違反を示すエラーか
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            StorageError::CheckViolation { .. } | StorageError::InvalidData(_)
        )
    }

    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        StorageError::Backend(Box::new(err))
    }
}

/// ポート層の Result型
pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(StorageError::Conflict("version".into()).is_retryable());
        assert!(StorageError::Timeout.is_retryable());
        assert!(
            !StorageError::UniqueViolation {
                constraint: "books_isbn_key".into()
            }
            .is_retryable()
        );
        assert!(!StorageError::backend(std::io::Error::other("down")).is_retryable());
    }

    #[test]
    fn test_integrity_classification() {
        assert!(
            StorageError::CheckViolation {
                constraint: "books_quantity_check".into()
            }
            .is_integrity_violation()
        );
        assert!(StorageError::InvalidData("bad row".into()).is_integrity_violation());
        assert!(!StorageError::Timeout.is_integrity_violation());
    }
}
