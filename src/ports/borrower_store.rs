use crate::domain::borrower::Borrower;
use crate::domain::value_objects::BorrowerId;
use async_trait::async_trait;

use super::Result;

/// 利用者ストアポート
///
/// 会員番号の一意性はストアで保証し、違反は`StorageError::UniqueViolation`で返す。
#[async_trait]
pub trait BorrowerStore: Send + Sync {
    /// IDで利用者を取得する
    async fn get_by_id(&self, borrower_id: BorrowerId) -> Result<Option<Borrower>>;

    /// 会員番号で利用者を取得する
    async fn get_by_membership_id(&self, membership_id: &str) -> Result<Option<Borrower>>;

    /// 全利用者を名前順に取得する
    async fn list_all(&self) -> Result<Vec<Borrower>>;

    /// 利用者を新規登録する
    async fn insert(&self, borrower: Borrower) -> Result<()>;

    /// 利用者を更新する。存在しない場合は`None`
    async fn update(&self, borrower: Borrower) -> Result<Option<Borrower>>;

    /// 利用者を削除する。存在しなかった場合は`false`
    async fn delete(&self, borrower_id: BorrowerId) -> Result<bool>;
}
