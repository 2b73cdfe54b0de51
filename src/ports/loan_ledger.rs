use crate::domain::loan::{ClosedLoan, Loan, OpenLoan};
use crate::domain::value_objects::LoanId;
use async_trait::async_trait;

use super::Result;

/// 貸出台帳ポート
///
/// 貸出記録の永続化を抽象化する。
/// 貸出・返却の原子的な更新は`LendingUnitOfWork`が行い、
/// このポートは単一レコードの読み書きのみを扱う。
#[async_trait]
pub trait LoanLedger: Send + Sync {
    /// IDで貸出記録を取得する
    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>>;

    /// 全貸出記録を貸出日時の新しい順に取得する
    async fn list_all(&self) -> Result<Vec<Loan>>;

    /// 貸出中の記録を追加する
    async fn insert(&self, loan: OpenLoan) -> Result<()>;

    /// 貸出記録を返却済みに更新する
    ///
    /// 返却済みの記録は終端状態のため変更しない。
    /// 貸出中の記録が存在し更新された場合のみ`true`を返す。
    async fn update(&self, loan: ClosedLoan) -> Result<bool>;
}
